//! Resolved types: integer widths and enum symbol tables.

use std::collections::HashMap;

use log::debug;

use crate::error::{CompileError, Result, RowRef};
use crate::schema::{DeriveSpec, TypeKind, TypeSpec};
use crate::table::TableSet;
use crate::value::Value;

/// Insertion-ordered set of symbol names. A symbol's code is its insertion index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSet {
    symbols: Vec<String>,
    codes: HashMap<String, usize>,
}

impl SymbolSet {
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a symbol if it is not already present. Returns its code either way.
    pub fn insert(&mut self, symbol: &str) -> usize {
        if let Some(&code) = self.codes.get(symbol) {
            return code;
        }
        let code = self.symbols.len();
        self.symbols.push(symbol.to_owned());
        self.codes.insert(symbol.to_owned(), code);
        code
    }

    pub fn code(&self, symbol: &str) -> Option<usize> {
        self.codes.get(symbol).copied()
    }

    pub fn get(&self, code: usize) -> Option<&str> {
        self.symbols.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    fn clear(&mut self) {
        self.symbols.clear();
        self.codes.clear();
    }
}

/// Number of bits needed to give `count` symbols distinct codes.
pub fn bits_for(count: usize) -> u32 {
    match count {
        0 | 1 => 0,
        n => usize::BITS - (n - 1).leading_zeros(),
    }
}

/// A named type with its width resolved.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub width: u32,
    pub prefix: String,
    pub description: String,
    symbols: SymbolSet,
    derive: Option<DeriveSpec>,
    /// False for derived enums until their symbols have been collected.
    resolved: bool,
}

impl TypeDef {
    fn from_spec(spec: &TypeSpec) -> Result<Self> {
        let owner = format!("type `{}`", spec.name);
        let width = match spec.width {
            Some(width) if width > 0 && width <= 64 => width,
            _ => return Err(CompileError::WidthOverflow(owner)),
        };
        if spec.kind == TypeKind::Scalar && (!spec.symbols.is_empty() || spec.derive.is_some()) {
            return Err(CompileError::InvalidSchema(format!(
                "{} is an integer type but declares symbols",
                owner
            )));
        }
        if spec.derive.is_some() && !spec.symbols.is_empty() {
            return Err(CompileError::InvalidSchema(format!(
                "{} both declares and derives its symbols",
                owner
            )));
        }
        let mut symbols = SymbolSet::new();
        for symbol in &spec.symbols {
            if symbols.code(symbol).is_some() {
                return Err(CompileError::InvalidSchema(format!(
                    "{} declares `{}` twice",
                    owner, symbol
                )));
            }
            symbols.insert(symbol);
        }
        let def = TypeDef {
            name: spec.name.clone(),
            kind: spec.kind,
            width,
            prefix: spec.prefix.clone(),
            description: spec.description.clone(),
            symbols,
            resolved: spec.derive.is_none(),
            derive: spec.derive.clone(),
        };
        def.check_width()?;
        Ok(def)
    }

    fn check_width(&self) -> Result<()> {
        if bits_for(self.symbols.len()) > self.width {
            return Err(CompileError::SymbolOverflow {
                name: self.name.clone(),
                count: self.symbols.len(),
                width: self.width,
            });
        }
        Ok(())
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    /// Symbols of an enum, in code order. Empty for integer types.
    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    /// Whether the symbol set is final. Always true for integers and declared enums.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn derive(&self) -> Option<&DeriveSpec> {
        self.derive.as_ref()
    }

    /// Largest value representable in this type's width.
    pub fn max_value(&self) -> u64 {
        max_for_width(self.width)
    }
}

pub(crate) fn max_for_width(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// All named types of a schema.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    defs: Vec<TypeDef>,
    by_name: HashMap<String, usize>,
}

impl TypeTable {
    /// Resolve every type spec. Derived enums start out empty and unresolved.
    pub fn from_specs(specs: &[TypeSpec]) -> Result<Self> {
        let mut table = TypeTable::default();
        for spec in specs {
            if table.by_name.contains_key(&spec.name) {
                return Err(CompileError::InvalidSchema(format!(
                    "type `{}` is defined twice",
                    spec.name
                )));
            }
            let def = TypeDef::from_spec(spec)?;
            table.by_name.insert(def.name.clone(), table.defs.len());
            table.defs.push(def);
        }
        Ok(table)
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDef> {
        self.by_name.get(name).map(|&i| &self.defs[i])
    }

    /// Look up a type, naming `owner` in the error if it does not exist.
    pub fn get(&self, name: &str, owner: impl FnOnce() -> String) -> Result<&TypeDef> {
        self.lookup(name).ok_or_else(|| CompileError::UnknownType {
            name: name.to_owned(),
            owner: owner(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.defs.iter()
    }

    /// Fill the symbols of every derived enum from its source column, in first-occurrence
    /// order. Running this again over the same tables yields the same symbols.
    pub fn derive_symbols(&mut self, tables: &TableSet) -> Result<()> {
        for def in &mut self.defs {
            let Some(derive) = &def.derive else {
                continue;
            };
            let table = tables.get(&derive.table)?;
            def.symbols.clear();
            for (index, row) in table.rows.iter().enumerate() {
                match row.get(&derive.column) {
                    Some(Value::Symbol(symbol)) => {
                        def.symbols.insert(symbol);
                    }
                    Some(Value::Int(num)) => {
                        def.symbols.insert(&num.to_string());
                    }
                    Some(other) => {
                        return Err(CompileError::InvalidValue {
                            row: RowRef::table(&table.name, index),
                            field: derive.column.clone(),
                            value: other.clone(),
                        })
                    }
                    None if derive.fill_missing => {
                        def.symbols.insert(&format!("_{:X}", index));
                    }
                    None => {}
                }
            }
            def.check_width()?;
            def.resolved = true;
            debug!(
                "Derived {} symbols for {} from {}.{}",
                def.symbols.len(),
                def.name,
                derive.table,
                derive.column
            );
        }
        Ok(())
    }
}
