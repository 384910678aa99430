//! Record layouts: the bit offset and width of every packed field of a table.
//!
//! A [`RecordLayout`] is computed once per table from its column list. Both the packer and
//! the declaration emitter read offsets from the same layout instance, so the emitted bit
//! ranges always match the packed rows.

use std::collections::HashMap;
use std::ops::Range;

use log::debug;

use crate::error::{CompileError, Result, RowRef};
use crate::schema::{Schema, TableSpec};
use crate::table::TableSet;
use crate::types::{max_for_width, TypeDef, TypeTable};
use crate::value::{Row, Value};

/// One packed field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    /// Named type of the field, `None` for literal-width integer columns.
    pub ty: Option<String>,
    /// Offset of the field's most significant bit from the left end of the row.
    pub start: u32,
    pub width: u32,
    pub description: String,
}

impl FieldLayout {
    /// Bit positions covered by this field, counted from the left (MSB) end of the row.
    pub fn range(&self) -> Range<u32> {
        self.start..self.start + self.width
    }

    /// The field's `[hi:lo]` bit numbers in a record of the given total width, with bit 0
    /// the least significant.
    pub fn bit_numbers(&self, total_width: u32) -> (u32, u32) {
        let lo = total_width - self.start - self.width;
        (lo + self.width - 1, lo)
    }
}

/// Why a single value failed to encode. Converted to a [`CompileError`] once the row and
/// field are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EncodeError {
    OutOfRange { value: u64, width: u32 },
    Unresolved { ty: String, symbol: String },
    Underived(String),
    Invalid(Value),
}

impl EncodeError {
    pub(crate) fn at(self, row: RowRef, field: &str) -> CompileError {
        let field = field.to_owned();
        match self {
            EncodeError::OutOfRange { value, width } => CompileError::ValueOutOfRange {
                row,
                field,
                value,
                width,
            },
            EncodeError::Unresolved { ty, symbol } => CompileError::UnresolvedSymbol {
                row,
                field,
                ty,
                symbol,
            },
            EncodeError::Underived(ty) => CompileError::UnderivedType(ty),
            EncodeError::Invalid(value) => CompileError::InvalidValue { row, field, value },
        }
    }
}

/// The packed layout of one table's rows.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    /// Table name.
    pub name: String,
    /// Name of the emitted record declaration.
    pub record: String,
    fields: Vec<FieldLayout>,
    by_name: HashMap<String, usize>,
    labels: Vec<String>,
    total_width: u32,
}

impl RecordLayout {
    /// Assign each column a start offset equal to the total width of the columns before
    /// it.
    pub fn compute(table: &TableSpec, types: &TypeTable) -> Result<Self> {
        let mut fields = Vec::with_capacity(table.columns.len());
        let mut by_name = HashMap::new();
        let mut start = 0u32;
        for column in &table.columns {
            let owner = || format!("column `{}` of table `{}`", column.name, table.name);
            let width = match &column.ty {
                Some(ty) => types.get(ty, owner)?.width,
                None => match column.width {
                    Some(width) if width > 0 && width <= 64 => width,
                    _ => return Err(CompileError::WidthOverflow(owner())),
                },
            };
            if by_name.insert(column.name.clone(), fields.len()).is_some() {
                return Err(CompileError::InvalidSchema(format!(
                    "table `{}` declares column `{}` twice",
                    table.name, column.name
                )));
            }
            fields.push(FieldLayout {
                name: column.name.clone(),
                ty: column.ty.clone(),
                start,
                width,
                description: column.description.clone(),
            });
            start += width;
        }
        debug!(
            "Table {} packs {} fields into {} bits",
            table.name,
            fields.len(),
            start
        );
        Ok(RecordLayout {
            name: table.name.clone(),
            record: table.record_name(),
            fields,
            by_name,
            labels: table.labels.clone(),
            total_width: start,
        })
    }

    pub fn total_width(&self) -> u32 {
        self.total_width
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Whether a row key is an annotation that is never packed.
    pub fn is_label(&self, key: &str) -> bool {
        key.starts_with('_') || self.labels.iter().any(|label| label == key)
    }

    /// Encode one value for a field: the enum code of a symbol, or an integer checked
    /// against the field width.
    pub(crate) fn encode(
        &self,
        field: &FieldLayout,
        value: &Value,
        types: &TypeTable,
    ) -> std::result::Result<u64, EncodeError> {
        let ty = field.ty.as_deref().and_then(|name| types.lookup(name));
        let code = match ty {
            Some(def) if def.is_enum() => encode_symbol(def, value)?,
            _ => match value {
                Value::Int(v) => *v,
                other => return Err(EncodeError::Invalid(other.clone())),
            },
        };
        if code > max_for_width(field.width) {
            return Err(EncodeError::OutOfRange {
                value: code,
                width: field.width,
            });
        }
        Ok(code)
    }

    /// Resolve a row to one integer per field, in field order. Missing fields are zero.
    pub fn resolve_row(&self, row: &Row, at: &RowRef, types: &TypeTable) -> Result<Vec<u64>> {
        let mut codes = vec![0; self.fields.len()];
        for (key, value) in row {
            let Some(index) = self.field_index(key) else {
                if self.is_label(key) {
                    continue;
                }
                return Err(CompileError::UnknownColumn {
                    row: at.clone(),
                    field: key.clone(),
                });
            };
            let field = &self.fields[index];
            codes[index] = self
                .encode(field, value, types)
                .map_err(|e| e.at(at.clone(), key))?;
        }
        Ok(codes)
    }

    /// Turn resolved field codes back into a row, using enum symbols where the field has
    /// an enum type. Zero-valued fields are included.
    pub fn decode_row(&self, codes: &[u64], types: &TypeTable) -> Row {
        self.fields
            .iter()
            .zip(codes)
            .map(|(field, &code)| {
                let symbol = field
                    .ty
                    .as_deref()
                    .and_then(|name| types.lookup(name))
                    .filter(|def| def.is_enum())
                    .and_then(|def| def.symbols().get(usize::try_from(code).ok()?));
                let value = match symbol {
                    Some(symbol) => Value::symbol(symbol),
                    None => Value::Int(code),
                };
                (field.name.clone(), value)
            })
            .collect()
    }
}

fn encode_symbol(def: &TypeDef, value: &Value) -> std::result::Result<u64, EncodeError> {
    if !def.is_resolved() {
        return Err(EncodeError::Underived(def.name.clone()));
    }
    let symbol = match value {
        Value::Symbol(symbol) => symbol.clone(),
        Value::Int(num) => num.to_string(),
        other => return Err(EncodeError::Invalid(other.clone())),
    };
    match def.symbols().code(&symbol) {
        Some(code) => Ok(code as u64),
        None => Err(EncodeError::Unresolved {
            ty: def.name.clone(),
            symbol,
        }),
    }
}

/// Every type and record layout of a schema, resolved.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    types: TypeTable,
    layouts: Vec<RecordLayout>,
}

impl ResolvedSchema {
    /// Resolve every type and compute every table layout. Derived enums stay unresolved
    /// until [`derive_symbols`](Self::derive_symbols) is called.
    pub fn new(schema: &Schema) -> Result<Self> {
        let types = TypeTable::from_specs(&schema.types)?;
        let mut layouts: Vec<RecordLayout> = Vec::with_capacity(schema.tables.len());
        for table in &schema.tables {
            if layouts.iter().any(|l| l.name == table.name) {
                return Err(CompileError::InvalidSchema(format!(
                    "table `{}` is defined twice",
                    table.name
                )));
            }
            layouts.push(RecordLayout::compute(table, &types)?);
        }
        for def in types.iter() {
            if let Some(derive) = def.derive() {
                let source = layouts
                    .iter()
                    .find(|l| l.name == derive.table)
                    .ok_or_else(|| CompileError::UnknownTable(derive.table.clone()))?;
                if source.field(&derive.column).is_none() && !source.is_label(&derive.column) {
                    return Err(CompileError::UnknownColumn {
                        row: RowRef::table(&derive.table, 0),
                        field: derive.column.clone(),
                    });
                }
            }
        }
        Ok(ResolvedSchema { types, layouts })
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn layouts(&self) -> &[RecordLayout] {
        &self.layouts
    }

    pub fn layout(&self, table: &str) -> Result<&RecordLayout> {
        self.layouts
            .iter()
            .find(|l| l.name == table)
            .ok_or_else(|| CompileError::UnknownTable(table.to_owned()))
    }

    /// Fill derived enums from the assembled tables.
    pub fn derive_symbols(&mut self, tables: &TableSet) -> Result<()> {
        self.types.derive_symbols(tables)
    }
}
