//! Logical tables of rows, as produced by the assembler or read from a schema.

use serde::{Deserialize, Serialize};

use crate::config::CompilerConfig;
use crate::error::{CompileError, Result, RowRef};
use crate::schema::Schema;
use crate::types::max_for_width;
use crate::value::{Row, Value};

/// A named list of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// An ordered collection of tables with unique names. This is also the document format
/// for generated rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    /// Collect the rows of every table of the schema. Opcode ranges in the decode table
    /// are expanded to one row per opcode.
    pub fn from_schema(schema: &Schema, config: &CompilerConfig) -> Result<Self> {
        let width = opcode_width(schema, config);
        let mut set = TableSet::default();
        for spec in &schema.tables {
            let rows = if spec.name == config.tables.decode {
                expand_opcode_ranges(&spec.name, &spec.rows, &config.fields.opcode, width)?
            } else {
                spec.rows.clone()
            };
            set.insert(Table::new(spec.name.clone(), rows));
        }
        Ok(set)
    }

    /// Parse a table set from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Add a table, replacing any existing table of the same name in place.
    pub fn insert(&mut self, table: Table) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    /// Insert every table of `other`, replacing same-named tables.
    pub fn extend(&mut self, other: TableSet) {
        for table in other.tables {
            self.insert(table);
        }
    }

    pub fn get(&self, name: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CompileError::UnknownTable(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}

/// Bits available to a decode-table opcode: the width of the opcode column when the table
/// packs one, otherwise the configured opcode width.
fn opcode_width(schema: &Schema, config: &CompilerConfig) -> u32 {
    let column = schema.get_column(&config.fields.opcode, &config.tables.decode);
    let declared = column.and_then(|column| match &column.ty {
        Some(ty) => schema.get_type(ty).ok().and_then(|def| def.width),
        None => column.width,
    });
    declared.unwrap_or(config.opcode_width)
}

/// Expand decode rows whose opcode is a `[low, high]` range into one row per opcode. Every
/// expanded row keeps the other fields of its source row, so they all share one entry
/// point. Opcodes must fit in `width` bits, and never more than 32.
pub fn expand_opcode_ranges(
    table: &str,
    rows: &[Row],
    opcode_field: &str,
    width: u32,
) -> Result<Vec<Row>> {
    let width = width.min(u32::BITS);
    let mut expanded = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let at = RowRef::table(table, index);
        let opcode = row
            .get(opcode_field)
            .ok_or_else(|| CompileError::MissingField {
                row: at.clone(),
                field: opcode_field.to_owned(),
            })?;
        let (lo, hi) = match opcode {
            Value::Int(opcode) => (*opcode, *opcode),
            Value::Range([lo, hi]) if lo <= hi => (*lo, *hi),
            other => {
                return Err(CompileError::InvalidValue {
                    row: at,
                    field: opcode_field.to_owned(),
                    value: other.clone(),
                })
            }
        };
        if hi > max_for_width(width) {
            return Err(CompileError::ValueOutOfRange {
                row: at,
                field: opcode_field.to_owned(),
                value: hi,
                width,
            });
        }
        for opcode in lo..=hi {
            let mut single = row.clone();
            single.insert(opcode_field.to_owned(), Value::Int(opcode));
            expanded.push(single);
        }
    }
    Ok(expanded)
}
