//! Serde model of the schema document: type definitions, table layouts and row data.
//!
//! The schema is consumed read-only by the resolver. Row data may come from the document
//! itself or be merged in from a generated [`TableSet`].

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CompileError, Result};
use crate::table::TableSet;
use crate::value::Row;

/// Whether a type is a plain integer or an enumeration of named symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[serde(rename = "int", alias = "scalar")]
    Scalar,
    Enum,
}

/// Names the table column an enum takes its symbols from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeriveSpec {
    pub table: String,
    pub column: String,
    /// When set, rows lacking the column contribute a `_{index:X}` placeholder symbol, so a
    /// symbol's code is always the index of the row it came from.
    #[serde(default)]
    pub fill_missing: bool,
}

/// A named type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TypeKind,
    #[serde(default)]
    pub width: Option<u32>,
    /// Declared symbols of an enum, in code order.
    #[serde(
        default,
        rename = "values",
        alias = "symbols",
        deserialize_with = "symbol_names"
    )]
    pub symbols: Vec<String>,
    /// Prepended to every symbol in emitted declarations.
    #[serde(default)]
    pub prefix: String,
    #[serde(default, rename = "desc", alias = "description")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derive: Option<DeriveSpec>,
}

/// Symbols may be written as bare numbers (`0`, `1`); they are kept as their decimal text.
fn symbol_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Name {
        Text(String),
        Number(u64),
    }

    let names = Vec::<Name>::deserialize(deserializer)?;
    Ok(names
        .into_iter()
        .map(|name| match name {
            Name::Text(text) => text,
            Name::Number(num) => num.to_string(),
        })
        .collect())
}

/// A packed column of a table. Either `type` names a [`TypeSpec`] or `width` gives a
/// literal integer width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, rename = "desc", alias = "description")]
    pub description: String,
}

/// A table: its record layout and, optionally, its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    /// Name of the emitted record declaration. Defaults to `s_<name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    pub columns: Vec<ColumnSpec>,
    /// Row keys that annotate rows but are not packed.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl TableSpec {
    pub fn record_name(&self) -> String {
        match &self.record {
            Some(record) => record.clone(),
            None => format!("s_{}", self.name),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The full schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

impl Schema {
    /// Parse a schema from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Look up a type by name.
    pub fn get_type(&self, name: &str) -> Result<&TypeSpec> {
        self.types
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CompileError::UnknownType {
                name: name.to_owned(),
                owner: "the schema".to_owned(),
            })
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Result<&TableSpec> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CompileError::UnknownTable(name.to_owned()))
    }

    /// Look up a packed column of a table. `None` if either the table or the column is
    /// missing.
    pub fn get_column(&self, name: &str, table: &str) -> Option<&ColumnSpec> {
        self.table(table).ok()?.column(name)
    }

    /// Rows of a table, in declaration order.
    pub fn rows(&self, table: &str) -> Result<&[Row]> {
        Ok(&self.table(table)?.rows)
    }

    /// Replace the rows of every table present in `tables` with the rows given there.
    /// Every table must already be declared by this schema.
    pub fn merge_rows(&mut self, tables: TableSet) -> Result<()> {
        for table in tables.into_tables() {
            let spec = self
                .tables
                .iter_mut()
                .find(|t| t.name == table.name)
                .ok_or_else(|| CompileError::UnknownTable(table.name.clone()))?;
            debug!(
                "Merging {} rows into table {}",
                table.rows.len(),
                table.name
            );
            spec.rows = table.rows;
        }
        Ok(())
    }
}
