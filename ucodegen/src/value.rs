//! Values appearing in table rows and control words.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a row: a literal integer, the name of an enum symbol, or an inclusive
/// `[low, high]` opcode range (decode tables only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(u64),
    Symbol(String),
    Range([u64; 2]),
}

impl Value {
    /// Shorthand for a symbolic value.
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// Whether two values encode alike. An integer matches the symbol that spells it in
    /// decimal, as enum fields look integers up by that spelling.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(num), Value::Symbol(symbol)) => *symbol == num.to_string(),
            (Value::Symbol(symbol), Value::Int(num)) => *symbol == num.to_string(),
            _ => self == other,
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Int(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Symbol(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Symbol(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Symbol(s) => write!(f, "`{}`", s),
            Value::Range([lo, hi]) => write!(f, "[{:#x}, {:#x}]", lo, hi),
        }
    }
}

/// A table row: field name to value. Fields are kept sorted so that serialized rows are
/// stable across runs.
pub type Row = BTreeMap<String, Value>;
