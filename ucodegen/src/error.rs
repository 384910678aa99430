//! Errors raised while compiling a microcode image.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::value::Value;

/// Identifies the logical row an error was found in, so the author can find the defect
/// without reading the emitted tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRef {
    /// A row of a named table, by index in that table.
    Table { table: String, index: usize },
    /// A step of a micro-program that has not been committed to a table yet.
    Step { sequence: String, step: usize },
    /// The decode-table row for a single opcode.
    Opcode { table: String, opcode: u32 },
}

impl RowRef {
    pub fn table(table: impl Into<String>, index: usize) -> Self {
        Self::Table {
            table: table.into(),
            index,
        }
    }

    pub fn step(sequence: impl Into<String>, step: usize) -> Self {
        Self::Step {
            sequence: sequence.into(),
            step,
        }
    }

    pub fn opcode(table: impl Into<String>, opcode: u32) -> Self {
        Self::Opcode {
            table: table.into(),
            opcode,
        }
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { table, index } => write!(f, "{}[{}]", table, index),
            Self::Step { sequence, step } => write!(f, "{} step {}", sequence, step),
            Self::Opcode { table, opcode } => write!(f, "{} opcode {:#05x}", table, opcode),
        }
    }
}

/// Error produced when building a microcode image. Every error is fatal to the build.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The schema or row document could not be parsed.
    #[error("Malformed schema document: {0}")]
    Parse(#[from] serde_json::Error),
    /// Writing an artifact failed.
    #[error("Unable to write {path}")]
    Io {
        /// Path of the file being written.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A type name was referenced but never defined.
    #[error("Unknown type `{name}` referenced by {owner}")]
    UnknownType {
        /// Name that failed to resolve.
        name: String,
        /// What referenced the type.
        owner: String,
    },
    /// A table name was referenced but never defined.
    #[error("Unknown table `{0}`")]
    UnknownTable(String),
    /// A row or control word named a field its record does not have.
    #[error("{row}: unknown column `{field}`")]
    UnknownColumn { row: RowRef, field: String },
    /// A row is missing a field that must always be present.
    #[error("{row}: missing required field `{field}`")]
    MissingField { row: RowRef, field: String },
    /// A type or literal column has no usable width.
    #[error("{0} needs an explicit, non-zero width")]
    WidthOverflow(String),
    /// An enum has more symbols than its width can encode.
    #[error("Enum `{name}` has {count} symbols, which do not fit in {width} bits")]
    SymbolOverflow {
        name: String,
        count: usize,
        width: u32,
    },
    /// An enum whose symbols come from table data was used before they were derived.
    #[error("Symbols of enum `{0}` have not been derived yet")]
    UnderivedType(String),
    /// A structural problem in the schema document.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Two fragments of one control word assign different values to the same field.
    #[error("{row}: fragments disagree on `{field}` ({first} vs {second})")]
    ControlWordConflict {
        row: RowRef,
        field: String,
        /// Value assigned first.
        first: Value,
        /// Conflicting value assigned later.
        second: Value,
    },
    /// A sequence has more steps than its declared cycle count allows.
    #[error("{row}: exceeds the {cycles}-cycle budget ({fetch} cycles go to the opcode fetch)")]
    CycleBudgetExceeded {
        /// The first step that does not fit.
        row: RowRef,
        cycles: u32,
        fetch: u32,
    },
    /// A field that may only end a sequence was set on an earlier step.
    #[error("{row}: `{field}` may only be set on the last step of a sequence")]
    TerminalFieldNotLast { row: RowRef, field: String },
    /// A sequence with no steps was committed.
    #[error("Sequence `{0}` has no steps")]
    EmptySequence(String),
    /// Two sequences were committed under the same entry name.
    #[error("Entry point `{0}` is defined more than once")]
    DuplicateEntry(String),
    /// One opcode was assigned to two instructions.
    #[error("Opcode {opcode:#05x} is assigned to both `{first}` and `{second}`")]
    DuplicateOpcode {
        opcode: u32,
        first: String,
        second: String,
    },
    /// An encoded integer does not fit in its field.
    #[error("{row}: value {value} does not fit in the {width}-bit field `{field}`")]
    ValueOutOfRange {
        row: RowRef,
        field: String,
        value: u64,
        width: u32,
    },
    /// A symbol is not a member of its field's enum.
    #[error("{row}: `{symbol}` is not a symbol of `{ty}` (field `{field}`)")]
    UnresolvedSymbol {
        row: RowRef,
        field: String,
        ty: String,
        symbol: String,
    },
    /// A value has the wrong shape for its field, such as a range outside a decode table.
    #[error("{row}: {value} is not a valid value for `{field}`")]
    InvalidValue {
        row: RowRef,
        field: String,
        value: Value,
    },
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
