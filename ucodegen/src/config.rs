//! Compiler configuration: table and field names, fetch costs and output naming.
//!
//! Every field has a default, so a config document only needs to list what it changes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Cycles consumed by fetching an instruction's opcode before its own steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchCost {
    /// Cost of a single-byte opcode.
    pub single: u32,
    /// Cost of a prefixed opcode.
    pub prefixed: u32,
    /// Opcodes at or above this value are prefixed.
    pub prefix_base: u32,
}

impl Default for FetchCost {
    fn default() -> Self {
        Self {
            single: 4,
            prefixed: 8,
            prefix_base: 0x100,
        }
    }
}

impl FetchCost {
    pub fn for_opcode(&self, opcode: u32) -> u32 {
        if opcode >= self.prefix_base {
            self.prefixed
        } else {
            self.single
        }
    }
}

/// Names of the three generated tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub decode: String,
    pub sequence: String,
    pub control: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            decode: "ird".into(),
            sequence: "urom".into(),
            control: "nrom".into(),
        }
    }
}

/// Names of the fields the assembler fills in itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Decode-table opcode label.
    pub opcode: String,
    /// Entry-point symbol: a decode-table field and a sequence-table label.
    pub entry: String,
    /// Decode-table flag for an instruction whose budget is used up by the fetch.
    pub entry_overlap: String,
    /// Decode-table operand count.
    pub operands: String,
    /// Sequence-table control-word address, and the control table's index label.
    pub control: String,
    /// Sequence-table flag for the step where the budget reaches zero.
    pub overlap: String,
    /// Sequence-table branch field, set to the end symbol on the last step.
    pub branch: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            opcode: "at".into(),
            entry: "uaddr".into(),
            entry_overlap: "m1_overlap".into(),
            operands: "noper".into(),
            control: "naddr".into(),
            overlap: "m1".into(),
            branch: "bm".into(),
        }
    }
}

/// File names of the emitted artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNames {
    pub declarations: String,
    pub decode_lookup: String,
    /// Name of the array assigned in the decode lookup listing.
    pub decode_array: String,
    /// Extension of the packed memory images, one per table.
    pub memory_extension: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            declarations: "uc-types.svh".into(),
            decode_lookup: "uc-ird.svh".into(),
            decode_array: "ird_lut".into(),
            memory_extension: "mem".into(),
        }
    }
}

/// Configuration of a compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub tables: TableNames,
    pub fields: FieldNames,
    pub outputs: OutputNames,
    /// Branch symbol marking the last step of a sequence.
    pub end_symbol: String,
    /// Control-word fields that may only be set on the last step of a sequence.
    pub terminal_only: Vec<String>,
    pub fetch: FetchCost,
    /// How many cycles the last steps of an instruction may run into the next opcode
    /// fetch. Zero makes any overrun a [`CycleBudgetExceeded`] error.
    ///
    /// [`CycleBudgetExceeded`]: crate::CompileError::CycleBudgetExceeded
    pub overlap_window: u32,
    /// Bits of an opcode when the decode table does not pack its opcode column. Decode
    /// opcodes and opcode ranges past this width are rejected.
    pub opcode_width: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            tables: Default::default(),
            fields: Default::default(),
            outputs: Default::default(),
            end_symbol: "END".into(),
            terminal_only: Vec::new(),
            fetch: Default::default(),
            overlap_window: 0,
            opcode_width: 11,
        }
    }
}

impl CompilerConfig {
    /// Parse a config document, filling unspecified settings with defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Apply the settings of a config document on top of this config. Keys missing from
    /// the document keep their current value.
    pub fn merge_json(&self, text: &str) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        let overrides: serde_json::Value = serde_json::from_str(text)?;
        merge_values(&mut base, overrides);
        Ok(serde_json::from_value(base)?)
    }
}

fn merge_values(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, value) => *base = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_cost() {
        let fetch = FetchCost::default();
        assert_eq!(fetch.for_opcode(0x00), 4);
        assert_eq!(fetch.for_opcode(0xff), 4);
        assert_eq!(fetch.for_opcode(0x100), 8);
        assert_eq!(fetch.for_opcode(0x7f8), 8);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config =
            CompilerConfig::from_json(r#"{"overlap_window": 3, "tables": {"decode": "dec"}}"#)
                .unwrap();
        assert_eq!(config.overlap_window, 3);
        assert_eq!(config.tables.decode, "dec");
        assert_eq!(config.tables.sequence, "urom");
        assert_eq!(config.fields.entry, "uaddr");
        assert_eq!(config.end_symbol, "END");
        assert_eq!(config.opcode_width, 11);
    }

    #[test]
    fn merge_overrides_only_given_keys() {
        let base = CompilerConfig {
            overlap_window: 3,
            terminal_only: vec!["pswsk".into()],
            ..Default::default()
        };
        let merged = base
            .merge_json(r#"{"fetch": {"prefixed": 6}, "end_symbol": "DONE"}"#)
            .unwrap();
        assert_eq!(merged.overlap_window, 3);
        assert_eq!(merged.terminal_only, ["pswsk"]);
        assert_eq!(merged.fetch.prefixed, 6);
        assert_eq!(merged.fetch.single, 4);
        assert_eq!(merged.end_symbol, "DONE");
    }
}
