//! Microcode for the NEC uPD7800.
//!
//! The [`signals`] module supplies typed control signals for the uPD7800 datapath, and
//! [`defs`] builds every instruction's micro-program from them. [`compile`] runs the whole
//! instruction set through [`ucodegen`] against the bundled [`SCHEMA`].

use log::info;
use ucodegen::{CompilerConfig, Image, ResolvedSchema, Result, Schema, TableSet};

// Must come first: macros are only visible to modules declared after them.
mod macros;

pub mod defs;
pub mod signals;

pub use defs::define;

/// Schema of the uPD7800 microcode tables.
pub const SCHEMA: &str = include_str!("../schema/upd7800.json");

/// Parse [`SCHEMA`].
pub fn schema() -> Result<Schema> {
    Schema::from_json(SCHEMA)
}

/// Compiler settings for the uPD7800.
///
/// The last steps of an instruction may run up to three cycles into the next opcode fetch,
/// and a skip condition may only be latched on the last step.
pub fn config() -> CompilerConfig {
    CompilerConfig {
        terminal_only: vec![signals::SkipCond::FIELD.into()],
        overlap_window: 3,
        ..Default::default()
    }
}

/// Generate the uPD7800 tables without packing them.
pub fn generate(config: &CompilerConfig) -> Result<(ResolvedSchema, TableSet)> {
    ucodegen::generate(&schema()?, config, define)
}

/// Compile the uPD7800 microcode into its output artifacts.
pub fn compile(config: &CompilerConfig) -> Result<Image> {
    let image = ucodegen::compile(&schema()?, config, define)?;
    info!("Compiled uPD7800 microcode");
    Ok(image)
}
