//! Microcode compiler.
//!
//! A schema document declares named types (integers and enums) and tables with packed
//! record layouts. Instructions are defined in Rust as sequences of control-word
//! fragments. Compiling them produces three tables:
//!
//! * the decode table, one row per opcode, pointing at the instruction's sequence;
//! * the sequence table, one row per micro-step, holding a control-word address and the
//!   step flags;
//! * the control-word table, holding each distinct control word once.
//!
//! The tables are packed into fixed-width `'0'`/`'1'` memory images alongside the
//! SystemVerilog declarations hardware needs to interpret them.
//!
//! Compilation is deterministic: the same schema and definitions always produce the same
//! addresses and byte-identical output.

use log::info;

pub use assembler::{Assembler, InstructionDef, Opcodes};
pub use config::CompilerConfig;
pub use control::{ControlWord, Fragment};
pub use emit::{build_image, Image, OutputFile};
pub use error::{CompileError, Result, RowRef};
pub use layout::ResolvedSchema;
pub use schema::Schema;
pub use sequence::Sequence;
pub use table::{Table, TableSet};
pub use value::{Row, Value};

pub mod assembler;
pub mod config;
pub mod control;
pub mod emit;
pub mod error;
pub mod intern;
pub mod layout;
pub mod pack;
pub mod schema;
pub mod sequence;
pub mod table;
pub mod types;
pub mod value;

/// Run `define` against a fresh [`Assembler`] and return the schema's tables with the
/// generated decode, sequence and control tables in place of any rows the schema had for
/// them. Derived enums are resolved from the result.
pub fn generate<F>(
    schema: &Schema,
    config: &CompilerConfig,
    define: F,
) -> Result<(ResolvedSchema, TableSet)>
where
    F: FnOnce(&mut Assembler<'_>) -> Result<()>,
{
    let mut resolved = ResolvedSchema::new(schema)?;
    let mut tables = TableSet::from_schema(schema, config)?;
    let generated = {
        let mut asm = Assembler::new(&resolved, config)?;
        define(&mut asm)?;
        asm.finish()
    };
    tables.extend(generated);
    resolved.derive_symbols(&tables)?;
    info!("Generated {} tables", tables.iter().count());
    Ok((resolved, tables))
}

/// Generate the tables and build every artifact, without touching the filesystem.
pub fn compile<F>(schema: &Schema, config: &CompilerConfig, define: F) -> Result<Image>
where
    F: FnOnce(&mut Assembler<'_>) -> Result<()>,
{
    let (resolved, tables) = generate(schema, config, define)?;
    let image = build_image(&resolved, &tables, config)?;
    info!("Built {} artifacts", image.files.len());
    Ok(image)
}

/// Build every artifact from the rows already present in a schema document, such as
/// previously generated tables merged in with [`Schema::merge_rows`].
pub fn pack(schema: &Schema, config: &CompilerConfig) -> Result<Image> {
    let mut resolved = ResolvedSchema::new(schema)?;
    let tables = TableSet::from_schema(schema, config)?;
    resolved.derive_symbols(&tables)?;
    let image = build_image(&resolved, &tables, config)?;
    info!("Packed {} artifacts", image.files.len());
    Ok(image)
}
