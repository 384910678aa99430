//! Text artifacts: SystemVerilog declarations, the decode lookup listing, and the packed
//! memory images, gathered into an in-memory [`Image`].

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::config::CompilerConfig;
use crate::error::{CompileError, Result, RowRef};
use crate::layout::{RecordLayout, ResolvedSchema};
use crate::pack::pack_table;
use crate::table::TableSet;
use crate::types::{TypeDef, TypeTable};
use crate::value::Value;

const HEADER: &str = "// Generated by ucodegen. Do not edit.\n\n";

/// One emitted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub contents: String,
}

/// Every artifact of a build. Nothing is written until [`write_to`](Image::write_to).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub files: Vec<OutputFile>,
}

impl Image {
    pub fn file(&self, name: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Write every file into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let io_error = |path: &Path| {
            let path = path.display().to_string();
            move |source| CompileError::Io { path, source }
        };
        fs::create_dir_all(dir).map_err(io_error(dir))?;
        for file in &self.files {
            let path = dir.join(&file.name);
            fs::write(&path, &file.contents).map_err(io_error(&path))?;
            debug!("Wrote {}", path.display());
        }
        info!("Wrote {} files to {}", self.files.len(), dir.display());
        Ok(())
    }
}

fn comment(description: &str) -> String {
    if description.is_empty() {
        String::new()
    } else {
        format!("    // {}", description)
    }
}

fn type_declaration(def: &TypeDef) -> Result<String> {
    let hi = def.width - 1;
    if !def.is_enum() {
        return Ok(format!(
            "typedef reg [{}:0] {};{}\n",
            hi,
            def.name,
            comment(&def.description)
        ));
    }
    if !def.is_resolved() {
        return Err(CompileError::UnderivedType(def.name.clone()));
    }
    let mut out = format!("typedef enum reg [{}:0]\n{{\n", hi);
    let count = def.symbols().len();
    for (code, symbol) in def.symbols().iter().enumerate() {
        let sep = if code + 1 == count { "" } else { "," };
        out.push_str(&format!(
            "    {}{} = {}'d{}{}\n",
            def.prefix, symbol, def.width, code, sep
        ));
    }
    out.push_str(&format!("}} {};{}\n", def.name, comment(&def.description)));
    Ok(out)
}

fn record_declaration(layout: &RecordLayout) -> String {
    let total = layout.total_width();
    let mut out = String::from("typedef struct packed\n{\n");
    for field in layout.fields() {
        let ty = match &field.ty {
            Some(ty) => ty.clone(),
            None => format!("reg [{}:0]", field.width - 1),
        };
        let (hi, lo) = field.bit_numbers(total);
        let mut line = format!("    {} {};    // [{}:{}]", ty, field.name, hi, lo);
        if !field.description.is_empty() {
            line.push(' ');
            line.push_str(&field.description);
        }
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!("}} {};\n", layout.record));
    out
}

/// Type declarations for every type, then one packed struct per table. Bit ranges come
/// from the same layouts the packer uses.
pub fn declarations(resolved: &ResolvedSchema) -> Result<String> {
    let mut out = String::from(HEADER);
    for def in resolved.types().iter() {
        out.push_str(&type_declaration(def)?);
        out.push('\n');
    }
    for layout in resolved.layouts() {
        out.push_str(&record_declaration(layout));
        out.push('\n');
    }
    Ok(out)
}

fn render_field(types: &TypeTable, ty: Option<&str>, width: u32, code: u64) -> String {
    let symbol = ty
        .and_then(|name| types.lookup(name))
        .filter(|def| def.is_enum())
        .and_then(|def| {
            usize::try_from(code)
                .ok()
                .and_then(|c| def.symbols().get(c))
                .map(|symbol| format!("{}{}", def.prefix, symbol))
        });
    symbol.unwrap_or_else(|| format!("{}'d{}", width, code))
}

/// One assignment per decode row, mapping its opcode to the row's fields in layout order.
/// Missing fields render as zero: the code-0 symbol of an enum, `w'd0` for an integer.
pub fn decode_lookup(
    resolved: &ResolvedSchema,
    tables: &TableSet,
    config: &CompilerConfig,
) -> Result<String> {
    let name = &config.tables.decode;
    let opcode_field = &config.fields.opcode;
    let layout = resolved.layout(name)?;
    let table = tables.get(name)?;
    let types = resolved.types();

    let mut opcodes = Vec::with_capacity(table.rows.len());
    for (index, row) in table.rows.iter().enumerate() {
        let at = RowRef::table(name, index);
        match row.get(opcode_field) {
            Some(Value::Int(opcode)) => opcodes.push(*opcode),
            Some(other) => {
                return Err(CompileError::InvalidValue {
                    row: at,
                    field: opcode_field.clone(),
                    value: other.clone(),
                })
            }
            None => {
                return Err(CompileError::MissingField {
                    row: at,
                    field: opcode_field.clone(),
                })
            }
        }
    }
    let largest = opcodes.iter().copied().max().unwrap_or(0);
    let digits = (format!("{:x}", largest).len()).max(3);

    let mut out = String::from(HEADER);
    for (index, (row, opcode)) in table.rows.iter().zip(&opcodes).enumerate() {
        let codes = layout.resolve_row(row, &RowRef::table(name, index), types)?;
        let fields: Vec<String> = layout
            .fields()
            .iter()
            .zip(codes)
            .map(|(field, code)| render_field(types, field.ty.as_deref(), field.width, code))
            .collect();
        out.push_str(&format!(
            "    {}['h{:0width$x}] = {{{}}};\n",
            config.outputs.decode_array,
            opcode,
            fields.join(", "),
            width = digits
        ));
    }
    Ok(out)
}

/// Build every artifact: declarations, the decode lookup, and one memory image per table.
/// Fails on the first bad row, before anything is written.
pub fn build_image(
    resolved: &ResolvedSchema,
    tables: &TableSet,
    config: &CompilerConfig,
) -> Result<Image> {
    let outputs = &config.outputs;
    let mut files = vec![
        OutputFile {
            name: outputs.declarations.clone(),
            contents: declarations(resolved)?,
        },
        OutputFile {
            name: outputs.decode_lookup.clone(),
            contents: decode_lookup(resolved, tables, config)?,
        },
    ];
    for layout in resolved.layouts() {
        let table = tables.get(&layout.name)?;
        let rows = pack_table(layout, resolved.types(), table)?;
        let mut contents = String::with_capacity(rows.len() * (layout.total_width() as usize + 1));
        for row in &rows {
            contents.push_str(row.as_str());
            contents.push('\n');
        }
        debug!(
            "Packed {} rows of {} at {} bits",
            rows.len(),
            layout.name,
            layout.total_width()
        );
        files.push(OutputFile {
            name: format!("{}.{}", layout.name, outputs.memory_extension),
            contents,
        });
    }
    Ok(Image { files })
}
