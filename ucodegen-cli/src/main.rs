use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use ucodegen::{CompilerConfig, Schema, TableSet};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the uPD7800 microcode and write every artifact.
    Build {
        /// Directory to write the artifacts into. Created if missing.
        #[arg(short, long)]
        out_dir: PathBuf,
        /// JSON document overriding compiler settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the generated uPD7800 tables as a JSON document.
    Generate {
        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// JSON document overriding compiler settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Pack the tables of a schema document.
    Pack {
        /// Schema document to pack.
        #[arg(short, long)]
        schema: PathBuf,
        /// Generated tables to merge into the schema first. May be repeated.
        #[arg(short, long)]
        rows: Vec<PathBuf>,
        /// Directory to write the artifacts into. Created if missing.
        #[arg(short, long)]
        out_dir: PathBuf,
        /// JSON document overriding compiler settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the built-in uPD7800 schema document.
    Schema,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Apply the overrides in `path`, if any, on top of `base`.
fn load_config(path: Option<&Path>, base: CompilerConfig) -> Result<CompilerConfig> {
    match path {
        Some(path) => {
            let config = base
                .merge_json(&read(path)?)
                .with_context(|| format!("Invalid config {}", path.display()))?;
            debug!("Loaded config from {}: {:?}", path.display(), config);
            Ok(config)
        }
        None => Ok(base),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Build { out_dir, config } => {
            let config = load_config(config.as_deref(), ucodegen_upd7800::config())?;
            let image = ucodegen_upd7800::compile(&config).context("Compile failed")?;
            image.write_to(&out_dir)?;
        }
        Command::Generate { out, config } => {
            let config = load_config(config.as_deref(), ucodegen_upd7800::config())?;
            let (_, tables) = ucodegen_upd7800::generate(&config).context("Generate failed")?;
            let text = serde_json::to_string_pretty(&tables)?;
            match out {
                Some(path) => {
                    fs::write(&path, text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote tables to {}", path.display());
                }
                None => writeln!(io::stdout().lock(), "{}", text)?,
            }
        }
        Command::Pack {
            schema,
            rows,
            out_dir,
            config,
        } => {
            let config = load_config(config.as_deref(), CompilerConfig::default())?;
            let mut document = Schema::from_json(&read(&schema)?)
                .with_context(|| format!("Invalid schema {}", schema.display()))?;
            for path in &rows {
                let tables = TableSet::from_json(&read(path)?)
                    .with_context(|| format!("Invalid tables {}", path.display()))?;
                document
                    .merge_rows(tables)
                    .with_context(|| format!("Failed to merge {}", path.display()))?;
            }
            let image = ucodegen::pack(&document, &config).context("Pack failed")?;
            image.write_to(&out_dir)?;
        }
        Command::Schema => {
            io::stdout()
                .lock()
                .write_all(ucodegen_upd7800::SCHEMA.as_bytes())?;
        }
    }
    Ok(())
}
