//! printhost CLI — inspect G-code files and print-file metadata.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use printhost_commands::split_codes;
use printhost_files::{CancellationToken, FileInfoParser, PathResolver, Settings};
use printhost_machine::{DirectoryCategory, ModelProvider};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "printhost",
    version,
    about = "Inspect G-code files: split them into typed codes and mine slicer metadata"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Split a G-code file into codes and print them one per line.
    Parse {
        /// G-code file to parse.
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Print the codes as a JSON array instead of canonical text.
        #[arg(long)]
        json: bool,
    },

    /// Extract slicer metadata from the head and tail of a print file.
    Info {
        /// Print file to inspect.
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Settings JSON overriding the built-in defaults.
        #[arg(long, value_name = "PATH")]
        settings: Option<PathBuf>,
    },

    /// Resolve a virtual path (`n:/...`) to a physical one.
    Resolve {
        /// Virtual path to resolve.
        #[arg(value_name = "PATH")]
        path: String,
        /// Base directory backing drive 0.
        #[arg(long, value_name = "DIR")]
        base: Option<PathBuf>,
        /// Directory category for relative paths.
        #[arg(long, value_enum, default_value_t = Category::Gcodes)]
        category: Category,
    },
}

/// Directory category argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Category {
    Filaments,
    Gcodes,
    Macros,
    System,
    Www,
}

impl From<Category> for DirectoryCategory {
    fn from(category: Category) -> DirectoryCategory {
        match category {
            Category::Filaments => DirectoryCategory::Filaments,
            Category::Gcodes => DirectoryCategory::GCodes,
            Category::Macros => DirectoryCategory::Macros,
            Category::System => DirectoryCategory::System,
            Category::Www => DirectoryCategory::Www,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Parse { file, json } => parse_cmd(&file, json),
        Cmd::Info { file, settings } => info_cmd(&file, settings.as_deref()),
        Cmd::Resolve {
            path,
            base,
            category,
        } => resolve_cmd(&path, base, category),
    }
}

// ── Subcommands ─────────────────────────────────────────────────────────

fn parse_cmd(file: &Path, json: bool) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    if json {
        let codes: Vec<_> = split_codes(&content)
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to parse {}", file.display()))?;
        println!("{}", serde_json::to_string_pretty(&codes)?);
    } else {
        for code in split_codes(&content) {
            let code = code.with_context(|| format!("failed to parse {}", file.display()))?;
            println!("{code}");
        }
    }
    Ok(())
}

fn info_cmd(file: &Path, settings_path: Option<&Path>) -> Result<()> {
    let mut settings = match settings_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Settings::load_from_str(&json)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        }
        None => Settings::default(),
    };

    // Treat the file's parent directory as drive 0 so plain filesystem paths
    // work without a configured machine model.
    let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) else {
        bail!("{} has no parent directory", file.display());
    };
    let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
        bail!("{} has no usable file name", file.display());
    };
    settings.base_directory = parent.to_path_buf();

    let parser = FileInfoParser::new(&settings, Arc::new(ModelProvider::default()))
        .context("failed to compile file-info filters")?;
    let info = parser
        .parse(&format!("0:/{name}"), &CancellationToken::new())
        .with_context(|| format!("failed to inspect {}", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn resolve_cmd(path: &str, base: Option<PathBuf>, category: Category) -> Result<()> {
    let mut settings = Settings::default();
    if let Some(base) = base {
        settings.base_directory = base;
    }
    let resolver = PathResolver::new(&settings, Arc::new(ModelProvider::default()));
    let physical = resolver
        .to_physical(path, category.into())
        .with_context(|| format!("failed to resolve {path}"))?;
    println!("{}", physical.display());
    Ok(())
}
