//! mmd CLI tool
//!
//! Command-line interface for checking and normalizing mind map documents with mmd-core.
//!
//! ## Commands
//!
//! - `check <file>`: Parse a document and report its statistics and dangling file links
//! - `fmt <file>`: Re-serialize a document in canonical form
//!
//! By default `fmt` prints to stdout. Use `--write` to replace the file in place.

use clap::{Parser, Subcommand};
use mmd_core::{
    config::{ConfigProvider, MindMapConfig, TomlConfigProvider},
    ExtraType, MindMap, MindMapError,
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "mmd")]
#[command(author, version, about = "A tool for checking and formatting mind map documents", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and report statistics and file links whose target is missing
    Check {
        /// Path to the document
        path: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-serialize a document
    Fmt {
        /// Path to the document
        path: PathBuf,

        /// Write the result back to the file instead of printing it
        #[arg(short, long)]
        write: bool,
    },
}

#[derive(Debug, Serialize)]
struct CheckReport {
    file: PathBuf,
    topics: usize,
    max_depth: usize,
    extras: BTreeMap<ExtraType, usize>,
    missing_files: Vec<String>,
}

fn load_config(path: Option<PathBuf>) -> Result<MindMapConfig, MindMapError> {
    match path {
        Some(path) => TomlConfigProvider::new(path).load(),
        None => Ok(MindMapConfig::default()),
    }
}

fn check(path: &Path, config: &MindMapConfig) -> Result<CheckReport, MindMapError> {
    let map = MindMap::load(path)?;
    let base_folder = config
        .base_folder
        .clone()
        .or_else(|| path.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let mut report = CheckReport {
        file: path.to_path_buf(),
        topics: 0,
        max_depth: 0,
        extras: BTreeMap::new(),
        missing_files: Vec::new(),
    };
    for topic in map.topics() {
        report.topics += 1;
        report.max_depth = report.max_depth.max(topic.topic_level());
        for (ty, extra) in topic.extras() {
            *report.extras.entry(ty).or_default() += 1;
            let missing = extra
                .as_file()
                .and_then(|uri| uri.as_file(&base_folder))
                .is_some_and(|file| !file.exists());
            if missing {
                report.missing_files.push(extra.as_text().to_string());
            }
        }
    }
    Ok(report)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Check { path, json } => {
            let report = check(&path, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.file.display());
                println!("  topics:    {}", report.topics);
                println!("  max depth: {}", report.max_depth);
                for (ty, count) in report.extras.iter() {
                    println!("  {:<9}  {count}", ty.as_str());
                }
                for missing in report.missing_files.iter() {
                    println!("  missing file: {missing}");
                }
            }
            if !report.missing_files.is_empty() {
                std::process::exit(1);
            }
        }
        Commands::Fmt { path, write } => {
            let map = MindMap::load(&path)?;
            let text = map.write_with(&config);
            if write {
                std::fs::write(&path, text)?;
                tracing::info!("Formatted {:?}", path);
            } else {
                print!("{text}");
            }
        }
    }

    Ok(())
}
