//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Accrue CLI - Extract fields from documents and check rules with an LLM.
#[derive(Debug, Parser)]
#[command(name = "accrue")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.accrue/config.toml)
    #[arg(short, long, global = true, env = "ACCRUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract fields from a list of materials
    Extract(ExtractArgs),

    /// Check a list of rules against some context
    Match(MatchArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// JSON file with `context`, `materials` and `fields`
    #[arg(short, long)]
    pub input: PathBuf,
}

/// Arguments for the match command.
#[derive(Debug, Parser)]
pub struct MatchArgs {
    /// JSON file with `task_instruction`, `context` and `rules`
    #[arg(short, long)]
    pub input: PathBuf,

    /// Check rules in concurrent batches
    #[arg(long)]
    pub parallel: bool,

    /// Rules per batch (default from config)
    #[arg(short, long, requires = "parallel")]
    pub batch_size: Option<usize>,

    /// Batches in flight at once (default from config)
    #[arg(long, requires = "parallel")]
    pub concurrency: Option<usize>,
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}
