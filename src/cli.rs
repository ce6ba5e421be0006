use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "no-more-finals")]
#[command(about = "Strip final modifiers from selected classes in a compiled class tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON filter config (falls back to $NO_MORE_FINALS_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Rewrite INPUT into OUTPUT, stripping finals from matching classes
    Run(RunArgs),
    /// Print the parsed structure of a single class file
    Inspect {
        class_file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Cleared and recreated before processing
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    #[arg(long = "class", value_name = "FQN")]
    pub classes: Vec<String>,

    #[arg(long = "exclude-class", value_name = "FQN")]
    pub excluded_classes: Vec<String>,

    #[arg(long = "package", value_name = "PKG")]
    pub packages: Vec<String>,

    #[arg(long = "exclude-package", value_name = "PKG")]
    pub excluded_packages: Vec<String>,

    #[arg(long)]
    pub include_subpackages: bool,

    /// Process files on a thread pool
    #[arg(long)]
    pub parallel: bool,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
