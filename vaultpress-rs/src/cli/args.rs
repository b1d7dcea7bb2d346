//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vaultpress")]
#[command(author, version, about = "Publish an Obsidian vault folder into static-site content directories", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./vaultpress.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Source vault directory (overrides config)
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Output as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the destination buckets with the vault
    Sync(SyncArgs),

    /// Only remove destination documents that are drafts or gone from the vault
    Prune(SyncArgs),

    /// Write the exclusion manifest listing draft source files
    Exclude(ExcludeArgs),

    /// Convert flat markdown files in a directory into bundles
    Bundle(BundleArgs),

    /// Copy and rewrite image references in published bundles
    Images(ImagesArgs),

    /// Show how a single document would be classified
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show the plan without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ExcludeArgs {
    /// Manifest path (overrides `exclude_file` in config)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BundleArgs {
    /// Directory holding flat markdown files
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Only process this bucket
    #[arg(long)]
    pub bucket: Option<String>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Markdown file or bundle directory
    pub path: PathBuf,
}
