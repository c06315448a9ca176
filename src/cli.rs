use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "statutes",
    version,
    about = "Structuring pipeline for statute and constitution texts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Segment source texts into structured documents.
    Parse(ParseArgs),
    /// Re-normalize the text fields of stored documents.
    Normalize(NormalizeArgs),
    /// Re-extract cross-references from stored documents.
    References(ReferencesArgs),
    /// Build the reference catalog and reverse index.
    Catalog(CatalogArgs),
    /// Compare parsed order against the canonical arrangement list.
    Arrangement(ArrangementArgs),
    /// Align primary sections with a secondary-language text.
    Align(AlignArgs),
    Status(StatusArgs),
}

/// Options shared by every batch command.
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// JSON array of act definitions replacing the built-in registry.
    #[arg(long)]
    pub acts_config: Option<PathBuf>,

    /// Case-insensitive substring matched against act ids and file names.
    #[arg(long)]
    pub act: Option<String>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ReferencesArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ArrangementArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Canonical arrangement list; overrides the registry entry.
    #[arg(long)]
    pub canonical: Option<PathBuf>,

    /// Structured document to check; overrides the registry target.
    #[arg(long)]
    pub structured: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AlignArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Key secondary spans 1, 2, 3, ... instead of by detected numerals.
    #[arg(long, default_value_t = false)]
    pub sequential_keys: bool,

    #[arg(long)]
    pub max_section: Option<u32>,

    /// Repair OCR-damaged section numerals before splitting.
    #[arg(long, default_value_t = false)]
    pub normalize_numerals: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    #[arg(long)]
    pub acts_config: Option<PathBuf>,
}
