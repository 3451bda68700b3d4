//! Command line argument parsing for the vafile CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// vafile - exact similarity search with vector-approximation files
#[derive(Parser, Debug, Clone)]
#[command(name = "vafile")]
#[command(about = "Exact kNN and range search over vectors with VA-file indexes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct VafileArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl VafileArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Find the k nearest neighbors of a query vector
    Knn(KnnArgs),

    /// Find all vectors within a radius of a query vector
    Range(RangeArgs),
}

/// Options shared by every query command
#[derive(Args, Debug, Clone)]
pub struct QueryOptions {
    /// Vector file, one JSON object per line: {"id": "...", "vector": [...]}
    #[arg(value_name = "DATA_FILE")]
    pub data: PathBuf,

    /// Query vector (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub query: Vec<f64>,

    /// Index type
    #[arg(short, long, default_value = "va")]
    pub index: IndexKind,

    /// Distance function
    #[arg(short, long, default_value = "lp")]
    pub distance: DistanceKind,

    /// Exponent of the Lp norm
    #[arg(short, long, default_value = "2.0")]
    pub p: f64,

    /// Restrict the Lp norm to these dimensions (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub dims: Vec<usize>,

    /// Index configuration file (JSON)
    #[arg(short, long, env = "VAFILE_CONFIG", value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Grid cells per dimension (power of two)
    #[arg(long)]
    pub partitions: Option<usize>,

    /// Simulated page size in bytes
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Build grids from a sample of this many vectors
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Seed for the grid sample
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for kNN queries
#[derive(Parser, Debug, Clone)]
pub struct KnnArgs {
    #[command(flatten)]
    pub options: QueryOptions,

    /// Number of neighbors to return
    #[arg(short, long, default_value = "10")]
    pub k: usize,
}

/// Arguments for range queries
#[derive(Parser, Debug, Clone)]
pub struct RangeArgs {
    #[command(flatten)]
    pub options: QueryOptions,

    /// Query radius
    #[arg(short, long)]
    pub epsilon: f64,
}

/// Index types available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Full-space VA-file
    Va,
    /// Partial (subspace) VA-file
    Partial,
    /// No index, linear scan only
    Scan,
}

/// Distance functions available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceKind {
    /// Lp norm with exponent --p, optionally restricted to --dims
    Lp,
    /// Maximum (L-infinity) norm
    Maximum,
    /// Cosine distance
    Cosine,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
