//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, VafileArgs};
use crate::error::Result;
use crate::metrics::QueryStatistics;
use crate::neighbor::Neighbor;

/// Result structure for kNN and range queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResults {
    /// Index that answered the query, `linear-scan` on fallback.
    pub answered_by: String,
    pub distance: String,
    pub neighbors: Vec<Neighbor<String>>,
    pub build_ms: u64,
    pub query_ms: u64,
    pub statistics: QueryStatistics,
}

/// Output a result in the specified format.
pub fn output_result(message: &str, result: &QueryResults, args: &VafileArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human(message: &str, result: &QueryResults, args: &VafileArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    println!("Results:");
    println!("════════");
    if result.neighbors.is_empty() {
        println!("(none)");
    }
    for (i, neighbor) in result.neighbors.iter().enumerate() {
        println!("{:>4}. {}  {:.6}", i + 1, neighbor.id, neighbor.distance);
    }

    if args.verbosity() > 1 {
        let stats = &result.statistics;
        println!();
        println!("Answered by: {} ({})", result.answered_by, result.distance);
        println!("Build time: {}ms", result.build_ms);
        println!("Query time: {}ms", result.query_ms);
        println!(
            "Refinements: {} ({:.2} per query)",
            stats.refinements,
            stats.refinements_per_query()
        );
        println!("Candidates: {}", stats.candidates);
        println!("Filter passes: {}", stats.filter_passes);
        println!("Scanned bytes: {}", stats.scanned_bytes);
    }
    Ok(())
}

/// Output in JSON format.
fn output_json(result: &QueryResults, args: &VafileArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}
