//! # vafile
//!
//! Vector-approximation file (VA-file) indexes for exact Lp similarity
//! search.
//!
//! ## Features
//!
//! - Quantile grids per dimension, built in parallel
//! - Full-space kNN and range queries ([`index::VaFile`])
//! - Subspace queries with selectivity-ordered and cost-adaptive filtering
//!   ([`index::PartialVaFile`])
//! - Capability negotiation: indexes decline distances they cannot bound
//! - Explicit, thread-safe query statistics

pub mod approximation;
pub mod bounds;
pub mod cli;
pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod grid;
pub mod index;
pub mod metrics;
pub mod neighbor;
pub mod scan;

pub mod prelude {
    pub use crate::collection::{LpRefiner, MemoryCollection, ObjectId, Refiner, VectorCollection};
    pub use crate::config::VaFileConfig;
    pub use crate::distance::{DimensionSubset, DistanceFunction, LpNorm};
    pub use crate::error::{Result, VaFileError};
    pub use crate::index::{KnnIndex, KnnQuery, PartialVaFile, RangeIndex, RangeQuery, VaFile};
    pub use crate::metrics::{QueryMetrics, QueryStatistics};
    pub use crate::neighbor::Neighbor;
    pub use crate::scan::LinearScan;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
