//! Vector-approximation file indexes.
//!
//! Two index types share the same grid construction and encoding:
//!
//! - [`VaFile`]: full-space Lp queries with a single filter pass.
//! - [`PartialVaFile`]: queries over arbitrary dimension subsets, with
//!   selectivity-ordered range filtering and a cost-adaptive multi-pass kNN
//!   filter.
//!
//! Both are built once and are read-only afterwards. Queries are obtained
//! from the [`KnnIndex`] / [`RangeIndex`] factories, which return `Ok(None)`
//! when the requested distance function is not an Lp norm the index can
//! bound.

pub mod candidate;
pub mod partial;
pub mod store;
pub mod va_file;

use std::time::Instant;

use crate::collection::{ObjectId, Refiner};
use crate::distance::{DistanceFunction, LpNorm};
use crate::error::{Result, VaFileError};
use crate::metrics::QueryMetrics;
use crate::neighbor::{KnnHeap, Neighbor};

pub use self::partial::PartialVaFile;
pub use self::store::ApproximationFile;
pub use self::va_file::VaFile;

/// A prepared k-nearest-neighbor query.
pub trait KnnQuery<I> {
    /// The `k` nearest objects to `query`, ascending by distance.
    fn knn(&self, query: &[f64], k: usize, metrics: &QueryMetrics) -> Result<Vec<Neighbor<I>>>;
}

/// A prepared range query.
pub trait RangeQuery<I> {
    /// All objects within `epsilon` of `query`, ascending by distance.
    fn range(&self, query: &[f64], epsilon: f64, metrics: &QueryMetrics)
    -> Result<Vec<Neighbor<I>>>;
}

/// Indexes that can serve kNN queries for some distance functions.
pub trait KnnIndex<I> {
    /// Prepare a kNN query, or `Ok(None)` if `distance` is not supported.
    fn knn_query<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<I>,
    ) -> Result<Option<Box<dyn KnnQuery<I> + 'a>>>;
}

/// Indexes that can serve range queries for some distance functions.
pub trait RangeIndex<I> {
    /// Prepare a range query, or `Ok(None)` if `distance` is not supported.
    fn range_query<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<I>,
    ) -> Result<Option<Box<dyn RangeQuery<I> + 'a>>>;
}

/// Run one query, recording it and its wall-clock time in `metrics`.
pub(crate) fn timed<T, F>(metrics: &QueryMetrics, run: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let start = Instant::now();
    metrics.record_query();
    let result = run();
    metrics.record_query_time(start.elapsed());
    result
}

pub(crate) fn check_epsilon(epsilon: f64) -> Result<()> {
    if epsilon.is_nan() || epsilon < 0.0 {
        return Err(VaFileError::invalid_argument(format!(
            "query radius must be a non-negative number, got {epsilon}"
        )));
    }
    Ok(())
}

/// Refine candidates sorted ascending by lower bound into an exact top-k.
///
/// Stops at the first candidate whose lower bound exceeds the current k-th
/// exact distance: no later candidate can enter the result. The bound is
/// rooted before comparing so it rounds the same way refined distances do.
pub(crate) fn refine_sorted<'c, I, T>(
    candidates: T,
    k: usize,
    norm: &LpNorm,
    query: &[f64],
    refiner: &dyn Refiner<I>,
    metrics: &QueryMetrics,
) -> Result<Vec<Neighbor<I>>>
where
    I: ObjectId + 'c,
    T: IntoIterator<Item = (f64, &'c I)>,
{
    let mut result = KnnHeap::new(k);
    for (min_bound, id) in candidates {
        if result.is_full() && norm.root(min_bound) > result.knn_distance() {
            break;
        }
        let distance = refiner.refine(id, query)?;
        metrics.record_refinement();
        result.insert(distance, id.clone());
    }
    Ok(result.into_sorted_vec())
}
