//! Partial VA-file: vector approximations addressable per dimension, so
//! queries can be restricted to an arbitrary subset of dimensions.
//!
//! Range queries visit the selected dimensions most selective first and
//! drop an object as soon as its running lower bound leaves the radius.
//! kNN queries filter in several passes: a first batch of dimensions is
//! bounded exactly and the rest by their worst case, then dimensions are
//! added one at a time for as long as the remaining candidates are more
//! expensive to refine than the remaining grids are to read.

use std::time::Instant;

use crate::bounds::BoundTable;
use crate::collection::{ObjectId, Refiner, VectorCollection};
use crate::config::VaFileConfig;
use crate::distance::{DistanceFunction, LpNorm};
use crate::error::{Result, VaFileError};
use crate::index::candidate::{Candidate, CandidateArena};
use crate::index::store::ApproximationFile;
use crate::index::{
    KnnIndex, KnnQuery, RangeIndex, RangeQuery, check_epsilon, refine_sorted, timed,
};
use crate::metrics::QueryMetrics;
use crate::neighbor::{BoundedMaxHeap, Neighbor, sort_neighbors};

/// Bytes of one candidate's vector coordinate.
const COORDINATE_BYTES: usize = 8;
/// Bytes of one candidate's record header.
const RECORD_HEADER_BYTES: usize = 4;

/// Estimated cost of refining `candidates` objects of `dimensions` dimensions.
pub fn refine_cost(candidates: usize, dimensions: usize) -> usize {
    candidates * (dimensions * COORDINATE_BYTES + RECORD_HEADER_BYTES)
}

/// Dimensions that get exact bounds in the first kNN filter pass.
pub fn reduced_dimensions(dimensions: usize) -> usize {
    (2 * dimensions / 3).max(1)
}

/// Subspace VA-file answering kNN and range queries under (restricted) Lp
/// norms.
///
/// Created unbuilt; [`PartialVaFile::build`] may be called exactly once.
#[derive(Debug, Clone)]
pub struct PartialVaFile<I> {
    config: VaFileConfig,
    file: Option<ApproximationFile<I>>,
}

impl<I: ObjectId> PartialVaFile<I> {
    /// Create an unbuilt index, validating `config`.
    pub fn new(config: VaFileConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, file: None })
    }

    /// Build the per-dimension grids and approximations of `collection`.
    pub fn build<C>(&mut self, collection: &C) -> Result<()>
    where
        C: VectorCollection<I> + ?Sized,
    {
        if self.file.is_some() {
            return Err(VaFileError::state("pva-file has already been built"));
        }
        let start = Instant::now();
        let file = ApproximationFile::build(&self.config, collection)?;
        log::info!(
            "built pva-file over {} vectors ({} dimensions, {} partitions) in {:?}",
            file.len(),
            file.dimensionality(),
            file.partitions(),
            start.elapsed()
        );
        self.file = Some(file);
        Ok(())
    }

    /// The built approximation file.
    pub fn approximation_file(&self) -> Result<&ApproximationFile<I>> {
        self.file
            .as_ref()
            .ok_or_else(|| VaFileError::state("pva-file has not been built"))
    }

    fn prepare<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<I>,
    ) -> Result<Option<PartialQuery<'a, I>>> {
        let file = self.approximation_file()?;
        let Some(norm) = distance.lp_norm() else {
            log::debug!("pva-file declines {} distance", distance.name());
            return Ok(None);
        };
        let dimensionality = file.dimensionality();
        if let Some(subset) = norm.subspace_dimensions() {
            if subset.dimensionality() != dimensionality {
                return Err(VaFileError::invalid_argument(format!(
                    "subspace is defined over {} dimensions, index has {dimensionality}",
                    subset.dimensionality()
                )));
            }
            if subset.is_empty() {
                return Err(VaFileError::invalid_argument(
                    "subspace selects no dimensions",
                ));
            }
        }
        let dimensions = norm.selected(dimensionality).dimensions().collect();
        Ok(Some(PartialQuery {
            file,
            norm,
            dimensions,
            refiner,
        }))
    }
}

impl<I> PartialVaFile<I> {
    /// Prefix of the statistics this index logs.
    pub const NAME: &'static str = "pva-file";

    pub fn config(&self) -> &VaFileConfig {
        &self.config
    }

    pub fn is_built(&self) -> bool {
        self.file.is_some()
    }

    /// Number of indexed objects, zero while unbuilt.
    pub fn len(&self) -> usize {
        self.file.as_ref().map_or(0, ApproximationFile::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn log_statistics(&self, metrics: &QueryMetrics) {
        metrics.log_statistics(Self::NAME);
    }
}

impl<I: ObjectId> KnnIndex<I> for PartialVaFile<I> {
    fn knn_query<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<I>,
    ) -> Result<Option<Box<dyn KnnQuery<I> + 'a>>> {
        Ok(self
            .prepare(distance, refiner)?
            .map(|query| Box::new(query) as Box<dyn KnnQuery<I> + 'a>))
    }
}

impl<I: ObjectId> RangeIndex<I> for PartialVaFile<I> {
    fn range_query<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<I>,
    ) -> Result<Option<Box<dyn RangeQuery<I> + 'a>>> {
        Ok(self
            .prepare(distance, refiner)?
            .map(|query| Box::new(query) as Box<dyn RangeQuery<I> + 'a>))
    }
}

/// Order `dimensions` by the number of cells the range `[q - ε, q + ε]`
/// touches, fewest first. Ties keep ascending dimension order.
pub fn selectivity_order<I>(
    file: &ApproximationFile<I>,
    dimensions: &[usize],
    query: &[f64],
    epsilon: f64,
) -> Vec<usize> {
    let mut order: Vec<(u32, usize)> = dimensions
        .iter()
        .map(|&d| {
            let grid = file.grid(d);
            let lower = grid.cell(query[d] - epsilon);
            let upper = grid.cell(query[d] + epsilon);
            (upper - lower + 1, d)
        })
        .collect();
    order.sort_unstable();
    order.into_iter().map(|(_, d)| d).collect()
}

/// Order `dimensions` by worst-case contribution, smallest first.
pub fn worst_case_order(table: &BoundTable, dimensions: &[usize]) -> Vec<usize> {
    let mut order = dimensions.to_vec();
    order.sort_by(|&a, &b| {
        table
            .worst_case_contribution(a)
            .total_cmp(&table.worst_case_contribution(b))
            .then_with(|| a.cmp(&b))
    });
    order
}

struct PartialQuery<'a, I> {
    file: &'a ApproximationFile<I>,
    norm: LpNorm,
    dimensions: Vec<usize>,
    refiner: &'a dyn Refiner<I>,
}

impl<I: ObjectId> PartialQuery<'_, I> {
    fn search_range(
        &self,
        query: &[f64],
        epsilon: f64,
        metrics: &QueryMetrics,
    ) -> Result<Vec<Neighbor<I>>> {
        check_epsilon(epsilon)?;
        self.file.check_query(query)?;
        if self.file.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.file.bound_table(&self.norm, query)?;
        let order = selectivity_order(self.file, &self.dimensions, query, epsilon);
        metrics.record_scan();
        metrics.record_filter_pass(self.file.scan_bytes(order.len()));

        let mut candidates = 0;
        let mut result = Vec::new();
        'objects: for approximation in self.file.approximations() {
            let mut min = 0.0;
            let mut max = 0.0;
            for &d in &order {
                let cell = approximation.cell(d);
                min += table.min_contribution(d, cell);
                if self.norm.root(min) > epsilon {
                    continue 'objects;
                }
                max += table.max_contribution(d, cell);
            }

            candidates += 1;
            if self.norm.root(max) <= epsilon {
                metrics.record_proven_result();
            }
            let distance = self.refiner.refine(approximation.id(), query)?;
            metrics.record_refinement();
            if distance <= epsilon {
                result.push(Neighbor::new(approximation.id().clone(), distance));
            }
        }
        metrics.record_candidates(candidates);
        log::debug!(
            "pva-file range over {} dimensions: {candidates} candidates, {} results",
            order.len(),
            result.len()
        );

        sort_neighbors(&mut result);
        Ok(result)
    }

    fn search_knn(
        &self,
        query: &[f64],
        k: usize,
        metrics: &QueryMetrics,
    ) -> Result<Vec<Neighbor<I>>> {
        self.file.check_query(query)?;
        if k == 0 || self.file.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.file.bound_table(&self.norm, query)?;
        let order = worst_case_order(&table, &self.dimensions);
        let dimensions = order.len();
        let approximations = self.file.approximations();
        metrics.record_scan();

        let pending = |scanned: usize| -> f64 {
            order[scanned..]
                .iter()
                .map(|&d| table.worst_case_contribution(d))
                .sum()
        };

        let mut scanned = reduced_dimensions(dimensions);
        let mut heap = BoundedMaxHeap::new(k);
        let mut candidates = CandidateArena::with_capacity(approximations.len());
        let placeholder = pending(scanned);
        for (index, approximation) in approximations.iter().enumerate() {
            let (min, max) =
                table.subspace_bounds(approximation.cells(), order[..scanned].iter().copied());
            candidates.admit(Candidate { index, min, max }, placeholder, &mut heap);
        }
        candidates.prune(&heap);
        metrics.record_filter_pass(self.file.scan_bytes(scanned));

        let grid_cost = self.file.grid(order[0]).io_cost();
        while scanned < dimensions
            && !candidates.is_empty()
            && refine_cost(candidates.len(), dimensions) >= grid_cost * (dimensions - scanned)
        {
            let d = order[scanned];
            scanned += 1;
            candidates.filter_pass(pending(scanned), &mut heap, |candidate| {
                let cell = approximations[candidate.index].cell(d);
                candidate.min += table.min_contribution(d, cell);
                candidate.max += table.max_contribution(d, cell);
            });
            candidates.prune(&heap);
            metrics.record_filter_pass(self.file.scan_bytes(1));
        }

        candidates.sort_by_min();
        metrics.record_candidates(candidates.len());
        log::debug!(
            "pva-file kNN: {} candidates after filtering {scanned} of {dimensions} dimensions",
            candidates.len()
        );

        refine_sorted(
            candidates
                .iter()
                .map(|candidate| (candidate.min, approximations[candidate.index].id())),
            k,
            &self.norm,
            query,
            self.refiner,
            metrics,
        )
    }
}

impl<I: ObjectId> KnnQuery<I> for PartialQuery<'_, I> {
    fn knn(&self, query: &[f64], k: usize, metrics: &QueryMetrics) -> Result<Vec<Neighbor<I>>> {
        timed(metrics, || self.search_knn(query, k, metrics))
    }
}

impl<I: ObjectId> RangeQuery<I> for PartialQuery<'_, I> {
    fn range(
        &self,
        query: &[f64],
        epsilon: f64,
        metrics: &QueryMetrics,
    ) -> Result<Vec<Neighbor<I>>> {
        timed(metrics, || self.search_range(query, epsilon, metrics))
    }
}
