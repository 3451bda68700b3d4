//! Full-space vector-approximation file.

use std::time::Instant;

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

/// VA-file answering kNN and range queries under full-space Lp norms.
///
/// Created unbuilt; [`VaFile::build`] may be called exactly once.
#[derive(Debug, Clone)]
pub struct VaFile<I> {
    config: VaFileConfig,
    file: Option<ApproximationFile<I>>,
}

impl<I: ObjectId> VaFile<I> {
    /// Create an unbuilt index, validating `config`.
    pub fn new(config: VaFileConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, file: None })
    }

    /// Build the grids and approximations of `collection`.
    pub fn build<C>(&mut self, collection: &C) -> Result<()>
    where
        C: VectorCollection<I> + ?Sized,
    {
        if self.file.is_some() {
            return Err(VaFileError::state("va-file has already been built"));
        }
        let start = Instant::now();
        let file = ApproximationFile::build(&self.config, collection)?;
        log::info!(
            "built va-file over {} vectors ({} dimensions, {} partitions) in {:?}",
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
            .ok_or_else(|| VaFileError::state("va-file has not been built"))
    }
}

impl<I> VaFile<I> {
    /// Prefix of the statistics this index logs.
    pub const NAME: &'static str = "va-file";

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

    /// Simulated pages read by the scans recorded in `metrics`.
    pub fn scanned_pages(&self, metrics: &QueryMetrics) -> u64 {
        let Some(file) = &self.file else {
            return 0;
        };
        let record_bytes = file.record_bytes(file.dimensionality()).max(1);
        let records_per_page = (self.config.page_size / record_bytes).max(1);
        let pages = file.len().div_ceil(records_per_page) as u64;
        pages * metrics.scans()
    }

    /// Log the counters in `metrics` together with the scanned pages.
    pub fn log_statistics(&self, metrics: &QueryMetrics) {
        metrics.log_statistics(Self::NAME);
        log::info!("{}.scannedPages: {}", Self::NAME, self.scanned_pages(metrics));
    }
}

impl<I: ObjectId> KnnIndex<I> for VaFile<I> {
    fn knn_query<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<I>,
    ) -> Result<Option<Box<dyn KnnQuery<I> + 'a>>> {
        let file = self.approximation_file()?;
        Ok(full_space_norm(file, distance).map(|norm| {
            Box::new(VaFileQuery {
                file,
                norm,
                refiner,
            }) as Box<dyn KnnQuery<I> + 'a>
        }))
    }
}

impl<I: ObjectId> RangeIndex<I> for VaFile<I> {
    fn range_query<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<I>,
    ) -> Result<Option<Box<dyn RangeQuery<I> + 'a>>> {
        let file = self.approximation_file()?;
        Ok(full_space_norm(file, distance).map(|norm| {
            Box::new(VaFileQuery {
                file,
                norm,
                refiner,
            }) as Box<dyn RangeQuery<I> + 'a>
        }))
    }
}

fn full_space_norm<I>(file: &ApproximationFile<I>, distance: &DistanceFunction) -> Option<LpNorm> {
    match distance.lp_norm() {
        Some(norm) if norm.is_full_space(file.dimensionality()) => Some(norm),
        _ => {
            log::debug!("va-file declines {} distance", distance.name());
            None
        }
    }
}

/// A query bound to one Lp norm and refiner.
struct VaFileQuery<'a, I> {
    file: &'a ApproximationFile<I>,
    norm: LpNorm,
    refiner: &'a dyn Refiner<I>,
}

impl<I: ObjectId> VaFileQuery<'_, I> {
    fn scan(&self, metrics: &QueryMetrics) {
        metrics.record_scan();
        metrics.record_filter_pass(self.file.scan_bytes(self.file.dimensionality()));
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
        self.scan(metrics);

        let mut heap = BoundedMaxHeap::new(k);
        let mut candidates = CandidateArena::with_capacity(k);
        for (index, approximation) in self.file.approximations().iter().enumerate() {
            let (min, max) = table.bounds(approximation.cells());
            candidates.admit(Candidate { index, min, max }, 0.0, &mut heap);
        }
        candidates.prune(&heap);
        candidates.sort_by_min();
        metrics.record_candidates(candidates.len());
        log::debug!(
            "va-file kNN: {} of {} approximations survived filtering",
            candidates.len(),
            self.file.len()
        );

        let approximations = self.file.approximations();
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
        self.scan(metrics);

        let mut candidates = 0;
        let mut result = Vec::new();
        for approximation in self.file.approximations() {
            if self.norm.root(table.min_bound(approximation.cells())) > epsilon {
                continue;
            }
            candidates += 1;
            let distance = self.refiner.refine(approximation.id(), query)?;
            metrics.record_refinement();
            if distance <= epsilon {
                result.push(Neighbor::new(approximation.id().clone(), distance));
            }
        }
        metrics.record_candidates(candidates);
        log::debug!(
            "va-file range: {candidates} candidates, {} results",
            result.len()
        );

        sort_neighbors(&mut result);
        Ok(result)
    }
}

impl<I: ObjectId> KnnQuery<I> for VaFileQuery<'_, I> {
    fn knn(&self, query: &[f64], k: usize, metrics: &QueryMetrics) -> Result<Vec<Neighbor<I>>> {
        timed(metrics, || self.search_knn(query, k, metrics))
    }
}

impl<I: ObjectId> RangeQuery<I> for VaFileQuery<'_, I> {
    fn range(
        &self,
        query: &[f64],
        epsilon: f64,
        metrics: &QueryMetrics,
    ) -> Result<Vec<Neighbor<I>>> {
        timed(metrics, || self.search_range(query, epsilon, metrics))
    }
}
