//! The built state shared by both index types: one grid per dimension and
//! one approximation per object.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::approximation::{VectorApproximation, encode_logged};
use crate::bounds::BoundTable;
use crate::collection::{ObjectId, VectorCollection};
use crate::config::VaFileConfig;
use crate::distance::LpNorm;
use crate::error::{Result, VaFileError};
use crate::grid::{DimensionGrid, approximation_bytes};

/// Grids and approximations of a fully built index. Immutable.
#[derive(Debug, Clone)]
pub struct ApproximationFile<I> {
    dimensionality: usize,
    partitions: usize,
    grids: Vec<DimensionGrid>,
    approximations: Vec<VectorApproximation<I>>,
}

impl<I: ObjectId> ApproximationFile<I> {
    /// Build grids over `collection` and encode every object.
    pub fn build<C>(config: &VaFileConfig, collection: &C) -> Result<Self>
    where
        C: VectorCollection<I> + ?Sized,
    {
        config.validate()?;
        let dimensionality = collection.dimensionality();
        if dimensionality == 0 {
            return Err(VaFileError::invalid_argument(
                "cannot index zero-dimensional vectors",
            ));
        }

        let mut ids = Vec::with_capacity(collection.len());
        let mut rows = Vec::with_capacity(collection.len());
        for id in collection.ids() {
            let vector = collection.get(id).ok_or_else(|| {
                VaFileError::invalid_argument(format!("no vector stored for object {id:?}"))
            })?;
            if vector.len() != dimensionality {
                return Err(VaFileError::dimension_mismatch(dimensionality, vector.len()));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(VaFileError::invalid_argument(format!(
                    "object {id:?} contains non-finite values"
                )));
            }
            ids.push(id.clone());
            rows.push(vector);
        }

        let grids = if rows.is_empty() {
            Vec::new()
        } else {
            build_grids(config, &rows, dimensionality)?
        };

        let approximations = ids
            .into_iter()
            .zip(&rows)
            .map(|(id, vector)| {
                let cells = encode_logged(&grids, vector, || format!("object {id:?}"));
                VectorApproximation::new(id, cells)
            })
            .collect();

        Ok(Self {
            dimensionality,
            partitions: config.partitions,
            grids,
            approximations,
        })
    }

    /// Encode `query` and build its bound table for `norm`.
    pub fn bound_table(&self, norm: &LpNorm, query: &[f64]) -> Result<BoundTable> {
        self.check_query(query)?;
        let cells = encode_logged(&self.grids, query, || "query vector".to_string());
        Ok(BoundTable::new(norm, &self.grids, query, cells))
    }

    /// Check that `query` can be answered by this file.
    pub fn check_query(&self, query: &[f64]) -> Result<()> {
        if query.len() != self.dimensionality {
            return Err(VaFileError::dimension_mismatch(
                self.dimensionality,
                query.len(),
            ));
        }
        if query.iter().any(|v| v.is_nan()) {
            return Err(VaFileError::invalid_argument("query vector contains NaN"));
        }
        Ok(())
    }
}

impl<I> ApproximationFile<I> {
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.approximations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approximations.is_empty()
    }

    /// Per-dimension grids. Empty when the collection was empty.
    pub fn grids(&self) -> &[DimensionGrid] {
        &self.grids
    }

    pub fn grid(&self, dimension: usize) -> &DimensionGrid {
        &self.grids[dimension]
    }

    pub fn approximations(&self) -> &[VectorApproximation<I>] {
        &self.approximations
    }

    /// Bytes of one object's approximation restricted to `dimensions`.
    pub fn record_bytes(&self, dimensions: usize) -> usize {
        approximation_bytes(dimensions, self.partitions)
    }

    /// Estimated bytes read by scanning `dimensions` of every approximation.
    pub fn scan_bytes(&self, dimensions: usize) -> u64 {
        (self.len() * self.record_bytes(dimensions)) as u64
    }
}

fn build_grids(
    config: &VaFileConfig,
    rows: &[&[f64]],
    dimensionality: usize,
) -> Result<Vec<DimensionGrid>> {
    let partitions = config.partitions;
    let sample = match config.sample_size {
        Some(size) if size < rows.len() => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let mut positions = rand::seq::index::sample(&mut rng, rows.len(), size).into_vec();
            positions.sort_unstable();
            log::debug!(
                "building grids from a sample of {size} out of {} vectors",
                rows.len()
            );
            Some(positions)
        }
        _ => None,
    };

    (0..dimensionality)
        .into_par_iter()
        .map(|d| match &sample {
            None => DimensionGrid::build(d, rows.iter().map(|row| row[d]).collect(), partitions),
            Some(positions) => {
                let (min, max) = rows
                    .iter()
                    .map(|row| row[d])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                let values = positions.iter().map(|&i| rows[i][d]).collect();
                DimensionGrid::build_sampled(d, values, min, max, partitions)
            }
        })
        .collect()
}
