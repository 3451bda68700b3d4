//! Per-dimension quantile grids.
//!
//! A [`DimensionGrid`] partitions one coordinate axis into `partitions`
//! half-open cells `[b_i, b_{i+1})` holding roughly the same number of
//! indexed values each.

use crate::error::{Result, VaFileError};

/// Absolute lower limit of the pad added above the largest value.
pub const GRID_PAD: f64 = 1e-6;

/// Scale-relative part of the pad added above the largest value.
pub const RELATIVE_GRID_PAD: f64 = 1e-9;

/// Bytes of one serialized boundary.
const BOUNDARY_BYTES: usize = 8;

/// Quantization boundaries of a single dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionGrid {
    dimension: usize,
    boundaries: Vec<f64>,
}

impl DimensionGrid {
    /// Build the grid from every value of the dimension.
    ///
    /// `values` is consumed and sorted in place.
    pub fn build(dimension: usize, mut values: Vec<f64>, partitions: usize) -> Result<Self> {
        check_partitions(partitions)?;
        check_values(dimension, &values)?;
        values.sort_unstable_by(f64::total_cmp);

        let min = values[0];
        let max = values[values.len() - 1];
        Ok(Self::from_sorted(dimension, &values, min, max, partitions))
    }

    /// Build the grid from a sample of the dimension's values.
    ///
    /// The interior quantiles come from `sample`; the outer boundaries come
    /// from the true `min` and `max` of the dimension so that every indexed
    /// value still lies inside the grid.
    pub fn build_sampled(
        dimension: usize,
        mut sample: Vec<f64>,
        min: f64,
        max: f64,
        partitions: usize,
    ) -> Result<Self> {
        check_partitions(partitions)?;
        check_values(dimension, &sample)?;
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(VaFileError::invalid_argument(format!(
                "invalid value range [{min}, {max}] for dimension {dimension}"
            )));
        }
        sample.sort_unstable_by(f64::total_cmp);
        Ok(Self::from_sorted(dimension, &sample, min, max, partitions))
    }

    fn from_sorted(
        dimension: usize,
        sorted: &[f64],
        min: f64,
        max: f64,
        partitions: usize,
    ) -> Self {
        let n = sorted.len();
        let mut boundaries = Vec::with_capacity(partitions + 1);
        for i in 0..partitions {
            let position = i * n / partitions;
            boundaries.push(sorted[position].clamp(min, max));
        }
        boundaries[0] = min;
        boundaries.push(max + upper_pad(max));

        Self {
            dimension,
            boundaries,
        }
    }

    /// Index of the dimension this grid quantizes.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn partitions(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// The `partitions + 1` boundaries, non-decreasing.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Whether `value` falls inside `[b_0, b_last)`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.boundaries[0] && value < self.boundaries[self.boundaries.len() - 1]
    }

    /// Cell holding `value` and whether it had to be clamped into the grid.
    ///
    /// Inside the grid the cell is the last boundary `<= value`, so empty
    /// cells produced by duplicate boundaries are never chosen.
    pub fn locate(&self, value: f64) -> (u32, bool) {
        let last_cell = self.partitions() - 1;
        if value.is_nan() || value < self.boundaries[0] {
            return (0, true);
        }
        if value >= self.boundaries[self.boundaries.len() - 1] {
            return (last_cell as u32, true);
        }
        let position = self.boundaries.partition_point(|&b| b <= value);
        ((position - 1).min(last_cell) as u32, false)
    }

    /// Cell holding `value`, clamped into the grid.
    pub fn cell(&self, value: f64) -> u32 {
        self.locate(value).0
    }

    /// Lower and upper edge of `cell`.
    pub fn cell_bounds(&self, cell: u32) -> (f64, f64) {
        let cell = cell as usize;
        (self.boundaries[cell], self.boundaries[cell + 1])
    }

    /// Estimated bytes to read this grid. Only used as a relative cost.
    pub fn io_cost(&self) -> usize {
        self.boundaries.len() * BOUNDARY_BYTES + 4
    }
}

/// Bytes needed to store the approximation of `dimensions` dimensions.
pub fn approximation_bytes(dimensions: usize, partitions: usize) -> usize {
    let bits = dimensions * partitions.trailing_zeros() as usize;
    bits.div_ceil(8)
}

fn upper_pad(max: f64) -> f64 {
    GRID_PAD.max(max.abs() * RELATIVE_GRID_PAD)
}

fn check_partitions(partitions: usize) -> Result<()> {
    if partitions < 2 || !partitions.is_power_of_two() {
        return Err(VaFileError::invalid_config(format!(
            "number of partitions must be a power of 2 and at least 2, got {partitions}"
        )));
    }
    Ok(())
}

fn check_values(dimension: usize, values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(VaFileError::invalid_argument(format!(
            "cannot build a grid for dimension {dimension} without values"
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(VaFileError::invalid_argument(format!(
            "dimension {dimension} contains non-finite values"
        )));
    }
    Ok(())
}
