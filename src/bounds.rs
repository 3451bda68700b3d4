//! Lp bound tables for a fixed query.
//!
//! For every dimension `d` and boundary `i` the table stores
//! `|q_d - b_{d,i}|^p`. The minimum and maximum contribution of a cell are
//! read off the two edges of the cell relative to the query's own cell, so
//! for any point `x` in cell `c` of dimension `d`:
//!
//! `min_contribution(d, c) <= |x_d - q_d|^p <= max_contribution(d, c)`.
//!
//! Sums over any set of dimensions therefore bound the powered (restricted)
//! Lp distance from below and above.

use crate::distance::LpNorm;
use crate::grid::DimensionGrid;

/// Query-scoped lookup table of per-(dimension, cell) distance bounds.
#[derive(Debug, Clone)]
pub struct BoundTable {
    stride: usize,
    lookup: Vec<f64>,
    query_cells: Vec<u32>,
}

impl BoundTable {
    /// Build the table for `query`, whose cells in `grids` are `query_cells`.
    pub fn new(norm: &LpNorm, grids: &[DimensionGrid], query: &[f64], query_cells: Vec<u32>) -> Self {
        let stride = grids.first().map_or(0, |grid| grid.boundaries().len());
        let mut lookup = Vec::with_capacity(stride * grids.len());
        for (grid, &q) in grids.iter().zip(query) {
            lookup.extend(grid.boundaries().iter().map(|&b| norm.power(q - b)));
        }
        Self {
            stride,
            lookup,
            query_cells,
        }
    }

    #[inline]
    fn edge(&self, dimension: usize, boundary: usize) -> f64 {
        self.lookup[dimension * self.stride + boundary]
    }

    /// Cell of the query in `dimension`.
    pub fn query_cell(&self, dimension: usize) -> u32 {
        self.query_cells[dimension]
    }

    /// Lower bound of the powered contribution of a point in `cell`.
    #[inline]
    pub fn min_contribution(&self, dimension: usize, cell: u32) -> f64 {
        let query_cell = self.query_cells[dimension];
        let cell_index = cell as usize;
        if cell < query_cell {
            self.edge(dimension, cell_index + 1)
        } else if cell > query_cell {
            self.edge(dimension, cell_index)
        } else {
            0.0
        }
    }

    /// Upper bound of the powered contribution of a point in `cell`.
    #[inline]
    pub fn max_contribution(&self, dimension: usize, cell: u32) -> f64 {
        let query_cell = self.query_cells[dimension];
        let cell_index = cell as usize;
        if cell < query_cell {
            self.edge(dimension, cell_index)
        } else if cell > query_cell {
            self.edge(dimension, cell_index + 1)
        } else {
            self.edge(dimension, cell_index)
                .max(self.edge(dimension, cell_index + 1))
        }
    }

    /// Largest contribution any indexed point can have in `dimension`.
    pub fn worst_case_contribution(&self, dimension: usize) -> f64 {
        let first = self.edge(dimension, 0);
        let last = self.edge(dimension, self.stride - 1);
        first.max(last)
    }

    /// Powered lower bound over all dimensions.
    pub fn min_bound(&self, cells: &[u32]) -> f64 {
        cells
            .iter()
            .enumerate()
            .map(|(d, &cell)| self.min_contribution(d, cell))
            .sum()
    }

    /// Powered lower and upper bound over all dimensions.
    pub fn bounds(&self, cells: &[u32]) -> (f64, f64) {
        cells
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(min, max), (d, &cell)| {
                (
                    min + self.min_contribution(d, cell),
                    max + self.max_contribution(d, cell),
                )
            })
    }

    /// Powered lower and upper bound over `dimensions` only.
    pub fn subspace_bounds(
        &self,
        cells: &[u32],
        dimensions: impl IntoIterator<Item = usize>,
    ) -> (f64, f64) {
        dimensions.into_iter().fold((0.0, 0.0), |(min, max), d| {
            (
                min + self.min_contribution(d, cells[d]),
                max + self.max_contribution(d, cells[d]),
            )
        })
    }
}
