//! Vector approximations: one grid cell index per dimension.

use std::fmt;

use crate::grid::DimensionGrid;

/// Quantized form of an indexed vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorApproximation<I> {
    id: I,
    cells: Box<[u32]>,
}

impl<I> VectorApproximation<I> {
    pub fn new(id: I, cells: Vec<u32>) -> Self {
        Self {
            id,
            cells: cells.into_boxed_slice(),
        }
    }

    pub fn id(&self) -> &I {
        &self.id
    }

    /// Cell index in `dimension`.
    #[inline]
    pub fn cell(&self, dimension: usize) -> u32 {
        self.cells[dimension]
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn dimensionality(&self) -> usize {
        self.cells.len()
    }
}

impl<I: fmt::Debug> fmt::Display for VectorApproximation<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {:?}", self.id, self.cells)
    }
}

/// Cells of `vector` in `grids`, plus the number of clamped coordinates.
///
/// `grids` must hold one grid per coordinate of `vector`, in order.
pub fn encode(grids: &[DimensionGrid], vector: &[f64]) -> (Vec<u32>, usize) {
    let mut clamped = 0;
    let cells = grids
        .iter()
        .zip(vector)
        .map(|(grid, &value)| {
            let (cell, outside) = grid.locate(value);
            clamped += usize::from(outside);
            cell
        })
        .collect();
    (cells, clamped)
}

/// Like [`encode`], logging a warning when the vector leaves the grid.
///
/// `describe` names the vector in the warning and is only called then.
pub fn encode_logged<F>(grids: &[DimensionGrid], vector: &[f64], describe: F) -> Vec<u32>
where
    F: FnOnce() -> String,
{
    let (cells, clamped) = encode(grids, vector);
    if clamped > 0 {
        log::warn!(
            "{} lies outside the approximation grid in {clamped} dimension(s); clamped to edge cells",
            describe()
        );
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grids() -> Vec<DimensionGrid> {
        vec![
            DimensionGrid::build(0, vec![0.0, 1.0, 2.0, 10.0], 2).unwrap(),
            DimensionGrid::build(1, vec![0.0, 1.0, 2.0, 10.0], 2).unwrap(),
        ]
    }

    #[test]
    fn test_encode_vector() {
        let (cells, clamped) = encode(&grids(), &[1.0, 2.0]);
        assert_eq!(cells, vec![0, 1]);
        assert_eq!(clamped, 0);

        let approx = VectorApproximation::new("b", cells);
        assert_eq!(approx.id(), &"b");
        assert_eq!(approx.cell(1), 1);
        assert_eq!(approx.dimensionality(), 2);
        assert_eq!(approx.to_string(), "\"b\": [0, 1]");
    }

    #[test]
    fn test_encode_clamps_outliers() {
        let (cells, clamped) = encode(&grids(), &[-3.0, 50.0]);
        assert_eq!(cells, vec![0, 1]);
        assert_eq!(clamped, 2);

        let cells = encode_logged(&grids(), &[-3.0, 1.0], || "query".to_string());
        assert_eq!(cells, vec![0, 0]);
    }
}
