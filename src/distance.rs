//! Distance functions and the Lp capability descriptor.
//!
//! Callers describe the distance they want with a [`DistanceFunction`]. The
//! indexes never branch on the concrete variant: they ask for its
//! [`LpNorm`] descriptor once, when a query object is requested, and decline
//! the query when there is none.

use bit_vec::BitVec;

use crate::error::{Result, VaFileError};

/// A set of selected dimensions for subspace queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimensionSubset {
    bits: BitVec,
}

impl DimensionSubset {
    /// Select every dimension.
    pub fn all(dimensionality: usize) -> Self {
        Self {
            bits: BitVec::from_elem(dimensionality, true),
        }
    }

    /// Select the given dimensions out of `dimensionality`.
    pub fn from_dimensions(dimensionality: usize, dimensions: &[usize]) -> Result<Self> {
        let mut bits = BitVec::from_elem(dimensionality, false);
        for &d in dimensions {
            if d >= dimensionality {
                return Err(VaFileError::invalid_argument(format!(
                    "dimension {d} out of range for dimensionality {dimensionality}"
                )));
            }
            bits.set(d, true);
        }
        Ok(Self { bits })
    }

    /// Total number of dimensions the subset is defined over.
    pub fn dimensionality(&self) -> usize {
        self.bits.len()
    }

    /// Whether dimension `d` is selected.
    pub fn contains(&self, d: usize) -> bool {
        self.bits.get(d).unwrap_or(false)
    }

    /// Number of selected dimensions.
    pub fn cardinality(&self) -> usize {
        self.bits.iter().filter(|selected| *selected).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    /// Whether every dimension is selected.
    pub fn is_full(&self) -> bool {
        self.bits.iter().all(|selected| selected)
    }

    /// Selected dimensions in ascending order.
    pub fn dimensions(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(d, selected)| selected.then_some(d))
    }
}

/// Capability descriptor of an Lp norm, optionally restricted to a subspace.
///
/// Distances are aggregated as sums of powered per-dimension differences;
/// [`LpNorm::root`] turns such a sum into a distance and [`LpNorm::power`]
/// goes the other way.
#[derive(Debug, Clone, PartialEq)]
pub struct LpNorm {
    p: f64,
    subspace: Option<DimensionSubset>,
}

impl LpNorm {
    /// Full-space Lp norm. Returns `None` unless `p` is finite and positive.
    pub fn new(p: f64) -> Option<Self> {
        (p.is_finite() && p > 0.0).then_some(Self { p, subspace: None })
    }

    /// Lp norm restricted to `subspace`.
    pub fn subspace(p: f64, subspace: DimensionSubset) -> Option<Self> {
        Self::new(p).map(|norm| Self {
            subspace: Some(subspace),
            ..norm
        })
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn subspace_dimensions(&self) -> Option<&DimensionSubset> {
        self.subspace.as_ref()
    }

    /// Whether this norm covers all `dimensionality` dimensions.
    pub fn is_full_space(&self, dimensionality: usize) -> bool {
        match &self.subspace {
            None => true,
            Some(subset) => subset.dimensionality() == dimensionality && subset.is_full(),
        }
    }

    /// The effective subset of dimensions for vectors of `dimensionality`.
    pub fn selected(&self, dimensionality: usize) -> DimensionSubset {
        self.subspace
            .clone()
            .unwrap_or_else(|| DimensionSubset::all(dimensionality))
    }

    /// `|diff|^p`.
    #[inline]
    pub fn power(&self, diff: f64) -> f64 {
        let diff = diff.abs();
        if self.p == 1.0 {
            diff
        } else if self.p == 2.0 {
            diff * diff
        } else {
            diff.powf(self.p)
        }
    }

    /// Inverse of [`LpNorm::power`] for aggregated sums.
    #[inline]
    pub fn root(&self, powered: f64) -> f64 {
        if self.p == 1.0 {
            powered
        } else if self.p == 2.0 {
            powered.sqrt()
        } else {
            powered.powf(1.0 / self.p)
        }
    }

    /// Sum of powered differences over the selected dimensions.
    pub fn powered_distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_dimensions(a, b)?;
        let sum = match &self.subspace {
            None => a.iter().zip(b).map(|(x, y)| self.power(x - y)).sum(),
            Some(subset) => subset
                .dimensions()
                .filter(|&d| d < a.len())
                .map(|d| self.power(a[d] - b[d]))
                .sum(),
        };
        Ok(sum)
    }

    /// Exact (restricted) Lp distance.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        Ok(self.root(self.powered_distance(a, b)?))
    }
}

/// Distance functions a caller may ask an index to serve.
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceFunction {
    /// L2 norm.
    Euclidean,
    /// L1 norm.
    Manhattan,
    /// General Lp norm.
    Minkowski(f64),
    /// Lp norm restricted to a subset of dimensions.
    SubspaceMinkowski { p: f64, dimensions: DimensionSubset },
    /// L-infinity norm. Not a power sum, so the indexes decline it.
    Maximum,
    /// Cosine distance (1 - cosine similarity).
    Cosine,
}

impl DistanceFunction {
    /// The Lp descriptor of this distance, if it has one.
    pub fn lp_norm(&self) -> Option<LpNorm> {
        match self {
            DistanceFunction::Euclidean => LpNorm::new(2.0),
            DistanceFunction::Manhattan => LpNorm::new(1.0),
            DistanceFunction::Minkowski(p) => LpNorm::new(*p),
            DistanceFunction::SubspaceMinkowski { p, dimensions } => {
                LpNorm::subspace(*p, dimensions.clone())
            }
            DistanceFunction::Maximum | DistanceFunction::Cosine => None,
        }
    }

    /// Exact distance between two vectors.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_dimensions(a, b)?;
        match self {
            DistanceFunction::Maximum => Ok(a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs())
                .fold(0.0, f64::max)),
            DistanceFunction::Cosine => {
                let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    Ok(1.0)
                } else {
                    Ok(1.0 - dot / (norm_a * norm_b))
                }
            }
            other => match other.lp_norm() {
                Some(norm) => norm.distance(a, b),
                None => Err(VaFileError::invalid_argument(format!(
                    "{} is not a valid distance function",
                    other.name()
                ))),
            },
        }
    }

    /// Get the name of this distance function.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceFunction::Euclidean => "euclidean",
            DistanceFunction::Manhattan => "manhattan",
            DistanceFunction::Minkowski(_) => "minkowski",
            DistanceFunction::SubspaceMinkowski { .. } => "subspace_minkowski",
            DistanceFunction::Maximum => "maximum",
            DistanceFunction::Cosine => "cosine",
        }
    }
}

fn check_dimensions(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(VaFileError::dimension_mismatch(a.len(), b.len()));
    }
    Ok(())
}
