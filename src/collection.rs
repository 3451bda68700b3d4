//! Collaborator interfaces consumed by the indexes, and in-memory
//! implementations of them.
//!
//! The indexes only ever read vectors through [`VectorCollection`] at build
//! time and compute exact distances through a [`Refiner`] at query time.

use std::fmt::Debug;
use std::hash::Hash;

use ahash::AHashMap;

use crate::distance::{DistanceFunction, LpNorm};
use crate::error::{Result, VaFileError};

/// Opaque, comparable object identifier.
pub trait ObjectId: Clone + Eq + Hash + Ord + Debug + Send + Sync {}

impl<T> ObjectId for T where T: Clone + Eq + Hash + Ord + Debug + Send + Sync {}

/// Read-only access to the vectors being indexed.
pub trait VectorCollection<I> {
    /// Number of vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality shared by all vectors.
    fn dimensionality(&self) -> usize;

    /// Vector stored under `id`.
    fn get(&self, id: &I) -> Option<&[f64]>;

    /// All identifiers, in a stable order.
    fn ids(&self) -> Box<dyn Iterator<Item = &I> + '_>;
}

/// Computes the exact distance of a surviving candidate to the query.
pub trait Refiner<I> {
    fn refine(&self, id: &I, query: &[f64]) -> Result<f64>;
}

impl<I, F> Refiner<I> for F
where
    F: Fn(&I, &[f64]) -> Result<f64>,
{
    fn refine(&self, id: &I, query: &[f64]) -> Result<f64> {
        self(id, query)
    }
}

/// Insertion-ordered in-memory vector collection.
#[derive(Debug, Clone)]
pub struct MemoryCollection<I> {
    dimensionality: usize,
    ids: Vec<I>,
    vectors: Vec<Vec<f64>>,
    rows: AHashMap<I, usize>,
}

impl<I: ObjectId> MemoryCollection<I> {
    /// Create an empty collection of `dimensionality`-dimensional vectors.
    pub fn new(dimensionality: usize) -> Self {
        Self {
            dimensionality,
            ids: Vec::new(),
            vectors: Vec::new(),
            rows: AHashMap::new(),
        }
    }

    /// Build a collection from `(id, vector)` pairs.
    pub fn from_vectors<T>(dimensionality: usize, vectors: T) -> Result<Self>
    where
        T: IntoIterator<Item = (I, Vec<f64>)>,
    {
        let mut collection = Self::new(dimensionality);
        for (id, vector) in vectors {
            collection.insert(id, vector)?;
        }
        Ok(collection)
    }

    /// Add a vector.
    pub fn insert(&mut self, id: I, vector: Vec<f64>) -> Result<()> {
        if vector.len() != self.dimensionality {
            return Err(VaFileError::dimension_mismatch(
                self.dimensionality,
                vector.len(),
            ));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VaFileError::invalid_argument(format!(
                "vector {id:?} contains non-finite values"
            )));
        }
        if self.rows.contains_key(&id) {
            return Err(VaFileError::invalid_argument(format!(
                "duplicate object id {id:?}"
            )));
        }

        self.rows.insert(id.clone(), self.ids.len());
        self.ids.push(id);
        self.vectors.push(vector);
        Ok(())
    }

    /// Iterate over `(id, vector)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&I, &[f64])> {
        self.ids
            .iter()
            .zip(self.vectors.iter().map(Vec::as_slice))
    }
}

impl<I: ObjectId> VectorCollection<I> for MemoryCollection<I> {
    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    fn get(&self, id: &I) -> Option<&[f64]> {
        self.rows.get(id).map(|&row| self.vectors[row].as_slice())
    }

    fn ids(&self) -> Box<dyn Iterator<Item = &I> + '_> {
        Box::new(self.ids.iter())
    }
}

/// Exact (restricted) Lp refinement against a collection.
#[derive(Debug, Clone)]
pub struct LpRefiner<'a, C> {
    collection: &'a C,
    norm: LpNorm,
}

impl<'a, C> LpRefiner<'a, C> {
    pub fn new(collection: &'a C, norm: LpNorm) -> Self {
        Self { collection, norm }
    }

    /// Refiner for `distance`, or `None` if it is not an Lp norm.
    pub fn for_distance(collection: &'a C, distance: &DistanceFunction) -> Option<Self> {
        distance
            .lp_norm()
            .map(|norm| Self::new(collection, norm))
    }
}

impl<I, C> Refiner<I> for LpRefiner<'_, C>
where
    I: Debug,
    C: VectorCollection<I>,
{
    fn refine(&self, id: &I, query: &[f64]) -> Result<f64> {
        let vector = self
            .collection
            .get(id)
            .ok_or_else(|| VaFileError::refinement(format!("object {id:?} not found")))?;
        self.norm.distance(vector, query)
    }
}
