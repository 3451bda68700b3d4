//! Brute-force queries over a collection.
//!
//! Serves any [`DistanceFunction`], so it is what callers fall back to when
//! an index declines a distance.

use std::marker::PhantomData;

use crate::collection::{ObjectId, VectorCollection};
use crate::distance::DistanceFunction;
use crate::error::{Result, VaFileError};
use crate::index::{KnnQuery, RangeQuery, check_epsilon, timed};
use crate::metrics::QueryMetrics;
use crate::neighbor::{KnnHeap, Neighbor, sort_neighbors};

/// Linear scan over every vector of a collection.
pub struct LinearScan<'a, I, C: ?Sized> {
    collection: &'a C,
    distance: DistanceFunction,
    _id: PhantomData<fn() -> I>,
}

impl<'a, I, C> LinearScan<'a, I, C>
where
    I: ObjectId,
    C: VectorCollection<I> + ?Sized,
{
    pub fn new(collection: &'a C, distance: DistanceFunction) -> Self {
        Self {
            collection,
            distance,
            _id: PhantomData,
        }
    }

    pub fn distance_function(&self) -> &DistanceFunction {
        &self.distance
    }

    fn check_query(&self, query: &[f64]) -> Result<()> {
        let dimensionality = self.collection.dimensionality();
        if query.len() != dimensionality {
            return Err(VaFileError::dimension_mismatch(dimensionality, query.len()));
        }
        Ok(())
    }

    fn for_each<F>(&self, query: &[f64], metrics: &QueryMetrics, mut visit: F) -> Result<()>
    where
        F: FnMut(&I, f64),
    {
        metrics.record_scan();
        for id in self.collection.ids() {
            let vector = self.collection.get(id).ok_or_else(|| {
                VaFileError::invalid_argument(format!("no vector stored for object {id:?}"))
            })?;
            let distance = self.distance.distance(vector, query)?;
            metrics.record_refinement();
            visit(id, distance);
        }
        Ok(())
    }
}

impl<I, C> KnnQuery<I> for LinearScan<'_, I, C>
where
    I: ObjectId,
    C: VectorCollection<I> + ?Sized,
{
    fn knn(&self, query: &[f64], k: usize, metrics: &QueryMetrics) -> Result<Vec<Neighbor<I>>> {
        timed(metrics, || {
            self.check_query(query)?;
            let mut result = KnnHeap::new(k);
            if k > 0 {
                self.for_each(query, metrics, |id, distance| {
                    result.insert(distance, id.clone())
                })?;
            }
            Ok(result.into_sorted_vec())
        })
    }
}

impl<I, C> RangeQuery<I> for LinearScan<'_, I, C>
where
    I: ObjectId,
    C: VectorCollection<I> + ?Sized,
{
    fn range(
        &self,
        query: &[f64],
        epsilon: f64,
        metrics: &QueryMetrics,
    ) -> Result<Vec<Neighbor<I>>> {
        timed(metrics, || {
            check_epsilon(epsilon)?;
            self.check_query(query)?;
            let mut result = Vec::new();
            self.for_each(query, metrics, |id, distance| {
                if distance <= epsilon {
                    result.push(Neighbor::new(id.clone(), distance));
                }
            })?;
            sort_neighbors(&mut result);
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::MemoryCollection;

    fn collection() -> MemoryCollection<&'static str> {
        MemoryCollection::from_vectors(
            2,
            vec![
                ("origin", vec![0.0, 0.0]),
                ("east", vec![1.0, 0.0]),
                ("north", vec![0.0, 2.0]),
                ("far", vec![5.0, 5.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_knn() {
        let collection = collection();
        let scan = LinearScan::new(&collection, DistanceFunction::Euclidean);
        let metrics = QueryMetrics::new();

        let result = scan.knn(&[0.0, 0.0], 2, &metrics).unwrap();
        assert_eq!(
            result,
            vec![Neighbor::new("origin", 0.0), Neighbor::new("east", 1.0)]
        );
        assert_eq!(metrics.snapshot().refinements, 4);
        assert!(scan.knn(&[0.0, 0.0], 0, &metrics).unwrap().is_empty());
    }

    #[test]
    fn test_range_with_non_lp_distance() {
        let collection = collection();
        let scan = LinearScan::new(&collection, DistanceFunction::Maximum);
        let metrics = QueryMetrics::new();

        let result = scan.range(&[0.0, 0.0], 2.0, &metrics).unwrap();
        let ids: Vec<_> = result.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["origin", "east", "north"]);
        assert_eq!(scan.distance_function(), &DistanceFunction::Maximum);
    }

    #[test]
    fn test_query_validation() {
        let collection = collection();
        let scan = LinearScan::new(&collection, DistanceFunction::Manhattan);
        let metrics = QueryMetrics::new();

        assert!(matches!(
            scan.knn(&[0.0], 1, &metrics),
            Err(VaFileError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            scan.range(&[0.0, 0.0], f64::NAN, &metrics),
            Err(VaFileError::InvalidArgument(_))
        ));
    }
}
