use std::thread;

use vafile::prelude::*;

fn diagonal() -> Result<MemoryCollection<&'static str>> {
    MemoryCollection::from_vectors(
        2,
        vec![
            ("a", vec![0.0, 0.0]),
            ("b", vec![1.0, 1.0]),
            ("c", vec![2.0, 2.0]),
            ("d", vec![10.0, 10.0]),
        ],
    )
}

fn wave(n: usize, dimensionality: usize) -> Result<MemoryCollection<usize>> {
    MemoryCollection::from_vectors(
        dimensionality,
        (0..n).map(|i| {
            let vector = (0..dimensionality)
                .map(|d| ((i * (d + 3)) as f64 * 0.37).sin() * 10.0 + d as f64)
                .collect();
            (i, vector)
        }),
    )
}

fn build_va_file<I: ObjectId>(
    collection: &MemoryCollection<I>,
    config: VaFileConfig,
) -> Result<VaFile<I>> {
    let mut index = VaFile::new(config)?;
    index.build(collection)?;
    Ok(index)
}

fn ids<I: Clone>(neighbors: &[Neighbor<I>]) -> Vec<I> {
    neighbors.iter().map(|n| n.id.clone()).collect()
}

#[test]
fn va_file_knn_on_diagonal_points() -> Result<()> {
    let collection = diagonal()?;
    let index = build_va_file(&collection, VaFileConfig::new(1024, 2))?;
    let refiner = LpRefiner::new(&collection, LpNorm::new(2.0).unwrap());
    let metrics = QueryMetrics::new();

    let query = index
        .knn_query(&DistanceFunction::Euclidean, &refiner)?
        .expect("euclidean is supported");
    let result = query.knn(&[0.0, 0.0], 2, &metrics)?;

    assert_eq!(
        result,
        vec![Neighbor::new("a", 0.0), Neighbor::new("b", 2f64.sqrt())]
    );
    Ok(())
}

#[test]
fn va_file_range_on_diagonal_points() -> Result<()> {
    let collection = diagonal()?;
    let index = build_va_file(&collection, VaFileConfig::new(1024, 2))?;
    let refiner = LpRefiner::new(&collection, LpNorm::new(2.0).unwrap());
    let metrics = QueryMetrics::new();

    let query = index
        .range_query(&DistanceFunction::Euclidean, &refiner)?
        .expect("euclidean is supported");
    let result = query.range(&[0.0, 0.0], 1.5, &metrics)?;

    assert_eq!(ids(&result), vec!["a", "b"]);
    assert_eq!(metrics.snapshot().issued_queries, 1);
    Ok(())
}

#[test]
fn zero_radius_returns_exact_duplicates_only() -> Result<()> {
    let collection = MemoryCollection::from_vectors(
        3,
        vec![
            (1, vec![1.0, 2.0, 3.0]),
            (2, vec![1.0, 2.0, 3.0]),
            (3, vec![1.0, 2.0, 3.5]),
            (4, vec![-4.0, 0.0, 9.0]),
        ],
    )?;
    let index = build_va_file(&collection, VaFileConfig::new(1024, 4))?;
    let refiner = LpRefiner::for_distance(&collection, &DistanceFunction::Manhattan).unwrap();
    let query = index
        .range_query(&DistanceFunction::Manhattan, &refiner)?
        .expect("manhattan is supported");

    let result = query.range(&[1.0, 2.0, 3.0], 0.0, &QueryMetrics::new())?;
    assert_eq!(result, vec![Neighbor::new(1, 0.0), Neighbor::new(2, 0.0)]);
    Ok(())
}

#[test]
fn radius_equal_to_a_refined_distance_keeps_the_object() -> Result<()> {
    let collection = MemoryCollection::from_vectors(
        3,
        vec![
            (0u32, vec![0.0, 0.0, 0.0]),
            (1, vec![1.0, 1.0, 1.0]),
            (2, vec![1.0, 1.0, 1.0]),
            (3, vec![5.0, 5.0, 5.0]),
        ],
    )?;
    let index = build_va_file(&collection, VaFileConfig::new(1024, 2))?;
    let refiner = LpRefiner::for_distance(&collection, &DistanceFunction::Euclidean).unwrap();
    let query_vector = [0.0; 3];
    // sqrt(3) squares back to slightly less than 3
    let epsilon = refiner.refine(&1, &query_vector)?;

    let query = index
        .range_query(&DistanceFunction::Euclidean, &refiner)?
        .expect("euclidean is supported");
    let result = query.range(&query_vector, epsilon, &QueryMetrics::new())?;
    let scan = LinearScan::new(&collection, DistanceFunction::Euclidean);
    assert_eq!(result, scan.range(&query_vector, epsilon, &QueryMetrics::new())?);
    assert_eq!(ids(&result), vec![0, 1, 2]);
    Ok(())
}

#[test]
fn k_at_least_collection_size_returns_everything_sorted() -> Result<()> {
    let collection = wave(40, 5)?;
    let index = build_va_file(&collection, VaFileConfig::new(1024, 8))?;
    let distance = DistanceFunction::Minkowski(3.0);
    let refiner = LpRefiner::for_distance(&collection, &distance).unwrap();
    let query = index.knn_query(&distance, &refiner)?.expect("p=3 is supported");
    let query_vector = [1.0, -2.0, 3.0, 0.5, 4.0];

    let result = query.knn(&query_vector, 100, &QueryMetrics::new())?;
    assert_eq!(result.len(), 40);
    assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));

    let scan = LinearScan::new(&collection, distance);
    assert_eq!(result, scan.knn(&query_vector, 100, &QueryMetrics::new())?);
    Ok(())
}

#[test]
fn repeated_queries_are_deterministic() -> Result<()> {
    let collection = wave(200, 6)?;
    let index = build_va_file(&collection, VaFileConfig::new(512, 4))?;
    let refiner = LpRefiner::for_distance(&collection, &DistanceFunction::Euclidean).unwrap();
    let query = index
        .knn_query(&DistanceFunction::Euclidean, &refiner)?
        .expect("euclidean is supported");
    let metrics = QueryMetrics::new();
    let query_vector = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];

    let first = query.knn(&query_vector, 7, &metrics)?;
    let second = query.knn(&query_vector, 7, &metrics)?;
    assert_eq!(first, second);

    let stats = metrics.snapshot();
    assert_eq!(stats.issued_queries, 2);
    assert_eq!(stats.scans, 2);
    assert_eq!(index.scanned_pages(&metrics), 2);
    assert!(stats.refinements < 2 * 200);
    Ok(())
}

#[test]
fn declined_distance_falls_back_to_linear_scan() -> Result<()> {
    let collection = diagonal()?;
    let index = build_va_file(&collection, VaFileConfig::default())?;
    let refiner = |_: &&str, _: &[f64]| -> Result<f64> { Ok(0.0) };

    assert!(index.knn_query(&DistanceFunction::Cosine, &refiner)?.is_none());
    assert!(index.range_query(&DistanceFunction::Maximum, &refiner)?.is_none());

    let scan = LinearScan::new(&collection, DistanceFunction::Maximum);
    let result = scan.range(&[0.0, 0.0], 2.0, &QueryMetrics::new())?;
    assert_eq!(ids(&result), vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn sampled_grids_answer_exactly() -> Result<()> {
    let collection = wave(300, 4)?;
    let config = VaFileConfig::new(1024, 8).with_sample(25, 11);
    let index = build_va_file(&collection, config)?;
    let refiner = LpRefiner::for_distance(&collection, &DistanceFunction::Euclidean).unwrap();
    let query = index
        .range_query(&DistanceFunction::Euclidean, &refiner)?
        .expect("euclidean is supported");
    let query_vector = [0.0, 1.0, 2.0, 3.0];

    let scan = LinearScan::new(&collection, DistanceFunction::Euclidean);
    let expected = scan.range(&query_vector, 6.0, &QueryMetrics::new())?;
    assert_eq!(query.range(&query_vector, 6.0, &QueryMetrics::new())?, expected);
    Ok(())
}

#[test]
fn concurrent_queries_share_metrics() -> Result<()> {
    let collection = wave(150, 3)?;
    let index = build_va_file(&collection, VaFileConfig::new(1024, 4))?;
    let metrics = QueryMetrics::new();

    let results: Vec<Vec<Neighbor<usize>>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| -> Result<Vec<Neighbor<usize>>> {
                    let refiner =
                        LpRefiner::for_distance(&collection, &DistanceFunction::Euclidean).unwrap();
                    let query = index
                        .knn_query(&DistanceFunction::Euclidean, &refiner)?
                        .expect("euclidean is supported");
                    query.knn(&[1.0, 2.0, 3.0], 5, &metrics)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("query thread panicked"))
            .collect::<Result<_>>()
    })?;

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(metrics.snapshot().issued_queries, 4);
    Ok(())
}

#[test]
fn refiner_errors_abort_the_query() -> Result<()> {
    let collection = diagonal()?;
    let index = build_va_file(&collection, VaFileConfig::default())?;
    let refiner = |id: &&str, _: &[f64]| -> Result<f64> {
        Err(anyhow::anyhow!("vector {id} is unavailable").into())
    };
    let query = index
        .range_query(&DistanceFunction::Euclidean, &refiner)?
        .expect("euclidean is supported");

    let err = query.range(&[0.0, 0.0], 100.0, &QueryMetrics::new()).unwrap_err();
    assert!(err.to_string().contains("unavailable"), "{err}");
    Ok(())
}
