//! Command implementations for the vafile CLI.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use serde::Deserialize;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::collection::{LpRefiner, MemoryCollection, Refiner, VectorCollection};
use crate::config::VaFileConfig;
use crate::distance::{DimensionSubset, DistanceFunction};
use crate::error::{Result, VaFileError};
use crate::index::{KnnIndex, KnnQuery, PartialVaFile, RangeIndex, RangeQuery, VaFile};
use crate::metrics::QueryMetrics;
use crate::scan::LinearScan;

const LINEAR_SCAN: &str = "linear-scan";

/// One line of a vector file.
#[derive(Debug, Deserialize)]
struct VectorRecord {
    id: String,
    vector: Vec<f64>,
}

/// Execute a CLI command.
pub fn execute_command(args: VafileArgs) -> Result<()> {
    match &args.command {
        Command::Knn(knn_args) => knn(knn_args, &args),
        Command::Range(range_args) => range(range_args, &args),
    }
}

/// Run a kNN query.
fn knn(args: &KnnArgs, cli_args: &VafileArgs) -> Result<()> {
    let prepared = Prepared::load(&args.options)?;
    let metrics = QueryMetrics::new();
    let refiner = LpRefiner::for_distance(&prepared.collection, &prepared.distance);

    let start = Instant::now();
    let query = match &refiner {
        Some(refiner) => prepared.index.knn_query(&prepared.distance, refiner)?,
        None => None,
    };
    let (answered_by, neighbors) = match query {
        Some(query) => (
            prepared.index.name(),
            query.knn(&args.options.query, args.k, &metrics)?,
        ),
        None => {
            prepared.fall_back();
            let scan = LinearScan::new(&prepared.collection, prepared.distance.clone());
            (LINEAR_SCAN, scan.knn(&args.options.query, args.k, &metrics)?)
        }
    };
    let query_ms = start.elapsed().as_millis() as u64;
    prepared.index.log_statistics(&metrics);

    output_result(
        &format!("{} nearest neighbors", args.k),
        &QueryResults {
            answered_by: answered_by.to_string(),
            distance: prepared.distance.name().to_string(),
            neighbors,
            build_ms: prepared.build_ms,
            query_ms,
            statistics: metrics.snapshot(),
        },
        cli_args,
    )
}

/// Run a range query.
fn range(args: &RangeArgs, cli_args: &VafileArgs) -> Result<()> {
    let prepared = Prepared::load(&args.options)?;
    let metrics = QueryMetrics::new();
    let refiner = LpRefiner::for_distance(&prepared.collection, &prepared.distance);

    let start = Instant::now();
    let query = match &refiner {
        Some(refiner) => prepared.index.range_query(&prepared.distance, refiner)?,
        None => None,
    };
    let (answered_by, neighbors) = match query {
        Some(query) => (
            prepared.index.name(),
            query.range(&args.options.query, args.epsilon, &metrics)?,
        ),
        None => {
            prepared.fall_back();
            let scan = LinearScan::new(&prepared.collection, prepared.distance.clone());
            (
                LINEAR_SCAN,
                scan.range(&args.options.query, args.epsilon, &metrics)?,
            )
        }
    };
    let query_ms = start.elapsed().as_millis() as u64;
    prepared.index.log_statistics(&metrics);

    output_result(
        &format!("Vectors within {}", args.epsilon),
        &QueryResults {
            answered_by: answered_by.to_string(),
            distance: prepared.distance.name().to_string(),
            neighbors,
            build_ms: prepared.build_ms,
            query_ms,
            statistics: metrics.snapshot(),
        },
        cli_args,
    )
}

/// Collection, distance and built index for one query command.
struct Prepared {
    collection: MemoryCollection<String>,
    distance: DistanceFunction,
    index: SearchIndex,
    build_ms: u64,
}

impl Prepared {
    fn load(options: &QueryOptions) -> Result<Self> {
        let collection = load_collection(&options.data, options.query.len())?;
        let distance = distance_function(options, collection.dimensionality())?;
        let config = index_config(options)?;

        let start = Instant::now();
        let index = SearchIndex::build(options.index, config, &collection)?;
        let build_ms = start.elapsed().as_millis() as u64;

        Ok(Self {
            collection,
            distance,
            index,
            build_ms,
        })
    }

    fn fall_back(&self) {
        if !matches!(self.index, SearchIndex::Scan) {
            log::warn!(
                "{} does not support the {} distance; falling back to a linear scan",
                self.index.name(),
                self.distance.name()
            );
        }
    }
}

/// The index selected on the command line.
enum SearchIndex {
    Va(VaFile<String>),
    Partial(PartialVaFile<String>),
    Scan,
}

impl SearchIndex {
    fn build(
        kind: IndexKind,
        config: VaFileConfig,
        collection: &MemoryCollection<String>,
    ) -> Result<Self> {
        Ok(match kind {
            IndexKind::Va => {
                let mut index = VaFile::new(config)?;
                index.build(collection)?;
                SearchIndex::Va(index)
            }
            IndexKind::Partial => {
                let mut index = PartialVaFile::new(config)?;
                index.build(collection)?;
                SearchIndex::Partial(index)
            }
            IndexKind::Scan => SearchIndex::Scan,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            SearchIndex::Va(_) => VaFile::<String>::NAME,
            SearchIndex::Partial(_) => PartialVaFile::<String>::NAME,
            SearchIndex::Scan => LINEAR_SCAN,
        }
    }

    fn knn_query<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<String>,
    ) -> Result<Option<Box<dyn KnnQuery<String> + 'a>>> {
        match self {
            SearchIndex::Va(index) => index.knn_query(distance, refiner),
            SearchIndex::Partial(index) => index.knn_query(distance, refiner),
            SearchIndex::Scan => Ok(None),
        }
    }

    fn range_query<'a>(
        &'a self,
        distance: &DistanceFunction,
        refiner: &'a dyn Refiner<String>,
    ) -> Result<Option<Box<dyn RangeQuery<String> + 'a>>> {
        match self {
            SearchIndex::Va(index) => index.range_query(distance, refiner),
            SearchIndex::Partial(index) => index.range_query(distance, refiner),
            SearchIndex::Scan => Ok(None),
        }
    }

    fn log_statistics(&self, metrics: &QueryMetrics) {
        match self {
            SearchIndex::Va(index) => index.log_statistics(metrics),
            SearchIndex::Partial(index) => index.log_statistics(metrics),
            SearchIndex::Scan => metrics.log_statistics(LINEAR_SCAN),
        }
    }
}

/// Load a JSONL vector file.
///
/// An empty file yields an empty collection of `dimensionality_hint`
/// dimensions.
pub fn load_collection(path: &Path, dimensionality_hint: usize) -> Result<MemoryCollection<String>> {
    let file = File::open(path)?;
    read_collection(BufReader::new(file), dimensionality_hint)
}

/// Read `{"id": ..., "vector": [...]}` records, one per line.
///
/// The first record fixes the dimensionality. Blank lines are skipped.
pub fn read_collection<R: BufRead>(
    reader: R,
    dimensionality_hint: usize,
) -> Result<MemoryCollection<String>> {
    let mut collection: Option<MemoryCollection<String>> = None;
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: VectorRecord = serde_json::from_str(&line).map_err(|e| {
            VaFileError::invalid_argument(format!("line {}: {e}", line_num + 1))
        })?;
        let collection =
            collection.get_or_insert_with(|| MemoryCollection::new(record.vector.len()));
        collection
            .insert(record.id, record.vector)
            .map_err(|e| VaFileError::invalid_argument(format!("line {}: {e}", line_num + 1)))?;
    }
    let collection = collection.unwrap_or_else(|| MemoryCollection::new(dimensionality_hint));
    log::debug!("loaded {} vectors", collection.len());
    Ok(collection)
}

/// Index configuration from the config file (or defaults) and overrides.
pub fn index_config(options: &QueryOptions) -> Result<VaFileConfig> {
    let mut config = match &options.config {
        Some(path) => VaFileConfig::from_file(path)?,
        None => VaFileConfig::default(),
    };
    if let Some(partitions) = options.partitions {
        config.partitions = partitions;
    }
    if let Some(page_size) = options.page_size {
        config.page_size = page_size;
    }
    if let Some(sample_size) = options.sample_size {
        config.sample_size = Some(sample_size);
    }
    if let Some(seed) = options.seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

/// Distance function selected by `options`.
pub fn distance_function(options: &QueryOptions, dimensionality: usize) -> Result<DistanceFunction> {
    match options.distance {
        DistanceKind::Maximum => Ok(DistanceFunction::Maximum),
        DistanceKind::Cosine => Ok(DistanceFunction::Cosine),
        DistanceKind::Lp => {
            let p = options.p;
            if !(p.is_finite() && p > 0.0) {
                return Err(VaFileError::invalid_argument(format!(
                    "Lp exponent must be finite and positive, got {p}"
                )));
            }
            if !options.dims.is_empty() {
                return Ok(DistanceFunction::SubspaceMinkowski {
                    p,
                    dimensions: DimensionSubset::from_dimensions(dimensionality, &options.dims)?,
                });
            }
            Ok(if p == 2.0 {
                DistanceFunction::Euclidean
            } else if p == 1.0 {
                DistanceFunction::Manhattan
            } else {
                DistanceFunction::Minkowski(p)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use clap::Parser;

    use super::*;

    fn options(extra: &[&str]) -> QueryOptions {
        let args = VafileArgs::try_parse_from(
            ["vafile", "knn", "data.jsonl", "--query", "0,0,0"]
                .iter()
                .chain(extra),
        )
        .unwrap();
        match args.command {
            Command::Knn(knn_args) => knn_args.options,
            Command::Range(_) => panic!("Expected Knn command"),
        }
    }

    #[test]
    fn test_read_collection() {
        let data = r#"{"id": "a", "vector": [0.0, 1.0]}

{"id": "b", "vector": [2.0, 3.0]}
"#;
        let collection = read_collection(Cursor::new(data), 5).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.dimensionality(), 2);
        assert_eq!(collection.get(&"b".to_string()), Some(&[2.0, 3.0][..]));
    }

    #[test]
    fn test_read_collection_reports_line() {
        let data = "{\"id\": \"a\", \"vector\": [0.0, 1.0]}\n{\"id\": \"b\", \"vector\": [2.0]}\n";
        let err = read_collection(Cursor::new(data), 2).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");

        let err = read_collection(Cursor::new("not json\n"), 2).unwrap_err();
        assert!(matches!(err, VaFileError::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_file_uses_hint() {
        let collection = read_collection(Cursor::new(""), 3).unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.dimensionality(), 3);
    }

    #[test]
    fn test_distance_function() {
        assert_eq!(
            distance_function(&options(&[]), 3).unwrap(),
            DistanceFunction::Euclidean
        );
        assert_eq!(
            distance_function(&options(&["-p", "1"]), 3).unwrap(),
            DistanceFunction::Manhattan
        );
        assert_eq!(
            distance_function(&options(&["-p", "3"]), 3).unwrap(),
            DistanceFunction::Minkowski(3.0)
        );
        assert_eq!(
            distance_function(&options(&["--dims", "0,2"]), 3).unwrap(),
            DistanceFunction::SubspaceMinkowski {
                p: 2.0,
                dimensions: DimensionSubset::from_dimensions(3, &[0, 2]).unwrap(),
            }
        );
        assert!(distance_function(&options(&["--dims", "7"]), 3).is_err());
        assert!(distance_function(&options(&["-p", "0"]), 3).is_err());
        assert_eq!(
            distance_function(&options(&["--distance", "cosine"]), 3).unwrap(),
            DistanceFunction::Cosine
        );
    }

    #[test]
    fn test_index_config_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"page_size": 4096, "partitions": 8}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = index_config(&options(&["--config", path.as_str(), "--partitions", "16"])).unwrap();
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.partitions, 16);

        assert!(index_config(&options(&["--partitions", "6"])).is_err());
    }

    #[test]
    fn test_execute_command() {
        let mut data = tempfile::NamedTempFile::new().unwrap();
        for (i, vector) in [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [10.0, 10.0]]
            .iter()
            .enumerate()
        {
            writeln!(data, r#"{{"id": "p{i}", "vector": [{}, {}]}}"#, vector[0], vector[1]).unwrap();
        }
        let path = data.path().to_string_lossy().to_string();

        for (index, distance) in [("va", "lp"), ("partial", "lp"), ("va", "cosine"), ("scan", "maximum")] {
            let args = VafileArgs::try_parse_from([
                "vafile", "--quiet", "--format", "json", "knn", path.as_str(), "--query", "0,0", "-k", "2",
                "--index", index, "--distance", distance,
            ])
            .unwrap();
            execute_command(args).unwrap();
        }

        let args = VafileArgs::try_parse_from([
            "vafile", "--quiet", "range", path.as_str(), "--query", "0,0", "--epsilon", "1.5",
        ])
        .unwrap();
        execute_command(args).unwrap();
    }
}
