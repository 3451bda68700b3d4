//! Construction-time configuration shared by both index types.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaFileError};

/// Configuration for building a vector-approximation index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaFileConfig {
    /// Simulated page size in bytes. Only feeds the cost model.
    pub page_size: usize,
    /// Number of grid cells per dimension. Must be a power of two, at least 2.
    pub partitions: usize,
    /// Build the interior grid quantiles from a sample of this many vectors.
    /// `None` scans the full collection.
    pub sample_size: Option<usize>,
    /// Seed for the grid sample.
    pub seed: u64,
}

impl Default for VaFileConfig {
    fn default() -> Self {
        Self {
            page_size: 1024,
            partitions: 2,
            sample_size: None,
            seed: 0,
        }
    }
}

impl VaFileConfig {
    /// Create a configuration with the given page size and partition count.
    pub fn new(page_size: usize, partitions: usize) -> Self {
        Self {
            page_size,
            partitions,
            ..Self::default()
        }
    }

    /// Build grid quantiles from a seeded sample of `sample_size` vectors.
    pub fn with_sample(mut self, sample_size: usize, seed: u64) -> Self {
        self.sample_size = Some(sample_size);
        self.seed = seed;
        self
    }

    /// Check the configuration. Called by the index constructors.
    pub fn validate(&self) -> Result<()> {
        if self.partitions < 2 || !self.partitions.is_power_of_two() {
            return Err(VaFileError::invalid_config(format!(
                "number of partitions must be a power of 2 and at least 2, got {}",
                self.partitions
            )));
        }
        if self.partitions > u32::MAX as usize {
            return Err(VaFileError::invalid_config(format!(
                "number of partitions {} does not fit a cell index",
                self.partitions
            )));
        }
        if self.page_size == 0 {
            return Err(VaFileError::invalid_config("page size must be at least 1"));
        }
        if self.sample_size == Some(0) {
            return Err(VaFileError::invalid_config(
                "sample size must be at least 1 when set",
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: VaFileConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
