//! Error types for the vafile library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`VaFileError`] enum. Clamping of out-of-grid values and unsupported
//! distance functions are *not* errors: the former is logged, the latter is
//! reported as `Ok(None)` by the query factories.
//!
//! # Examples
//!
//! ```
//! use vafile::error::{Result, VaFileError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(VaFileError::invalid_argument("epsilon must not be negative"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for vafile operations.
#[derive(Error, Debug)]
pub enum VaFileError {
    /// I/O errors (reading data or configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid index configuration (partition count, page size, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation not allowed in the current index state
    #[error("Invalid state: {0}")]
    State(String),

    /// Invalid argument passed to a query or builder
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Vector dimensionality does not match the index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The refinement callback could not produce an exact distance
    #[error("Refinement error: {0}")]
    Refinement(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`VaFileError`].
pub type Result<T> = std::result::Result<T, VaFileError>;

impl VaFileError {
    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        VaFileError::InvalidConfig(msg.into())
    }

    /// Create a new state error.
    pub fn state<S: Into<String>>(msg: S) -> Self {
        VaFileError::State(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        VaFileError::InvalidArgument(msg.into())
    }

    /// Create a new refinement error.
    pub fn refinement<S: Into<String>>(msg: S) -> Self {
        VaFileError::Refinement(msg.into())
    }

    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        VaFileError::DimensionMismatch { expected, actual }
    }
}
