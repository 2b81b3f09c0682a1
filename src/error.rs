//! Error types for the roll sorter

use crate::config::PlacementMode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for roll sorter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the roll sorter
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read source file {path}: {source}")]
    UnreadableSource {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No capture or filesystem timestamp available for {path}: {source}")]
    Timestamp {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to create roll directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to place {source_path} at {destination} ({mode}): {io}")]
    Placement {
        source_path: PathBuf,
        destination: PathBuf,
        mode: PlacementMode,
        #[source]
        io: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}
