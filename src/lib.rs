//! Roll Sorter - split photo imports into shooting-session rolls
//!
//! This library provides functionality for:
//! - EXIF camera model and capture time extraction
//! - File system time fallback for images without capture time
//! - Grouping images by camera model and file type
//! - Splitting each group into rolls on large capture-time gaps
//! - Placing each roll in its own directory by copy, hard link, or symlink

pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod process;
pub mod roll;

pub use cli::Cli;
pub use config::{Config, ConfigError, FailurePolicy, PlacementMode};
pub use error::{Error, Result};
pub use metadata::{MetadataRecord, TimeSource};
pub use process::{Processor, RunSummary};
pub use roll::{Materializer, Placement, Roll, RollKey, Segmenter};
