//! Per-file metadata collection
//!
//! Turns candidate image paths into [`MetadataRecord`]s. Capture time and
//! camera model come from EXIF; when the capture time is missing the file's
//! filesystem creation time is used instead (modification time on platforms
//! that cannot report creation time).

pub mod exif;

use crate::error::{Error, Result};
use crate::roll::normalize_extension;
use chrono::{DateTime, Local, NaiveDateTime};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, warn};

/// Camera model used when EXIF does not name one
pub const UNKNOWN_MODEL: &str = "unknown";

/// Source of a record's timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// EXIF capture time
    Exif,
    /// File system creation time
    FileCreated,
    /// File system modification time (creation time unsupported)
    FileModified,
}

/// Attributes of one image file used for roll segmentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub path: PathBuf,
    pub extension: String,
    pub camera_model: String,
    pub timestamp: NaiveDateTime,
    pub time_source: TimeSource,
}

/// A file that could not be turned into a record
#[derive(Debug, Clone)]
pub struct CollectFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of collecting metadata for a batch of files
#[derive(Debug, Default)]
pub struct Collection {
    /// Records in input order
    pub records: Vec<MetadataRecord>,
    /// Files that were excluded, in input order
    pub failures: Vec<CollectFailure>,
}

/// Read one file's metadata record.
///
/// Failing to open the file is an error; a missing EXIF timestamp is not.
pub fn read_record(path: &Path) -> Result<MetadataRecord> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(normalize_extension)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

    let path = std::path::absolute(path).map_err(|source| Error::UnreadableSource {
        path: path.to_path_buf(),
        source,
    })?;

    let file = File::open(&path).map_err(|source| Error::UnreadableSource {
        path: path.clone(),
        source,
    })?;
    let fields = exif::read_exif(&mut BufReader::new(file));

    let (timestamp, time_source) = match fields.captured_at {
        Some(ts) => (ts, TimeSource::Exif),
        None => {
            let (ts, source) = filesystem_time(&path)?;
            warn!(?path, time_source = ?source, "No EXIF capture time, using file system time");
            (ts, source)
        }
    };

    let camera_model = fields
        .camera_model
        .unwrap_or_else(|| UNKNOWN_MODEL.to_string());

    debug!(?path, %camera_model, %timestamp, ?time_source, "Read metadata");

    Ok(MetadataRecord {
        path,
        extension,
        camera_model,
        timestamp,
        time_source,
    })
}

/// Collect records for all paths, keeping input order.
///
/// Unreadable files are logged and reported in [`Collection::failures`]
/// instead of failing the batch.
pub fn collect_records(paths: &[PathBuf]) -> Collection {
    let results: Vec<Result<MetadataRecord>> =
        paths.par_iter().map(|path| read_record(path)).collect();

    let mut collection = Collection::default();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(record) => collection.records.push(record),
            Err(e) => {
                error!(?path, error = %e, "Excluding unreadable file");
                collection.failures.push(CollectFailure {
                    path: path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    collection
}

/// File system creation time, or modification time where creation time is unsupported
fn filesystem_time(path: &Path) -> Result<(NaiveDateTime, TimeSource)> {
    let metadata = fs::metadata(path).map_err(|source| Error::UnreadableSource {
        path: path.to_path_buf(),
        source,
    })?;

    let (time, source) = match metadata.created() {
        Ok(created) => (created, TimeSource::FileCreated),
        Err(e) => {
            debug!(?path, error = %e, "Creation time unavailable, using modification time");
            let modified = metadata.modified().map_err(|source| Error::Timestamp {
                path: path.to_path_buf(),
                source,
            })?;
            (modified, TimeSource::FileModified)
        }
    };

    Ok((to_local_naive(time), source))
}

/// EXIF times are local wall-clock times, so file system times are read the same way
fn to_local_naive(time: SystemTime) -> NaiveDateTime {
    let datetime: DateTime<Local> = time.into();
    datetime.naive_local()
}
