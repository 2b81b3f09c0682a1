//! Rolls: shooting sessions of one camera and one file type
//!
//! [`segment`] splits metadata records into rolls; [`materialize`] turns
//! each roll into a directory under the export root.

pub mod materialize;
pub mod segment;

use crate::metadata::MetadataRecord;
use chrono::NaiveDateTime;

pub use materialize::{Materializer, Placement};
pub use segment::{Rolls, Segmenter};

/// Lower-case an extension and fold aliases of the same format together
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim_start_matches('.').to_lowercase();
    match ext.as_str() {
        "jpeg" | "jpe" => "jpg".to_string(),
        "tif" => "tiff".to_string(),
        _ => ext,
    }
}

/// Grouping key shared by every record of a roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RollKey<'a> {
    pub camera_model: &'a str,
    pub extension: &'a str,
}

impl<'a> RollKey<'a> {
    pub fn of(record: &'a MetadataRecord) -> Self {
        Self {
            camera_model: &record.camera_model,
            extension: &record.extension,
        }
    }
}

/// A non-empty, time-ordered run of records from one [`RollKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roll<'a> {
    key: RollKey<'a>,
    records: Vec<&'a MetadataRecord>,
}

impl<'a> Roll<'a> {
    /// Callers must pass at least one record, sorted by timestamp, all with `key`
    pub(crate) fn new(key: RollKey<'a>, records: Vec<&'a MetadataRecord>) -> Self {
        debug_assert!(!records.is_empty());
        Self { key, records }
    }

    pub fn key(&self) -> RollKey<'a> {
        self.key
    }

    pub fn camera_model(&self) -> &'a str {
        self.key.camera_model
    }

    pub fn extension(&self) -> &'a str {
        self.key.extension
    }

    pub fn records(&self) -> &[&'a MetadataRecord] {
        &self.records
    }

    /// Timestamp of the earliest record
    pub fn start(&self) -> NaiveDateTime {
        self.records[0].timestamp
    }

    /// Timestamp of the latest record
    pub fn end(&self) -> NaiveDateTime {
        self.records[self.records.len() - 1].timestamp
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("JPG"), "jpg");
        assert_eq!(normalize_extension("jpeg"), "jpg");
        assert_eq!(normalize_extension(".JPEG"), "jpg");
        assert_eq!(normalize_extension("TIF"), "tiff");
        assert_eq!(normalize_extension("CR2"), "cr2");
    }
}
