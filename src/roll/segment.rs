//! Roll segmentation
//!
//! Records are grouped by camera model and extension, each group is
//! stable-sorted by timestamp, and a new roll starts wherever the gap to the
//! previous record is strictly greater than the threshold.

use super::{Roll, RollKey};
use crate::metadata::MetadataRecord;
use chrono::TimeDelta;
use std::collections::HashMap;
use std::collections::VecDeque;
use tracing::trace;

/// Splits metadata records into rolls
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    threshold: TimeDelta,
}

impl Segmenter {
    pub fn new(threshold: TimeDelta) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// Lazily segment `records` into rolls.
    ///
    /// Groups are visited in order of first appearance in `records`; within a
    /// group, rolls come out ascending by start time.
    pub fn segment<'a>(&self, records: &'a [MetadataRecord]) -> Rolls<'a> {
        let mut index: HashMap<RollKey<'a>, usize> = HashMap::new();
        let mut groups: Vec<(RollKey<'a>, Vec<&'a MetadataRecord>)> = Vec::new();

        for record in records {
            let key = RollKey::of(record);
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(record);
        }

        Rolls {
            threshold: self.threshold,
            groups: groups.into(),
            current: None,
        }
    }
}

/// Iterator over the rolls of one segmentation pass
#[derive(Debug)]
pub struct Rolls<'a> {
    threshold: TimeDelta,
    groups: VecDeque<(RollKey<'a>, Vec<&'a MetadataRecord>)>,
    /// Group being walked: key, sorted records, cursor
    current: Option<(RollKey<'a>, Vec<&'a MetadataRecord>, usize)>,
}

impl<'a> Iterator for Rolls<'a> {
    type Item = Roll<'a>;

    fn next(&mut self) -> Option<Roll<'a>> {
        loop {
            if let Some((key, sorted, cursor)) = &mut self.current
                && *cursor < sorted.len()
            {
                let start = *cursor;
                let mut end = start + 1;
                while end < sorted.len()
                    && sorted[end].timestamp - sorted[end - 1].timestamp <= self.threshold
                {
                    end += 1;
                }
                *cursor = end;
                trace!(
                    camera_model = key.camera_model,
                    extension = key.extension,
                    len = end - start,
                    "Segmented roll"
                );
                return Some(Roll::new(*key, sorted[start..end].to_vec()));
            }

            let (key, mut group) = self.groups.pop_front()?;
            // stable: equal timestamps keep input order
            group.sort_by_key(|record| record.timestamp);
            self.current = Some((key, group, 0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TimeSource;
    use chrono::NaiveDateTime;
    use std::path::PathBuf;

    fn at(hm: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("2024-05-01 {}:00", hm), "%Y-%m-%d %H:%M:%S")
            .unwrap()
    }

    fn record(name: &str, model: &str, ext: &str, hm: &str) -> MetadataRecord {
        MetadataRecord {
            path: PathBuf::from(format!("/import/{}", name)),
            extension: ext.to_string(),
            camera_model: model.to_string(),
            timestamp: at(hm),
            time_source: TimeSource::Exif,
        }
    }

    fn names(roll: &Roll<'_>) -> Vec<String> {
        roll.records()
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn hour() -> Segmenter {
        Segmenter::new(TimeDelta::minutes(60))
    }

    #[test]
    fn test_empty_input_yields_no_rolls() {
        assert_eq!(hour().segment(&[]).count(), 0);
    }

    #[test]
    fn test_splits_on_gap_larger_than_threshold() {
        let records = vec![
            record("a.jpg", "CameraX", "jpg", "10:00"),
            record("b.jpg", "CameraX", "jpg", "10:05"),
            record("c.jpg", "CameraX", "jpg", "12:00"),
        ];
        let rolls: Vec<_> = hour().segment(&records).collect();

        assert_eq!(rolls.len(), 2);
        assert_eq!(names(&rolls[0]), ["a.jpg", "b.jpg"]);
        assert_eq!(names(&rolls[1]), ["c.jpg"]);
        assert_eq!(rolls[0].start(), at("10:00"));
        assert_eq!(rolls[0].end(), at("10:05"));
    }

    #[test]
    fn test_gap_equal_to_threshold_stays_in_roll() {
        let records = vec![
            record("a.jpg", "CameraX", "jpg", "10:00"),
            record("b.jpg", "CameraX", "jpg", "11:00"),
            record("c.jpg", "CameraX", "jpg", "12:01"),
        ];
        let rolls: Vec<_> = hour().segment(&records).collect();

        assert_eq!(rolls.len(), 2);
        assert_eq!(names(&rolls[0]), ["a.jpg", "b.jpg"]);
        assert_eq!(names(&rolls[1]), ["c.jpg"]);
    }

    #[test]
    fn test_unsorted_input_is_sorted_within_group() {
        let records = vec![
            record("late.jpg", "CameraX", "jpg", "15:00"),
            record("early.jpg", "CameraX", "jpg", "09:00"),
            record("mid.jpg", "CameraX", "jpg", "09:30"),
        ];
        let rolls: Vec<_> = hour().segment(&records).collect();

        assert_eq!(rolls.len(), 2);
        assert_eq!(names(&rolls[0]), ["early.jpg", "mid.jpg"]);
        assert_eq!(names(&rolls[1]), ["late.jpg"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![
            record("second.jpg", "CameraX", "jpg", "10:00"),
            record("first.jpg", "CameraX", "jpg", "09:59"),
            record("third.jpg", "CameraX", "jpg", "10:00"),
        ];
        let rolls: Vec<_> = hour().segment(&records).collect();

        assert_eq!(rolls.len(), 1);
        assert_eq!(names(&rolls[0]), ["first.jpg", "second.jpg", "third.jpg"]);
    }

    #[test]
    fn test_groups_by_model_and_extension() {
        let records = vec![
            record("x1.jpg", "CameraX", "jpg", "10:00"),
            record("y1.jpg", "CameraY", "jpg", "10:01"),
            record("x1.cr2", "CameraX", "cr2", "10:00"),
            record("x2.jpg", "CameraX", "jpg", "10:02"),
        ];
        let rolls: Vec<_> = hour().segment(&records).collect();

        // first-appearance group order: (X, jpg), (Y, jpg), (X, cr2)
        assert_eq!(rolls.len(), 3);
        assert_eq!(rolls[0].camera_model(), "CameraX");
        assert_eq!(rolls[0].extension(), "jpg");
        assert_eq!(names(&rolls[0]), ["x1.jpg", "x2.jpg"]);
        assert_eq!(rolls[1].camera_model(), "CameraY");
        assert_eq!(rolls[2].extension(), "cr2");
    }

    #[test]
    fn test_single_record_group_is_one_roll() {
        let records = vec![record("only.jpg", "CameraX", "jpg", "10:00")];
        let rolls: Vec<_> = hour().segment(&records).collect();

        assert_eq!(rolls.len(), 1);
        assert_eq!(rolls[0].len(), 1);
    }

    #[test]
    fn test_zero_threshold_splits_all_but_simultaneous() {
        let records = vec![
            record("a.jpg", "CameraX", "jpg", "10:00"),
            record("b.jpg", "CameraX", "jpg", "10:00"),
            record("c.jpg", "CameraX", "jpg", "10:01"),
        ];
        let rolls: Vec<_> = Segmenter::new(TimeDelta::zero()).segment(&records).collect();

        assert_eq!(rolls.len(), 2);
        assert_eq!(names(&rolls[0]), ["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_every_record_lands_in_exactly_one_roll() {
        let times = ["08:00", "08:40", "13:15", "09:30", "10:31", "13:00", "23:59", "00:00"];
        let records: Vec<_> = times
            .iter()
            .enumerate()
            .map(|(i, hm)| {
                let model = if i % 3 == 0 { "CameraX" } else { "CameraY" };
                let ext = if i % 2 == 0 { "jpg" } else { "png" };
                record(&format!("{}.{}", i, ext), model, ext, hm)
            })
            .collect();

        let mut seen: Vec<&MetadataRecord> = hour()
            .segment(&records)
            .flat_map(|roll| roll.records().to_vec())
            .collect();
        assert_eq!(seen.len(), records.len());

        seen.sort_by_key(|r| r.path.clone());
        seen.dedup_by_key(|r| r.path.clone());
        assert_eq!(seen.len(), records.len());
    }

    #[test]
    fn test_rolls_respect_threshold_within_and_between() {
        let times = ["08:00", "08:40", "09:30", "10:31", "10:59", "13:00"];
        let records: Vec<_> = times
            .iter()
            .map(|hm| record(&format!("{}.jpg", hm), "CameraX", "jpg", hm))
            .collect();
        let threshold = TimeDelta::minutes(60);
        let rolls: Vec<_> = Segmenter::new(threshold).segment(&records).collect();

        for roll in &rolls {
            for pair in roll.records().windows(2) {
                assert!(pair[1].timestamp - pair[0].timestamp <= threshold);
            }
        }
        for pair in rolls.windows(2) {
            assert!(pair[1].start() - pair[0].end() > threshold);
        }
        assert_eq!(rolls.len(), 3);
    }

    #[test]
    fn test_segmenting_twice_is_identical() {
        let records = vec![
            record("a.jpg", "CameraX", "jpg", "10:00"),
            record("b.jpg", "CameraX", "jpg", "10:00"),
            record("c.jpg", "CameraY", "jpg", "12:00"),
            record("d.jpg", "CameraX", "jpg", "14:00"),
        ];
        let segmenter = hour();
        let first: Vec<_> = segmenter.segment(&records).collect();
        let second: Vec<_> = segmenter.segment(&records).collect();

        assert_eq!(first, second);
    }
}
