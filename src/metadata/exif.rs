//! EXIF camera model and capture time extraction

use chrono::NaiveDateTime;
use exif::{Field, In, Reader, Tag, Value};
use std::io::{BufRead, Seek};
use tracing::trace;

/// EXIF tags to try for date extraction, in priority order
const DATE_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal,    // When the original image was taken
    Tag::DateTimeDigitized,   // When the image was digitized
    Tag::DateTime,            // File modification date/time
];

/// Fields the roll sorter needs from EXIF; either may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifFields {
    pub camera_model: Option<String>,
    pub captured_at: Option<NaiveDateTime>,
}

/// Read camera model and capture time from an image container.
///
/// Files without a readable EXIF block yield empty fields rather than an
/// error, so callers can fall back to filesystem time.
pub fn read_exif<R: BufRead + Seek>(reader: &mut R) -> ExifFields {
    let exif = match Reader::new().read_from_container(reader) {
        Ok(exif) => exif,
        Err(e) => {
            trace!(error = %e, "No EXIF data in container");
            return ExifFields::default();
        }
    };

    let camera_model = exif
        .get_field(Tag::Model, In::PRIMARY)
        .and_then(ascii_value);

    let captured_at = DATE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        let datetime = ascii_value(field).and_then(|s| parse_exif_datetime(&s))?;
        trace!(?tag, %datetime, "Found EXIF date");
        Some(datetime)
    });

    ExifFields {
        camera_model,
        captured_at,
    }
}

/// First non-empty ASCII component of a field, with NUL padding stripped
fn ascii_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string()
            })
            .find(|s| !s.is_empty()),
        _ => None,
    }
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    // With subseconds
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S%.f") {
        return Some(dt);
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

/// Build a minimal JPEG holding only an EXIF APP1 segment.
///
/// IFD0 carries `Model` (when given) and a pointer to an Exif IFD with
/// `DateTimeOriginal` (when given).
#[cfg(test)]
pub(crate) fn synthetic_jpeg(model: Option<&str>, captured_at: Option<&str>) -> Vec<u8> {
    fn push_entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&kind.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
    }

    const ASCII: u16 = 2;
    const LONG: u16 = 4;

    let model_bytes = model.map(|m| {
        let mut b = m.as_bytes().to_vec();
        b.push(0);
        // keep the value out-of-line so the offset layout stays simple
        while b.len() < 5 {
            b.push(0);
        }
        b
    });
    let date_bytes = captured_at.map(|d| {
        let mut b = d.as_bytes().to_vec();
        b.push(0);
        b
    });

    let ifd0_entries = 1 + u16::from(model_bytes.is_some());
    let ifd0_len = 2 + 12 * ifd0_entries as u32 + 4;
    let model_offset = 8 + ifd0_len;
    let exif_ifd_offset = model_offset + model_bytes.as_ref().map_or(0, |b| b.len() as u32);
    let exif_entries = u16::from(date_bytes.is_some());
    let date_offset = exif_ifd_offset + 2 + 12 * exif_entries as u32 + 4;

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());

    tiff.extend_from_slice(&ifd0_entries.to_le_bytes());
    if let Some(bytes) = &model_bytes {
        push_entry(&mut tiff, 0x0110, ASCII, bytes.len() as u32, model_offset);
    }
    push_entry(&mut tiff, 0x8769, LONG, 1, exif_ifd_offset);
    tiff.extend_from_slice(&0u32.to_le_bytes());
    if let Some(bytes) = &model_bytes {
        tiff.extend_from_slice(bytes);
    }

    tiff.extend_from_slice(&exif_entries.to_le_bytes());
    if let Some(bytes) = &date_bytes {
        push_entry(&mut tiff, 0x9003, ASCII, bytes.len() as u32, date_offset);
    }
    tiff.extend_from_slice(&0u32.to_le_bytes());
    if let Some(bytes) = &date_bytes {
        tiff.extend_from_slice(bytes);
    }

    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend_from_slice(&tiff);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&app1);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::io::Cursor;

    #[test]
    fn test_parse_exif_datetime() {
        // Standard EXIF format
        let dt = parse_exif_datetime("2024:01:15 14:30:00").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 0);

        // With quotes
        let dt = parse_exif_datetime("\"2024:01:15 14:30:00\"").unwrap();
        assert_eq!(dt.year(), 2024);

        // Alternative formats
        let dt = parse_exif_datetime("2024-01-15T14:30:00").unwrap();
        assert_eq!(dt.hour(), 14);

        // Invalid format
        assert!(parse_exif_datetime("invalid").is_none());
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
    }

    #[test]
    fn test_read_exif_model_and_date() {
        let jpeg = synthetic_jpeg(Some("CameraX"), Some("2024:05:01 10:00:00"));
        let fields = read_exif(&mut Cursor::new(jpeg));

        assert_eq!(fields.camera_model.as_deref(), Some("CameraX"));
        assert_eq!(
            fields.captured_at,
            parse_exif_datetime("2024:05:01 10:00:00")
        );
    }

    #[test]
    fn test_read_exif_without_date() {
        let jpeg = synthetic_jpeg(Some("CameraX"), None);
        let fields = read_exif(&mut Cursor::new(jpeg));

        assert_eq!(fields.camera_model.as_deref(), Some("CameraX"));
        assert!(fields.captured_at.is_none());
    }

    #[test]
    fn test_read_exif_garbage_is_empty() {
        let fields = read_exif(&mut Cursor::new(b"this is not an image".to_vec()));
        assert_eq!(fields, ExifFields::default());
    }
}
