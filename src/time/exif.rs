//! EXIF time extraction for images
//!
//! The decoder output is flattened into a tag name → value map first, so the
//! timestamp selection only deals with strings.

use crate::error::MediaError;
use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone};
use exif::{In, Reader, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// EXIF tags to try for date extraction, in priority order
const DATE_TAGS: &[&str] = &[
    "DateTimeOriginal", // When the original image was taken
    "DateTime",         // File change date/time
];

/// EXIF datetime layout
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Extract the capture time of an image
pub fn extract_exif_time(path: &Path) -> Result<DateTime<Local>, MediaError> {
    let tags = read_exif_tags(path)?;
    let time = timestamp_from_tags(&tags)?;
    trace!(?path, %time, "Found EXIF date");
    Ok(time)
}

/// Decode the primary-image EXIF fields of a file into tag name → value
pub fn read_exif_tags(path: &Path) -> Result<HashMap<String, String>, MediaError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| MediaError::ExifUnreadable(e.to_string()))?;

    let tags = exif
        .fields()
        .filter(|field| field.ifd_num == In::PRIMARY)
        .map(|field| {
            let value = match field.value {
                Value::Ascii(ref parts) => parts
                    .first()
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    .unwrap_or_default(),
                _ => field.display_value().to_string(),
            };
            (field.tag.to_string(), value)
        })
        .collect();

    Ok(tags)
}

/// Pick and parse the capture time from decoded tags
///
/// `DateTimeOriginal` wins over `DateTime`. Only the first present tag is
/// considered; a malformed value is an error, not a reason to fall back.
pub fn timestamp_from_tags(tags: &HashMap<String, String>) -> Result<DateTime<Local>, MediaError> {
    let (tag, value) = DATE_TAGS
        .iter()
        .find_map(|tag| tags.get(*tag).map(|value| (*tag, value)))
        .ok_or(MediaError::NoUsableTimestampField)?;

    let naive = parse_exif_datetime(value).ok_or_else(|| MediaError::MalformedTimestampField {
        tag: tag.to_string(),
        value: value.clone(),
    })?;

    Ok(naive_to_local(naive))
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim_matches(|c: char| c == '\0' || c == '"' || c.is_whitespace());
    NaiveDateTime::parse_from_str(s, EXIF_DATETIME_FORMAT).ok()
}

/// Interpret an EXIF wall-clock time in the local zone
fn naive_to_local(naive: NaiveDateTime) -> DateTime<Local> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(time) => time,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // skipped by a DST jump
        LocalResult::None => Local.from_utc_datetime(&naive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::jpeg_with_exif;
    use chrono::{Datelike, Timelike};

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2024:01:15 14:30:00").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 0);

        // Quotes and NUL padding from raw ASCII values
        assert!(parse_exif_datetime("\"2024:01:15 14:30:00\"").is_some());
        assert!(parse_exif_datetime("2024:01:15 14:30:00\0").is_some());

        assert!(parse_exif_datetime("2024-01-15 14:30:00").is_none());
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("invalid").is_none());
    }

    #[test]
    fn test_original_wins_over_datetime() {
        let t = timestamp_from_tags(&tags(&[
            ("DateTimeOriginal", "2019:05:06 07:08:09"),
            ("DateTime", "2021:01:01 00:00:00"),
        ]))
        .unwrap();
        assert_eq!(t.year(), 2019);
        assert_eq!((t.hour(), t.minute(), t.second()), (7, 8, 9));
    }

    #[test]
    fn test_falls_back_to_datetime() {
        let t = timestamp_from_tags(&tags(&[("DateTime", "2021:03:04 05:06:07")])).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2021, 3, 4));
    }

    #[test]
    fn test_no_usable_field() {
        let err = timestamp_from_tags(&tags(&[("Make", "Canon")])).unwrap_err();
        assert!(matches!(err, MediaError::NoUsableTimestampField));
    }

    #[test]
    fn test_malformed_field() {
        let err = timestamp_from_tags(&tags(&[
            ("DateTimeOriginal", "yesterday"),
            ("DateTime", "2021:03:04 05:06:07"),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, MediaError::MalformedTimestampField { ref tag, .. } if tag == "DateTimeOriginal")
        );
    }

    #[test]
    fn test_read_tags_from_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(
            &path,
            jpeg_with_exif(Some("2018:07:08 09:10:11"), Some("2022:02:02 02:02:02")),
        )
        .unwrap();

        let tags = read_exif_tags(&path).unwrap();
        assert_eq!(tags.get("DateTimeOriginal").unwrap(), "2018:07:08 09:10:11");
        assert_eq!(tags.get("DateTime").unwrap(), "2022:02:02 02:02:02");

        let t = extract_exif_time(&path).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2018, 7, 8));
        assert_eq!((t.hour(), t.minute(), t.second()), (9, 10, 11));
    }

    #[test]
    fn test_corrupt_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10];
        data.extend_from_slice(b"Exif\0\0garbage!!");
        std::fs::write(&path, data).unwrap();

        let err = extract_exif_time(&path).unwrap_err();
        assert!(matches!(err, MediaError::ExifUnreadable(_)));
    }
}
