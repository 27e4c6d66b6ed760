//! QuickTime/MP4 creation time extraction
//!
//! A single forward pass over the top-level atoms: skip everything until the
//! movie resource atom (`moov`), then inspect its first child. Only the movie
//! header (`mvhd`) carries the creation time we want; every other atom is
//! opaque and skipped by its size field.

use crate::error::MediaError;
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01
pub const APPLE_EPOCH_OFFSET: i64 = 2_082_844_800;

const MOVIE_RESOURCE: [u8; 4] = *b"moov";
const MOVIE_HEADER: [u8; 4] = *b"mvhd";
const COMPRESSED_MOVIE: [u8; 4] = *b"cmov";
const REFERENCE_MOVIE: [u8; 4] = *b"rmra";

/// Size of a compact atom header: u32 size + 4-byte type
const HEADER_LEN: u64 = 8;

/// An atom header as read off the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AtomHeader {
    /// Declared size, 0 means "extends to end of stream"
    size: u64,
    /// Number of header bytes consumed (8, or 16 with a 64-bit size)
    header_len: u64,
    kind: [u8; 4],
}

impl AtomHeader {
    fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// Extract the creation time of a movie file
pub fn extract_video_time(path: &Path) -> Result<DateTime<Local>, MediaError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let time = read_creation_time(&mut reader)?;
    debug!(?path, %time, "Extracted creation time from movie header");
    Ok(time)
}

/// Walk the atoms of a container and return the movie creation time
pub fn read_creation_time<R: Read + Seek>(reader: &mut R) -> Result<DateTime<Local>, MediaError> {
    loop {
        let header = read_header(reader)?;
        if header.kind == MOVIE_RESOURCE {
            break;
        }
        trace!(atom = %header.kind_str(), size = header.size, "Skipping atom");
        skip_payload(reader, &header)?;
    }

    let child = read_header(reader)?;
    match child.kind {
        MOVIE_HEADER => read_movie_header(reader),
        COMPRESSED_MOVIE => Err(MediaError::UnsupportedCompressedContainer),
        REFERENCE_MOVIE => Err(MediaError::UnsupportedReferenceContainer),
        _ => Err(MediaError::MovieHeaderNotFound(child.kind_str())),
    }
}

fn read_header<R: Read>(reader: &mut R) -> Result<AtomHeader, MediaError> {
    let mut buf = [0u8; 8];
    read_window(reader, &mut buf)?;

    let size = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let kind = [buf[4], buf[5], buf[6], buf[7]];

    if size == 1 {
        let mut large = [0u8; 8];
        read_window(reader, &mut large)?;
        return Ok(AtomHeader {
            size: u64::from_be_bytes(large),
            header_len: 16,
            kind,
        });
    }

    Ok(AtomHeader {
        size: u64::from(size),
        header_len: HEADER_LEN,
        kind,
    })
}

fn skip_payload<R: Seek>(reader: &mut R, header: &AtomHeader) -> Result<(), MediaError> {
    if header.size == 0 {
        return Err(MediaError::UnreadableContainer(format!(
            "atom '{}' runs to end of file before any moov atom",
            header.kind_str()
        )));
    }

    let distance = header
        .size
        .checked_sub(header.header_len)
        .and_then(|d| i64::try_from(d).ok())
        .ok_or_else(|| {
            MediaError::UnreadableContainer(format!(
                "implausible size {} for atom '{}'",
                header.size,
                header.kind_str()
            ))
        })?;

    reader
        .seek(SeekFrom::Current(distance))
        .map_err(|e| MediaError::UnreadableContainer(e.to_string()))?;
    Ok(())
}

/// Read the creation time from an `mvhd` payload
///
/// Layout: version (1 byte), flags (3 bytes), then creation time as u32
/// (version 0) or u64 (version 1), in seconds since 1904.
fn read_movie_header<R: Read>(reader: &mut R) -> Result<DateTime<Local>, MediaError> {
    let mut version_flags = [0u8; 4];
    read_window(reader, &mut version_flags)?;

    let seconds = if version_flags[0] == 1 {
        let mut buf = [0u8; 8];
        read_window(reader, &mut buf)?;
        u64::from_be_bytes(buf)
    } else {
        let mut buf = [0u8; 4];
        read_window(reader, &mut buf)?;
        u64::from(u32::from_be_bytes(buf))
    };

    // A zero field is an unset header, not a capture in 1904; the file is
    // left alone instead of being renamed to the epoch.
    if seconds == 0 {
        return Err(MediaError::UnsetCreationTime);
    }

    apple_seconds_to_local(seconds)
}

/// Convert seconds since 1904-01-01 UTC into local time
pub fn apple_seconds_to_local(seconds: u64) -> Result<DateTime<Local>, MediaError> {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| s.checked_sub(APPLE_EPOCH_OFFSET))
        .and_then(|unix| DateTime::from_timestamp(unix, 0))
        .map(|utc| utc.with_timezone(&Local))
        .ok_or_else(|| {
            MediaError::UnreadableContainer(format!("creation time {seconds} out of range"))
        })
}

fn read_window<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), MediaError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            MediaError::UnreadableContainer("unexpected end of stream".into())
        }
        _ => MediaError::UnreadableContainer(e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;

    fn atom(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((payload.len() as u32 + 8).to_be_bytes()));
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    }

    fn mvhd_v0(creation: u32) -> Vec<u8> {
        let mut payload = vec![0, 0, 0, 0];
        payload.extend_from_slice(&creation.to_be_bytes());
        payload.extend_from_slice(&creation.to_be_bytes()); // modification time
        payload.extend_from_slice(&[0u8; 88]);
        atom(b"mvhd", &payload)
    }

    fn movie(children: &[u8]) -> Vec<u8> {
        let mut data = atom(b"ftyp", b"qt  \0\0\0\0qt  ");
        data.extend(atom(b"free", &[0u8; 37]));
        data.extend(atom(b"moov", children));
        data
    }

    fn expected(unix: i64) -> DateTime<Local> {
        Local.timestamp_opt(unix, 0).unwrap()
    }

    #[test]
    fn test_reads_mvhd_creation_time() {
        // 2020-01-01 00:00:00 UTC
        let unix = 1_577_836_800i64;
        let creation = (unix + APPLE_EPOCH_OFFSET) as u32;
        let data = movie(&mvhd_v0(creation));

        let time = read_creation_time(&mut Cursor::new(data)).unwrap();
        assert_eq!(time, expected(unix));
    }

    #[test]
    fn test_reads_mvhd_version_one() {
        let unix = 1_700_000_000i64;
        let mut payload = vec![1, 0, 0, 0];
        payload.extend_from_slice(&((unix + APPLE_EPOCH_OFFSET) as u64).to_be_bytes());
        payload.extend_from_slice(&[0u8; 100]);
        let data = movie(&atom(b"mvhd", &payload));

        let time = read_creation_time(&mut Cursor::new(data)).unwrap();
        assert_eq!(time, expected(unix));
    }

    #[test]
    fn test_skips_large_size_atom() {
        let unix = 1_600_000_000i64;
        let mut data = Vec::new();
        // mdat with a 64-bit size: 1, "mdat", u64 size = 16 header + 24 payload
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&40u64.to_be_bytes());
        data.extend_from_slice(&[0xAB; 24]);
        data.extend(atom(b"moov", &mvhd_v0((unix + APPLE_EPOCH_OFFSET) as u32)));

        let time = read_creation_time(&mut Cursor::new(data)).unwrap();
        assert_eq!(time, expected(unix));
    }

    #[test]
    fn test_compressed_movie_is_rejected() {
        let data = movie(&atom(b"cmov", &[0u8; 16]));
        let err = read_creation_time(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedCompressedContainer));
    }

    #[test]
    fn test_reference_movie_is_rejected() {
        let data = movie(&atom(b"rmra", &[0u8; 16]));
        let err = read_creation_time(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedReferenceContainer));
    }

    #[test]
    fn test_other_first_child() {
        let data = movie(&atom(b"udta", &[0u8; 16]));
        let err = read_creation_time(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MediaError::MovieHeaderNotFound(ref kind) if kind == "udta"));
    }

    #[test]
    fn test_truncated_stream() {
        let mut data = movie(&mvhd_v0(3_000_000_000));
        data.truncate(data.len() - 100);
        let err = read_creation_time(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MediaError::UnreadableContainer(_)));

        let err = read_creation_time(&mut Cursor::new(vec![0u8, 0, 0])).unwrap_err();
        assert!(matches!(err, MediaError::UnreadableContainer(_)));
    }

    #[test]
    fn test_missing_moov() {
        let data = atom(b"ftyp", b"isom\0\0\0\0");
        let err = read_creation_time(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MediaError::UnreadableContainer(_)));
    }

    #[test]
    fn test_implausible_size() {
        let mut data = Vec::new();
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(b"junk");
        data.extend(atom(b"moov", &mvhd_v0(3_000_000_000)));
        let err = read_creation_time(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MediaError::UnreadableContainer(_)));
    }

    #[test]
    fn test_unset_creation_time() {
        let data = movie(&mvhd_v0(0));
        let err = read_creation_time(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MediaError::UnsetCreationTime));
    }

    #[test]
    fn test_extract_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        let unix = 1_500_000_000i64;
        std::fs::write(&path, movie(&mvhd_v0((unix + APPLE_EPOCH_OFFSET) as u32))).unwrap();

        assert_eq!(extract_video_time(&path).unwrap(), expected(unix));
    }
}
