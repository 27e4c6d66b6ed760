//! Synthetic media fixtures shared by unit tests

use crate::time::video::APPLE_EPOCH_OFFSET;

/// Minimal JPEG: SOI, one APP1 Exif segment, EOI
///
/// `datetime` goes into IFD0 (tag 0x0132), `original` into an Exif sub-IFD
/// (tag 0x9003). Values must be at least 4 characters so they are stored
/// out of line.
pub(crate) fn jpeg_with_exif(original: Option<&str>, datetime: Option<&str>) -> Vec<u8> {
    let tiff = tiff_with_dates(original, datetime);

    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn tiff_with_dates(original: Option<&str>, datetime: Option<&str>) -> Vec<u8> {
    let ifd0_entries = usize::from(datetime.is_some()) + usize::from(original.is_some());
    let ifd0_start = 8usize;
    let ifd0_end = ifd0_start + 2 + 12 * ifd0_entries + 4;
    let exif_ifd_start = ifd0_end;
    let exif_ifd_end = if original.is_some() {
        exif_ifd_start + 2 + 12 + 4
    } else {
        exif_ifd_start
    };

    let ascii = |s: &str| {
        assert!(s.len() >= 4, "short values would be stored inline");
        let mut v = s.as_bytes().to_vec();
        v.push(0);
        v
    };
    let datetime_bytes = datetime.map(ascii);
    let original_bytes = original.map(ascii);

    let datetime_offset = exif_ifd_end;
    let original_offset = datetime_offset + datetime_bytes.as_ref().map_or(0, Vec::len);

    let mut out = Vec::new();
    out.extend_from_slice(b"MM\0\x2A");
    out.extend_from_slice(&(ifd0_start as u32).to_be_bytes());

    // IFD0, entries in ascending tag order
    out.extend_from_slice(&(ifd0_entries as u16).to_be_bytes());
    if let Some(bytes) = &datetime_bytes {
        push_entry(&mut out, 0x0132, 2, bytes.len() as u32, datetime_offset as u32);
    }
    if original.is_some() {
        push_entry(&mut out, 0x8769, 4, 1, exif_ifd_start as u32);
    }
    out.extend_from_slice(&0u32.to_be_bytes());

    if let Some(bytes) = &original_bytes {
        out.extend_from_slice(&1u16.to_be_bytes());
        push_entry(&mut out, 0x9003, 2, bytes.len() as u32, original_offset as u32);
        out.extend_from_slice(&0u32.to_be_bytes());
    }

    if let Some(bytes) = &datetime_bytes {
        out.extend_from_slice(bytes);
    }
    if let Some(bytes) = &original_bytes {
        out.extend_from_slice(bytes);
    }
    out
}

fn push_entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(&kind.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&value.to_be_bytes());
}

/// Minimal QuickTime file whose movie header carries `unix` as creation time
pub(crate) fn movie_with_creation(unix: i64) -> Vec<u8> {
    let atom = |kind: &[u8; 4], payload: &[u8]| {
        let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    };

    let mut mvhd = vec![0, 0, 0, 0];
    mvhd.extend_from_slice(&((unix + APPLE_EPOCH_OFFSET) as u32).to_be_bytes());
    mvhd.extend_from_slice(&[0u8; 92]);

    let mut data = atom(b"ftyp", b"qt  \0\0\0\0");
    data.extend(atom(b"wide", &[]));
    data.extend(atom(b"moov", &atom(b"mvhd", &mvhd)));
    data
}
