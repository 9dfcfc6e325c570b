use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use nom_exif::*;
use std::io::Cursor;
use std::path::Path;

use super::tags::{TAGS, TagGroup};
use crate::accessors::EXIF_DATETIME_FORMAT;

// IFD1 thumbnail pointer tags
const TAG_JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
const TAG_JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;

/// Attributes extracted from an image, before wire encoding.
#[derive(Debug, Clone, Default)]
pub struct ExifAttributes {
    pub entries: Vec<(String, String)>,
    pub has_thumbnail: bool,
}

/// Parsed EXIF of one file, with the raw TIFF block thumbnails point into.
struct ParsedExif {
    exif: Exif,
    gps: Option<GPSInfo>,
    tiff: Bytes,
}

impl ParsedExif {
    /// The IFD1 JPEG thumbnail, if the offsets point inside the TIFF block.
    fn thumbnail(&self) -> Option<&[u8]> {
        let offset = self.ifd1_uint(TAG_JPEG_INTERCHANGE_FORMAT)?;
        let length = self.ifd1_uint(TAG_JPEG_INTERCHANGE_FORMAT_LENGTH)?;
        if length == 0 {
            return None;
        }
        self.tiff.get(offset..offset.checked_add(length)?)
    }

    fn ifd1_uint(&self, tag: u16) -> Option<usize> {
        let value = self.exif.get_by_ifd_tag_code(1, tag)?;
        value
            .as_u32()
            .map(|n| n as usize)
            .or_else(|| value.as_u16().map(usize::from))
    }
}

/// Read every tag in the tag table from a JPEG file.
///
/// A file without EXIF yields an empty set.
pub fn read_attributes(path: &Path) -> Result<ExifAttributes> {
    let Some(parsed) = parse_exif(path)? else {
        return Ok(ExifAttributes::default());
    };

    let mut attrs = ExifAttributes {
        has_thumbnail: parsed.thumbnail().is_some(),
        ..Default::default()
    };

    for spec in TAGS.iter().filter(|spec| spec.group != TagGroup::Gps) {
        if let Some(value) = parsed
            .exif
            .get_by_ifd_tag_code(0, spec.id)
            .and_then(entry_to_string)
        {
            attrs.entries.push((spec.name.to_string(), value));
        }
    }

    if let Some(gps) = parsed.gps {
        if gps.latitude_ref != '\0' {
            attrs
                .entries
                .push(("GPSLatitudeRef".to_string(), gps.latitude_ref.to_string()));
        }
        attrs
            .entries
            .push(("GPSLatitude".to_string(), latlng_to_rationals(&gps.latitude)));
        if gps.longitude_ref != '\0' {
            attrs
                .entries
                .push(("GPSLongitudeRef".to_string(), gps.longitude_ref.to_string()));
        }
        attrs
            .entries
            .push(("GPSLongitude".to_string(), latlng_to_rationals(&gps.longitude)));
    }

    log::debug!(
        "Read {} attribute(s) from {}",
        attrs.entries.len(),
        path.display()
    );
    Ok(attrs)
}

/// Read the IFD1 JPEG thumbnail embedded in a JPEG file, if any.
pub fn read_thumbnail(path: &Path) -> Result<Option<Vec<u8>>> {
    Ok(parse_exif(path)?.and_then(|parsed| parsed.thumbnail().map(<[u8]>::to_vec)))
}

/// Read the file once and parse its EXIF segment. `None` if it has none.
fn parse_exif(path: &Path) -> Result<Option<ParsedExif>> {
    let file_bytes = Bytes::from(std::fs::read(path).context("Failed to read image file")?);
    let jpeg = Jpeg::from_bytes(file_bytes.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;
    let Some(tiff) = jpeg.exif() else {
        log::debug!("No EXIF segment in {}", path.display());
        return Ok(None);
    };

    let mut parser = MediaParser::new();
    let ms = MediaSource::seekable(Cursor::new(file_bytes)).context("Failed to open image data")?;
    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(e) => {
            log::debug!("Unreadable EXIF data in {}: {e}", path.display());
            return Ok(None);
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps = iter.parse_gps_info().ok().flatten();
    Ok(Some(ParsedExif {
        exif: iter.into(),
        gps,
        tiff,
    }))
}

/// Convert an EntryValue to the textual form used on the wire.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"');
    if s.is_empty() { None } else { Some(normalize_value(s)) }
}

/// Undo nom-exif's display decorations: `"175/100 (1.7500)"` becomes
/// `"175/100"`, and parsed timestamps go back to EXIF's layout.
fn normalize_value(s: &str) -> String {
    if let Some((rational, _)) = s.split_once(" (") {
        if is_rational(rational) {
            return rational.to_string();
        }
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return t.format(EXIF_DATETIME_FORMAT).to_string();
    }
    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, layout) {
            return t.format(EXIF_DATETIME_FORMAT).to_string();
        }
    }
    s.to_string()
}

fn is_rational(s: &str) -> bool {
    s.split_once('/').is_some_and(|(num, den)| {
        let digits = |part: &str| {
            let part = part.strip_prefix('-').unwrap_or(part);
            !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
        };
        digits(num) && digits(den)
    })
}

/// Format a nom-exif LatLng (3 URationals: deg, min, sec) as `"d/1,m/1,s/100"`.
fn latlng_to_rationals(latlng: &LatLng) -> String {
    format!(
        "{}/{},{}/{},{}/{}",
        latlng.0.0, latlng.0.1, latlng.1.0, latlng.1.1, latlng.2.0, latlng.2.1
    )
}
