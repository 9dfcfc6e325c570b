use anyhow::{Context as _, Result};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use kamadak_exif::experimental::Writer;
use kamadak_exif::{Field, In, Reader, Tag, Value};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::tags;

/// Result of writing attributes into an image.
#[derive(Debug, Default)]
pub struct WriteResult {
    /// Tags written into the EXIF block.
    pub written: Vec<String>,
    /// Tags left out because they are unknown or their value does not fit.
    pub skipped: Vec<String>,
    /// Where the original was copied before rewriting, if backups are on.
    pub backup_path: Option<PathBuf>,
}

/// Fields and thumbnail already present in an image's EXIF block.
#[derive(Default)]
struct ExistingExif {
    fields: Vec<Field>,
    thumbnail: Option<Vec<u8>>,
    little_endian: bool,
}

/// Write the full attribute set into a JPEG's EXIF segment.
///
/// Existing EXIF fields are kept and the given tags replace them; the IFD1
/// thumbnail and all other JPEG segments are preserved.
pub fn write_attributes(
    path: &Path,
    entries: &[(String, String)],
    backup_originals: bool,
) -> Result<WriteResult> {
    let mut result = WriteResult::default();

    let mut new_fields: Vec<Field> = Vec::new();
    for (name, value) in entries {
        let field = tags::lookup(name).and_then(|spec| {
            Some(Field {
                tag: spec.tag(),
                ifd_num: In::PRIMARY,
                value: spec.format.to_value(value)?,
            })
        });
        match field {
            Some(field) => {
                log::debug!("  {name}: {value}");
                new_fields.retain(|f| f.tag != field.tag);
                new_fields.push(field);
                result.written.push(name.clone());
            }
            None => {
                log::warn!("Skipping tag {name}={value:?}: not writable");
                result.skipped.push(name.clone());
            }
        }
    }

    let file_bytes = std::fs::read(path).context("Failed to read image file")?;

    // Parse JPEG structure with img-parts (preserves all segments)
    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;

    // Remember where the EXIF segment was originally positioned
    let orig_exif_pos = find_exif_segment_pos(&jpeg);

    let existing = jpeg
        .exif()
        .map(|tiff| load_existing_exif(&tiff))
        .unwrap_or_default();

    let kept: Vec<&Field> = existing
        .fields
        .iter()
        .filter(|f| {
            !(f.ifd_num == In::PRIMARY && new_fields.iter().any(|n| n.tag == f.tag))
        })
        .collect();

    let mut writer = Writer::new();
    for field in kept.iter().copied().chain(new_fields.iter()) {
        writer.push_field(field);
    }
    let has_primary = kept.iter().any(|f| f.ifd_num == In::PRIMARY) || !new_fields.is_empty();
    if !has_primary {
        log::info!("No EXIF attributes to write to {}", path.display());
        return Ok(result);
    }
    if let Some(ref thumbnail) = existing.thumbnail {
        writer.set_jpeg(thumbnail, In::THUMBNAIL);
    }

    let mut tiff = Cursor::new(Vec::new());
    writer
        .write(&mut tiff, existing.little_endian)
        .context("Failed to encode EXIF block")?;
    jpeg.set_exif(Some(Bytes::from(tiff.into_inner())));

    // set_exif() inserts at position 3; move the segment back where it was
    // so EXIF stays ahead of XMP.
    if let Some(new_pos) = find_exif_segment_pos(&jpeg) {
        let target_pos = orig_exif_pos.unwrap_or(1); // default: right after APP0
        if target_pos < new_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    if backup_originals {
        result.backup_path = Some(backup_file(path)?);
    }

    let output = jpeg.encoder().bytes();
    std::fs::write(path, &output).context("Failed to write JPEG file")?;
    log::info!(
        "Wrote {} tag(s) to {}",
        result.written.len(),
        path.display()
    );

    Ok(result)
}

/// Parse the current EXIF block. Fields that cannot be decoded are dropped.
fn load_existing_exif(tiff: &[u8]) -> ExistingExif {
    let exif = match Reader::new()
        .continue_on_error(true)
        .read_raw(tiff.to_vec())
        .or_else(|e| {
            e.distill_partial_result(|errors| {
                log::debug!("Ignoring {} unreadable EXIF field(s)", errors.len());
            })
        }) {
        Ok(exif) => exif,
        Err(e) => {
            log::warn!("Existing EXIF data is unreadable and will be replaced: {e}");
            return ExistingExif::default();
        }
    };

    let thumbnail = thumbnail_bytes(&exif);
    // values of unknown type cannot be re-encoded
    let fields = exif
        .fields()
        .filter(|f| !matches!(f.value, Value::Unknown(..)))
        .filter(|f| {
            f.ifd_num == In::PRIMARY || (f.ifd_num == In::THUMBNAIL && thumbnail.is_some())
        })
        .cloned()
        .collect::<Vec<_>>();
    log::debug!("Loaded {} existing EXIF field(s)", fields.len());

    ExistingExif {
        fields,
        thumbnail,
        little_endian: exif.little_endian(),
    }
}

fn thumbnail_bytes(exif: &kamadak_exif::Exif) -> Option<Vec<u8>> {
    let uint = |tag| {
        exif.get_field(tag, In::THUMBNAIL)
            .and_then(|f| f.value.get_uint(0))
            .map(|n| n as usize)
    };
    let offset = uint(Tag::JPEGInterchangeFormat)?;
    let length = uint(Tag::JPEGInterchangeFormatLength)?;
    if length == 0 {
        return None;
    }
    exif.buf()
        .get(offset..offset.checked_add(length)?)
        .map(<[u8]>::to_vec)
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Copy `photo.jpg` to `photo.jpg.bak` once; later saves keep the first backup.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::info!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}
