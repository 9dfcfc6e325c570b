use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::accessors::LatLong;
use crate::codec::CodecGuard;
use crate::config::Config;
use crate::interface::ExifFile;

/// Extensions handled by [`JpegCodec`](crate::codec::JpegCodec).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Attributes and typed values of one image, plus what happened to it.
#[derive(Debug, Default)]
pub struct ImageReport {
    pub path: PathBuf,
    pub attributes: BTreeMap<String, String>,
    pub has_thumbnail: bool,
    pub orientation: String,
    pub white_balance: String,
    pub lat_long: Option<LatLong>,
    /// Milliseconds since the Unix epoch.
    pub date_time: Option<i64>,
    /// Tags changed by [`update_image`].
    pub updated: Vec<String>,
    /// The wire string a dry run would have committed.
    pub pending_wire: Option<String>,
    pub error: Option<String>,
}

impl ImageReport {
    fn failed(path: &Path, error: String) -> Self {
        Self {
            path: path.to_path_buf(),
            error: Some(error),
            ..Default::default()
        }
    }

    fn fill_from(&mut self, file: &ExifFile) {
        self.attributes = file
            .store()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.has_thumbnail = file.has_thumbnail();
        self.orientation = file.orientation_label().to_string();
        self.white_balance = file.white_balance_label().to_string();
        self.lat_long = file.lat_long();
        self.date_time = file.date_time();
    }
}

/// Collect JPEG files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks).
///
/// # Example
///
/// ```rust,no_run
/// use exif_attrs::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("photo.jpg"),       // single file
///     PathBuf::from("./photos/"),        // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Split a `Tag=Value` assignment. The value may be empty or contain `=`.
pub fn parse_assignment(s: &str) -> Result<(String, String)> {
    let (tag, value) = s
        .split_once('=')
        .with_context(|| format!("Expected TAG=VALUE, got {s:?}"))?;
    if tag.is_empty() {
        anyhow::bail!("Empty tag name in {s:?}");
    }
    Ok((tag.to_string(), value.to_string()))
}

/// Read an image's attributes and typed values.
pub fn inspect_image(path: &Path, codec: &CodecGuard) -> ImageReport {
    match ExifFile::open(path, codec.clone()) {
        Ok(file) => {
            let mut report = ImageReport {
                path: path.to_path_buf(),
                ..Default::default()
            };
            report.fill_from(&file);
            report
        }
        Err(e) => ImageReport::failed(path, format!("Failed to read attributes: {e}")),
    }
}

/// Apply `edits` to an image and save.
///
/// With `config.output.dry_run` nothing is written; the report carries the
/// wire string that would have been committed.
pub fn update_image(
    path: &Path,
    codec: &CodecGuard,
    edits: &[(String, String)],
    config: &Config,
) -> ImageReport {
    let mut file = match ExifFile::open(path, codec.clone()) {
        Ok(file) => file,
        Err(e) => return ImageReport::failed(path, format!("Failed to read attributes: {e}")),
    };

    let mut report = ImageReport {
        path: path.to_path_buf(),
        ..Default::default()
    };
    for (tag, value) in edits {
        if file.attribute(tag) != Some(value.as_str()) {
            report.updated.push(tag.clone());
        }
        file.set_attribute(tag.as_str(), value.as_str());
    }

    if config.output.dry_run {
        report.pending_wire = Some(file.store().save());
    } else if !report.updated.is_empty() {
        if let Err(e) = file.save_attributes() {
            report.fill_from(&file);
            report.error = Some(format!("Failed to save attributes: {e}"));
            return report;
        }
        // show what the codec actually kept
        if let Err(e) = file.reload() {
            report.error = Some(format!("Failed to re-read attributes: {e}"));
        }
    }

    report.fill_from(&file);
    report
}
