use std::path::{Path, PathBuf};

use crate::accessors::{self, LatLong};
use crate::codec::CodecGuard;
use crate::error::ExifError;
use crate::store::AttributeStore;

/// EXIF attributes of one image file, read and written through a shared codec.
///
/// # Example
///
/// ```rust,no_run
/// use exif_attrs::codec::{CodecGuard, JpegCodec};
/// use exif_attrs::interface::ExifFile;
///
/// # fn main() -> Result<(), exif_attrs::error::ExifError> {
/// let codec = CodecGuard::new(JpegCodec::new());
///
/// let mut file = ExifFile::open("photo.jpg", codec.clone())?;
/// println!("Orientation: {}", file.orientation_label());
///
/// file.set_attribute("Artist", "Jane Doe");
/// file.save_attributes()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExifFile {
    path: PathBuf,
    codec: CodecGuard,
    store: AttributeStore,
}

impl ExifFile {
    /// Read all attributes of `path`.
    pub fn open(path: impl Into<PathBuf>, codec: CodecGuard) -> Result<Self, ExifError> {
        let mut file = Self {
            path: path.into(),
            codec,
            store: AttributeStore::new(),
        };
        file.reload()?;
        Ok(file)
    }

    /// Discard in-memory changes and read the attributes again.
    pub fn reload(&mut self) -> Result<(), ExifError> {
        let wire = self.codec.with(|c| c.fetch_attributes(&self.path))?;
        self.store.load(&wire)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn attribute(&self, tag: &str) -> Option<&str> {
        self.store.get(tag)
    }

    pub fn set_attribute(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.store.set(tag, value);
    }

    /// Write every attribute back to the file.
    ///
    /// Rewrites the whole file, so batch [`set_attribute`](Self::set_attribute)
    /// calls and save once.
    pub fn save_attributes(&self) -> Result<(), ExifError> {
        let wire = self.store.save();
        self.codec.with(|c| {
            c.store_attributes(&self.path, &wire)?;
            c.commit(&self.path)
        })?;
        log::debug!("Saved {} attribute(s) to {}", self.store.len(), self.path.display());
        Ok(())
    }

    pub fn has_thumbnail(&self) -> bool {
        self.store.has_thumbnail()
    }

    /// The embedded thumbnail, or `None` if the file has none.
    pub fn thumbnail(&self) -> Result<Option<Vec<u8>>, ExifError> {
        Ok(self.codec.with(|c| c.fetch_thumbnail(&self.path))?)
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }

    pub fn orientation_label(&self) -> &'static str {
        accessors::orientation_label(&self.store)
    }

    pub fn white_balance_label(&self) -> &'static str {
        accessors::white_balance_label(&self.store)
    }

    pub fn lat_long(&self) -> Option<LatLong> {
        accessors::lat_long(&self.store)
    }

    /// Milliseconds since the epoch, or `None` if unavailable.
    pub fn date_time(&self) -> Option<i64> {
        accessors::date_time(&self.store)
    }
}
