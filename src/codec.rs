use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::CodecError;
use crate::exif;
use crate::protocol;

/// The external metadata codec: the only component that touches image files.
///
/// Attribute sets cross this boundary as wire strings (see
/// [`protocol`](crate::protocol)). Implementations may keep state between
/// calls (staged writes, parser buffers), so every call goes through a
/// [`CodecGuard`].
pub trait MetadataCodec: Send {
    /// Read a file's EXIF data as a wire string, including the
    /// `hasThumbnail` entry.
    fn fetch_attributes(&mut self, path: &Path) -> Result<String, CodecError>;
    /// Stage a wire-encoded attribute set for `path`.
    fn store_attributes(&mut self, path: &Path, wire: &str) -> Result<(), CodecError>;
    /// Apply staged attributes to the file on disk.
    fn commit(&mut self, path: &Path) -> Result<(), CodecError>;
    fn fetch_thumbnail(&mut self, path: &Path) -> Result<Option<Vec<u8>>, CodecError>;
}

/// Exclusive access to one codec, shared by every handle that clones it.
///
/// At most one codec call is in flight at a time across all clones.
///
/// ```rust
/// use exif_attrs::codec::{CodecGuard, JpegCodec};
///
/// let guard = CodecGuard::new(JpegCodec::new());
/// let shared = guard.clone(); // same lock, same codec
/// # drop(shared);
/// ```
#[derive(Clone)]
pub struct CodecGuard {
    codec: Arc<Mutex<Box<dyn MetadataCodec>>>,
}

impl CodecGuard {
    pub fn new<C: MetadataCodec + 'static>(codec: C) -> Self {
        Self {
            codec: Arc::new(Mutex::new(Box::new(codec))),
        }
    }

    /// Run `f` with the codec locked. The lock is released when `f` returns,
    /// whether it succeeded or not.
    pub fn with<T, F>(&self, f: F) -> Result<T, CodecError>
    where
        F: FnOnce(&mut dyn MetadataCodec) -> Result<T, CodecError>,
    {
        // A panic in another caller leaves the codec itself intact
        let mut codec = self.codec.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **codec)
    }
}

impl fmt::Debug for CodecGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecGuard")
            .field("handles", &Arc::strong_count(&self.codec))
            .finish()
    }
}

/// [`MetadataCodec`] for JPEG files.
///
/// Reads with nom-exif, writes with kamadak-exif and img-parts. Writes are
/// staged per path by [`store_attributes`](MetadataCodec::store_attributes)
/// and applied by [`commit`](MetadataCodec::commit).
#[derive(Debug, Default)]
pub struct JpegCodec {
    staged: HashMap<PathBuf, Vec<(String, String)>>,
    backup_originals: bool,
}

impl JpegCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy each file to `<name>.<ext>.bak` before its first rewrite.
    pub fn with_backups(mut self, backup_originals: bool) -> Self {
        self.backup_originals = backup_originals;
        self
    }
}

impl MetadataCodec for JpegCodec {
    fn fetch_attributes(&mut self, path: &Path) -> Result<String, CodecError> {
        let attrs = exif::read_attributes(path)?;
        Ok(protocol::encode_with_thumbnail(
            attrs
                .entries
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
            attrs.has_thumbnail,
        ))
    }

    fn store_attributes(&mut self, path: &Path, wire: &str) -> Result<(), CodecError> {
        let entries = protocol::decode(wire).map_err(|e| CodecError::Format(e.to_string()))?;
        log::debug!("Staged {} attribute(s) for {}", entries.len(), path.display());
        self.staged.insert(path.to_path_buf(), entries);
        Ok(())
    }

    fn commit(&mut self, path: &Path) -> Result<(), CodecError> {
        let entries = self
            .staged
            .remove(path)
            .ok_or_else(|| CodecError::NothingStaged(path.display().to_string()))?;
        let result = exif::write_attributes(path, &entries, self.backup_originals)?;
        log::debug!("Committed to {}: {}", path.display(), result.written.join(", "));
        if !result.skipped.is_empty() {
            log::info!("Not written: {}", result.skipped.join(", "));
        }
        if let Some(backup) = result.backup_path {
            log::debug!("Original kept at {}", backup.display());
        }
        Ok(())
    }

    fn fetch_thumbnail(&mut self, path: &Path) -> Result<Option<Vec<u8>>, CodecError> {
        Ok(exif::read_thumbnail(path)?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory codec: files are wire strings keyed by path.
    #[derive(Default)]
    pub(crate) struct MemoryCodec {
        pub files: Arc<Mutex<HashMap<PathBuf, String>>>,
        pub staged: HashMap<PathBuf, String>,
        pub thumbnails: HashMap<PathBuf, Vec<u8>>,
    }

    impl MetadataCodec for MemoryCodec {
        fn fetch_attributes(&mut self, path: &Path) -> Result<String, CodecError> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound).into())
        }

        fn store_attributes(&mut self, path: &Path, wire: &str) -> Result<(), CodecError> {
            self.staged.insert(path.to_path_buf(), wire.to_string());
            Ok(())
        }

        fn commit(&mut self, path: &Path) -> Result<(), CodecError> {
            let wire = self
                .staged
                .remove(path)
                .ok_or_else(|| CodecError::NothingStaged(path.display().to_string()))?;
            self.files.lock().unwrap().insert(path.to_path_buf(), wire);
            Ok(())
        }

        fn fetch_thumbnail(&mut self, path: &Path) -> Result<Option<Vec<u8>>, CodecError> {
            Ok(self.thumbnails.get(path).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::fixtures::{PLAIN_JPEG, jpeg_with_thumbnail};
    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Codec that records how many calls overlap.
    struct OverlapCodec {
        in_flight: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl OverlapCodec {
        fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl MetadataCodec for OverlapCodec {
        fn fetch_attributes(&mut self, _path: &Path) -> Result<String, CodecError> {
            self.enter();
            Ok("0 ".to_string())
        }

        fn store_attributes(&mut self, _path: &Path, _wire: &str) -> Result<(), CodecError> {
            self.enter();
            Ok(())
        }

        fn commit(&mut self, _path: &Path) -> Result<(), CodecError> {
            self.enter();
            Err(CodecError::Format("commit refused".into()))
        }

        fn fetch_thumbnail(&mut self, _path: &Path) -> Result<Option<Vec<u8>>, CodecError> {
            self.enter();
            Ok(None)
        }
    }

    fn overlap_guard() -> (CodecGuard, Arc<AtomicUsize>) {
        let max_seen = Arc::new(AtomicUsize::new(0));
        let guard = CodecGuard::new(OverlapCodec {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_seen: max_seen.clone(),
        });
        (guard, max_seen)
    }

    // ── CodecGuard ───────────────────────────────────────────────────

    #[test]
    fn guard_serializes_calls_across_clones() {
        let (guard, max_seen) = overlap_guard();
        let path = Path::new("a.jpg");

        thread::scope(|s| {
            for i in 0..8 {
                let guard = guard.clone();
                s.spawn(move || {
                    for _ in 0..5 {
                        let _ = match i % 4 {
                            0 => guard.with(|c| c.fetch_attributes(path)).map(drop),
                            1 => guard.with(|c| c.store_attributes(path, "0 ")),
                            2 => guard.with(|c| c.commit(path)),
                            _ => guard.with(|c| c.fetch_thumbnail(path)).map(drop),
                        };
                    }
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_released_after_error() {
        let (guard, _) = overlap_guard();
        let path = Path::new("a.jpg");
        assert!(guard.with(|c| c.commit(path)).is_err());
        assert_eq!(guard.with(|c| c.fetch_attributes(path)).unwrap(), "0 ");
    }

    #[test]
    fn guard_survives_panicking_caller() {
        let (guard, _) = overlap_guard();
        let cloned = guard.clone();
        let joined = thread::spawn(move || {
            let _: Result<(), CodecError> = cloned.with(|_| panic!("caller bug"));
        })
        .join();
        assert!(joined.is_err());
        assert!(guard.with(|c| c.fetch_thumbnail(Path::new("a.jpg"))).is_ok());
    }

    #[test]
    fn guard_debug_counts_handles() {
        let (guard, _) = overlap_guard();
        let _other = guard.clone();
        assert!(format!("{guard:?}").contains("handles: 2"));
    }

    // ── JpegCodec staging ────────────────────────────────────────────

    #[test]
    fn jpeg_codec_rejects_malformed_wire() {
        let mut codec = JpegCodec::new();
        let err = codec
            .store_attributes(Path::new("a.jpg"), "abc Make=3 FOO")
            .unwrap_err();
        assert!(matches!(err, CodecError::Format(_)));
    }

    #[test]
    fn jpeg_codec_commit_without_staging() {
        let mut codec = JpegCodec::new();
        let err = codec.commit(Path::new("a.jpg")).unwrap_err();
        assert!(matches!(err, CodecError::NothingStaged(_)));
    }

    #[test]
    fn jpeg_codec_commit_consumes_staged_set() {
        let mut codec = JpegCodec::new();
        let path = Path::new("/nonexistent/a.jpg");
        codec.store_attributes(path, "1 Make=3 FOO").unwrap();
        // the write fails on the missing file, but the staged set is used up
        assert!(matches!(codec.commit(path), Err(CodecError::Backend(_))));
        assert!(matches!(codec.commit(path), Err(CodecError::NothingStaged(_))));
    }

    #[test]
    fn jpeg_codec_fetch_missing_file() {
        let mut codec = JpegCodec::new();
        assert!(codec.fetch_attributes(Path::new("/nonexistent/a.jpg")).is_err());
        assert!(codec.fetch_thumbnail(Path::new("/nonexistent/a.jpg")).is_err());
    }

    // ── JpegCodec on real files ──────────────────────────────────────

    #[test]
    fn jpeg_codec_commit_then_fetch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, PLAIN_JPEG).unwrap();
        let mut codec = JpegCodec::new().with_backups(true);

        assert_eq!(codec.fetch_attributes(&path).unwrap(), "1 hasThumbnail=5 false");

        let mut staged = BTreeMap::new();
        for (name, value) in [
            ("Make", "Canon"),
            ("Model", "EOS 5D"),
            ("Orientation", "8"),
            ("DateTime", "2007:04:15 14:30:00"),
            ("WhiteBalance", "1"),
            ("ExposureTime", "1/200"),
            ("Flash", "16"),
            ("GPSLatitudeRef", "S"),
            ("GPSLatitude", "33/1,51/1,3540/100"),
            ("GPSLongitudeRef", "E"),
            ("GPSLongitude", "151/1,12/1,3000/100"),
        ] {
            staged.insert(name.to_string(), value.to_string());
        }
        let wire = protocol::encode(staged.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        codec.store_attributes(&path, &wire).unwrap();
        codec.commit(&path).unwrap();

        let fetched = protocol::decode(&codec.fetch_attributes(&path).unwrap()).unwrap();
        let mut fetched: BTreeMap<String, String> = fetched.into_iter().collect();
        assert_eq!(fetched.remove("hasThumbnail").as_deref(), Some("false"));
        assert_eq!(fetched, staged);

        let backup = dir.path().join("photo.jpg.bak");
        assert_eq!(fs::read(backup).unwrap(), PLAIN_JPEG);
    }

    #[test]
    fn jpeg_codec_keeps_thumbnail_across_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg_with_thumbnail("Canon", PLAIN_JPEG)).unwrap();
        let mut codec = JpegCodec::new();

        assert_eq!(
            codec.fetch_attributes(&path).unwrap(),
            "2 Make=5 CanonhasThumbnail=4 true"
        );

        codec.store_attributes(&path, "1 Artist=3 Zoe").unwrap();
        codec.commit(&path).unwrap();

        assert_eq!(codec.fetch_thumbnail(&path).unwrap().as_deref(), Some(PLAIN_JPEG));
        let fetched = protocol::decode(&codec.fetch_attributes(&path).unwrap()).unwrap();
        let fetched: BTreeMap<String, String> = fetched.into_iter().collect();
        assert_eq!(fetched["Make"], "Canon");
        assert_eq!(fetched["Artist"], "Zoe");
        assert_eq!(fetched["hasThumbnail"], "true");
        assert!(!dir.path().join("photo.jpg.bak").exists());
    }
}
