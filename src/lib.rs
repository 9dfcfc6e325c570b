//! # exif-attrs
//!
//! EXIF metadata as a key/value store. Attribute sets move between this crate
//! and a metadata codec as compact length-prefixed strings, and a small set of
//! typed accessors turns raw tag values into orientation and white-balance
//! labels, GPS coordinates and timestamps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_attrs::codec::{CodecGuard, JpegCodec};
//! use exif_attrs::interface::ExifFile;
//!
//! fn main() -> anyhow::Result<()> {
//!     // One guard per process; clone it into every file handle
//!     let codec = CodecGuard::new(JpegCodec::new().with_backups(true));
//!
//!     let mut file = ExifFile::open("photo.jpg", codec.clone())?;
//!     println!("Camera: {:?}", file.attribute("Model"));
//!     println!("Orientation: {}", file.orientation_label());
//!     if let Some(pos) = file.lat_long() {
//!         println!("GPS: {:.6}, {:.6}", pos.latitude, pos.longitude);
//!     }
//!
//!     file.set_attribute("Artist", "Jane Doe");
//!     file.save_attributes()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Without a file
//!
//! The store and accessors work on wire strings alone:
//!
//! ```rust
//! use exif_attrs::accessors::orientation_label;
//! use exif_attrs::store::AttributeStore;
//!
//! let mut store = AttributeStore::new();
//! store.load("2 Orientation=1 6hasThumbnail=5 false").unwrap();
//! assert_eq!(orientation_label(&store), "Rotated 90 degrees");
//! assert!(!store.has_thumbnail());
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — wire format encode/decode
//! - [`store`] — [`AttributeStore`](store::AttributeStore)
//! - [`accessors`] — typed tag interpretation
//! - [`codec`] — the [`MetadataCodec`](codec::MetadataCodec) boundary, its lock, and the JPEG codec
//! - [`exif`] — JPEG EXIF reading and writing used by the JPEG codec
//! - [`interface`] — [`ExifFile`](interface::ExifFile), a store bound to a file
//! - [`config`] — configuration loading/saving
//! - [`pipeline`] — batch inspect/update used by the CLI

pub mod accessors;
pub mod codec;
pub mod config;
pub mod error;
pub mod exif;
pub mod interface;
pub mod pipeline;
pub mod protocol;
pub mod store;
