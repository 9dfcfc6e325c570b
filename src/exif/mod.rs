//! JPEG EXIF reading and writing behind [`JpegCodec`](crate::codec::JpegCodec).
//!
//! - [`read_attributes`] — nom-exif extraction of the tags in [`tags::TAGS`]
//! - [`read_thumbnail`] — the IFD1 JPEG thumbnail, if present
//! - [`write_attributes`] — kamadak-exif + img-parts rewrite of the APP1 EXIF segment

mod reader;
pub mod tags;
mod writer;

pub use reader::{ExifAttributes, read_attributes, read_thumbnail};
pub use writer::{WriteResult, backup_file, write_attributes};

#[cfg(test)]
pub(crate) use writer::fixtures;
