//! Error types for the attribute protocol and the external codec boundary.
//!
//! Missing tags are not errors: [`AttributeStore::get`](crate::store::AttributeStore::get)
//! returns `None`, and the typed accessors degrade to their "unavailable" values.

use thiserror::Error;

/// The wire string does not follow the `<count> <name>=<len> <value>...` grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Bad count, missing `=` or length delimiter, or a value running past the input.
    #[error("malformed attribute string at byte {offset}: {reason}")]
    Malformed {
        /// Byte offset into the wire string where parsing gave up.
        offset: usize,
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            reason: reason.into(),
        }
    }
}

/// Failures reported by a [`MetadataCodec`](crate::codec::MetadataCodec).
#[derive(Debug, Error)]
pub enum CodecError {
    /// Reading or writing the underlying file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The codec rejected the data it was handed (bad wire string, unparseable image).
    #[error("codec format error: {0}")]
    Format(String),

    /// `commit` was called for a path with no staged attributes.
    #[error("no staged attributes for {0}")]
    NothingStaged(String),

    /// Any other backend failure, with its context chain.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Top-level error for file-bound operations.
#[derive(Debug, Error)]
pub enum ExifError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
