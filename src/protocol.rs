//! Attribute exchange format shared with the metadata codec.
//!
//! ```text
//! <count> <name>=<len> <value><name>=<len> <value>...
//! ```
//!
//! `count` and `len` are ASCII decimals. Values are taken by byte length,
//! so they may contain `=`, spaces or digits. Entries follow each other with
//! no separator.
//!
//! ```rust
//! use exif_attrs::protocol::{decode, encode};
//!
//! let entries = decode("2 Make=3 FOOModel=3 BAR").unwrap();
//! assert_eq!(entries[0], ("Make".to_string(), "FOO".to_string()));
//!
//! let wire = encode([("Model", "BAR")]);
//! assert_eq!(wire, "1 Model=3 BAR");
//! ```

use crate::error::ProtocolError;

/// Synthetic entry carrying the thumbnail-present flag. Never a real EXIF tag.
pub const RESERVED_THUMBNAIL_KEY: &str = "hasThumbnail";

/// Decode a wire string into `(name, value)` pairs, in wire order.
///
/// Bytes left over after `count` entries are ignored.
pub fn decode(wire: &str) -> Result<Vec<(String, String)>, ProtocolError> {
    let bytes = wire.as_bytes();

    let count_end = find(bytes, 0, b' ')
        .ok_or_else(|| ProtocolError::malformed(0, "missing space after entry count"))?;
    let count: usize = wire[..count_end]
        .parse()
        .map_err(|_| ProtocolError::malformed(0, format!("bad entry count {:?}", &wire[..count_end])))?;

    let mut cursor = count_end + 1;
    let mut entries = Vec::new();

    for index in 0..count {
        let eq = find(bytes, cursor, b'=').ok_or_else(|| {
            ProtocolError::malformed(cursor, format!("entry {index} of {count}: missing '='"))
        })?;
        let name = &wire[cursor..eq];
        cursor = eq + 1;

        let len_end = find(bytes, cursor, b' ').ok_or_else(|| {
            ProtocolError::malformed(cursor, format!("entry {name:?}: missing space after length"))
        })?;
        let len: usize = wire[cursor..len_end].parse().map_err(|_| {
            ProtocolError::malformed(
                cursor,
                format!("entry {name:?}: bad value length {:?}", &wire[cursor..len_end]),
            )
        })?;
        cursor = len_end + 1;

        let end = cursor
            .checked_add(len)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                ProtocolError::malformed(
                    cursor,
                    format!(
                        "entry {name:?}: value length {len} overruns input ({} bytes left)",
                        bytes.len() - cursor
                    ),
                )
            })?;
        let value = wire.get(cursor..end).ok_or_else(|| {
            ProtocolError::malformed(cursor, format!("entry {name:?}: value splits a character"))
        })?;
        cursor = end;

        entries.push((name.to_string(), value.to_string()));
    }

    Ok(entries)
}

/// Encode entries into a wire string, dropping [`RESERVED_THUMBNAIL_KEY`].
pub fn encode<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let entries: Vec<(&str, &str)> = entries
        .into_iter()
        .filter(|(name, _)| *name != RESERVED_THUMBNAIL_KEY)
        .collect();
    write_entries(&entries)
}

/// Encode entries the way a codec reports them on fetch: followed by the
/// synthetic [`RESERVED_THUMBNAIL_KEY`] entry.
pub fn encode_with_thumbnail<'a, I>(entries: I, has_thumbnail: bool) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let flag = if has_thumbnail { "true" } else { "false" };
    let mut entries: Vec<(&str, &str)> = entries
        .into_iter()
        .filter(|(name, _)| *name != RESERVED_THUMBNAIL_KEY)
        .collect();
    entries.push((RESERVED_THUMBNAIL_KEY, flag));
    write_entries(&entries)
}

fn write_entries(entries: &[(&str, &str)]) -> String {
    let mut wire = format!("{} ", entries.len());
    for (name, value) in entries {
        wire.push_str(name);
        wire.push('=');
        wire.push_str(&value.len().to_string());
        wire.push(' ');
        wire.push_str(value);
    }

    wire
}

fn find(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|b| *b == needle)
        .map(|pos| from + pos)
}
