use std::collections::BTreeMap;

use crate::error::ProtocolError;
use crate::protocol::{self, RESERVED_THUMBNAIL_KEY};

/// In-memory EXIF attributes: tag name → raw string value, plus the
/// thumbnail-present flag carried through the wire format.
///
/// Values are stored exactly as the codec delivered them. Use the functions
/// in [`accessors`](crate::accessors) for typed interpretation.
///
/// # Example
///
/// ```rust
/// use exif_attrs::store::AttributeStore;
///
/// let mut store = AttributeStore::new();
/// store.load("3 Make=3 FOOhasThumbnail=4 TRUEModel=3 BAR").unwrap();
///
/// assert_eq!(store.get("Make"), Some("FOO"));
/// assert_eq!(store.get("hasThumbnail"), None);
/// assert!(store.has_thumbnail());
///
/// store.set("Model", "BAZ");
/// assert_eq!(store.save(), "2 Make=3 FOOModel=3 BAZ");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    attributes: BTreeMap<String, String>,
    has_thumbnail: bool,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole store with the contents of a wire string.
    ///
    /// The string is fully decoded before anything is replaced, so on error
    /// the previous contents are kept.
    pub fn load(&mut self, wire: &str) -> Result<(), ProtocolError> {
        let entries = protocol::decode(wire)?;

        let mut attributes = BTreeMap::new();
        let mut has_thumbnail = false;
        for (name, value) in entries {
            if name == RESERVED_THUMBNAIL_KEY {
                has_thumbnail = value.eq_ignore_ascii_case("true");
            } else {
                attributes.insert(name, value);
            }
        }

        log::debug!(
            "Loaded {} attribute(s), thumbnail: {has_thumbnail}",
            attributes.len()
        );
        self.attributes = attributes;
        self.has_thumbnail = has_thumbnail;
        Ok(())
    }

    /// The raw value of `tag`, or `None` if the tag is not present.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.attributes.get(tag).map(String::as_str)
    }

    /// Insert or overwrite `tag`. Any name and value are accepted except the
    /// reserved thumbnail key, which is ignored.
    pub fn set(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        let tag = tag.into();
        if tag == RESERVED_THUMBNAIL_KEY {
            log::warn!("Ignoring write to reserved attribute {RESERVED_THUMBNAIL_KEY}");
            return;
        }
        self.attributes.insert(tag, value.into());
    }

    /// Encode every current attribute into a wire string.
    pub fn save(&self) -> String {
        protocol::encode(self.iter())
    }

    /// Whether the most recent successful [`load`](Self::load) reported a thumbnail.
    pub fn has_thumbnail(&self) -> bool {
        self.has_thumbnail
    }

    /// Iterate over `(tag, value)` pairs in tag-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_is_empty() {
        let store = AttributeStore::new();
        assert!(store.is_empty());
        assert!(!store.has_thumbnail());
        assert_eq!(store.save(), "0 ");
    }

    #[test]
    fn load_then_get() {
        let mut store = AttributeStore::new();
        store.load("2 Make=3 FOOModel=3 BAR").unwrap();
        assert_eq!(store.get("Make"), Some("FOO"));
        assert_eq!(store.get("Model"), Some("BAR"));
        assert_eq!(store.get("Orientation"), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn save_decodes_to_same_mapping() {
        let mut store = AttributeStore::new();
        store.load("2 Model=3 BARMake=3 FOO").unwrap();

        let mut reloaded = AttributeStore::new();
        reloaded.load(&store.save()).unwrap();
        assert_eq!(reloaded, store);
    }

    // ── thumbnail flag ───────────────────────────────────────────────

    #[test]
    fn thumbnail_flag_is_split_out() {
        let mut store = AttributeStore::new();
        store.load("2 hasThumbnail=4 trueMake=3 FOO").unwrap();
        assert!(store.has_thumbnail());
        assert_eq!(store.get("hasThumbnail"), None);
        assert_eq!(store.len(), 1);
        assert!(!store.save().contains("hasThumbnail"));
    }

    #[test]
    fn thumbnail_flag_case_insensitive() {
        let mut store = AttributeStore::new();
        store.load("1 hasThumbnail=4 TrUe").unwrap();
        assert!(store.has_thumbnail());
    }

    #[test]
    fn thumbnail_flag_false_for_other_values() {
        let mut store = AttributeStore::new();
        store.load("1 hasThumbnail=3 yes").unwrap();
        assert!(!store.has_thumbnail());
    }

    #[test]
    fn reload_resets_thumbnail_flag() {
        let mut store = AttributeStore::new();
        store.load("1 hasThumbnail=4 true").unwrap();
        store.load("1 Make=3 FOO").unwrap();
        assert!(!store.has_thumbnail());
    }

    #[test]
    fn set_reserved_key_is_ignored() {
        let mut store = AttributeStore::new();
        store.set("hasThumbnail", "true");
        assert_eq!(store.get("hasThumbnail"), None);
        assert!(!store.has_thumbnail());
        assert_eq!(store.save(), "0 ");
    }

    // ── load semantics ───────────────────────────────────────────────

    #[test]
    fn load_replaces_previous_contents() {
        let mut store = AttributeStore::new();
        store.load("1 Make=3 FOO").unwrap();
        store.set("Artist", "me");
        store.load("1 Model=3 BAR").unwrap();
        assert_eq!(store.get("Make"), None);
        assert_eq!(store.get("Artist"), None);
        assert_eq!(store.get("Model"), Some("BAR"));
    }

    #[test]
    fn failed_load_keeps_previous_contents() {
        let mut store = AttributeStore::new();
        store.load("2 hasThumbnail=4 trueMake=3 FOO").unwrap();

        let err = store.load("2 A=3 xyzB=10 short").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { .. }));
        assert_eq!(store.get("Make"), Some("FOO"));
        assert_eq!(store.get("A"), None);
        assert!(store.has_thumbnail());
    }

    #[test]
    fn duplicate_names_last_write_wins() {
        let mut store = AttributeStore::new();
        store.load("2 Make=1 AMake=1 B").unwrap();
        assert_eq!(store.get("Make"), Some("B"));
        assert_eq!(store.len(), 1);
    }

    // ── set ──────────────────────────────────────────────────────────

    #[test]
    fn set_inserts_and_overwrites() {
        let mut store = AttributeStore::new();
        store.set("Make", "FOO");
        store.set("Make", "BAR");
        store.set("", "anything goes");
        assert_eq!(store.get("Make"), Some("BAR"));
        assert_eq!(store.get(""), Some("anything goes"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn save_emits_full_mapping() {
        let mut store = AttributeStore::new();
        store.load("1 Make=3 FOO").unwrap();
        store.set("Orientation", "6");
        assert_eq!(store.save(), "2 Make=3 FOOOrientation=1 6");
    }
}
