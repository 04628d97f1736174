//! Ordered store-name → value mapping and its single-column JSON codec.
//!
//! A [`StoreMap`] is what a storable attribute holds: one value per store
//! (locale, channel, shop, ...). It is persisted as one JSON object inside the
//! attribute's raw slot.
//!
//! # Ordering
//!
//! Entries keep insertion order. Order is observable through
//! [`StoreMap::stores`] and drives "fallback to any store" (the first store
//! wins), but it does not participate in equality.
//!
//! # Empty-collection encoding
//!
//! An empty map encodes as `[]`, not `{}`, so columns written by other
//! producers of the same format round-trip byte-for-byte. Decoding accepts
//! both, plus `null`, and treats anything malformed as empty.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::Value;

/// Encoded form of an empty [`StoreMap`].
pub const EMPTY_ENCODED: &str = "[]";

/// Insertion-ordered mapping from store name to value.
#[derive(Debug, Clone, Default)]
pub struct StoreMap {
    entries: Vec<(String, Value)>,
}

impl StoreMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored for `store`, including empty values.
    #[must_use]
    pub fn get(&self, store: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == store)
            .map(|(_, value)| value)
    }

    /// Sets the value for `store`.
    ///
    /// Replacing an existing store keeps its position; a new store is
    /// appended. Returns the previous value, if any.
    pub fn insert(&mut self, store: impl Into<String>, value: Value) -> Option<Value> {
        let store = store.into();
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == store) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((store, value));
        None
    }

    /// Removes `store`, returning its value. Remaining entries keep their order.
    pub fn remove(&mut self, store: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(name, _)| name == store)?;
        Some(self.entries.remove(idx).1)
    }

    /// Returns `true` if `store` has an entry (empty or not).
    #[must_use]
    pub fn contains_store(&self, store: &str) -> bool {
        self.get(store).is_some()
    }

    /// Store names in insertion order.
    pub fn stores(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// First store in insertion order.
    #[must_use]
    pub fn first_store(&self) -> Option<&str> {
        self.entries.first().map(|(name, _)| name.as_str())
    }

    /// Iterates `(store, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of entries, including empty ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for StoreMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(store, value)| other.get(store) == Some(value))
    }
}

impl<K, V> FromIterator<(K, V)> for StoreMap
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = StoreMap::new();
        for (store, value) in iter {
            map.insert(store, value.into());
        }
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for StoreMap
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for StoreMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for StoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.entries.is_empty() {
            return serializer.serialize_seq(Some(0))?.end();
        }
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (store, value) in &self.entries {
            map.serialize_entry(store, value)?;
        }
        map.end()
    }
}

struct StoreMapVisitor;

impl<'de> Visitor<'de> for StoreMapVisitor {
    type Value = StoreMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of store values, an array, or null")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StoreMap, A::Error> {
        let mut map = StoreMap::new();
        while let Some((store, value)) = access.next_entry::<String, Value>()? {
            map.insert(store, value);
        }
        Ok(map)
    }

    // A list decodes with its indices as store names.
    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<StoreMap, A::Error> {
        let mut map = StoreMap::new();
        let mut idx = 0_usize;
        while let Some(value) = access.next_element::<Value>()? {
            map.insert(idx.to_string(), value);
            idx += 1;
        }
        Ok(map)
    }

    fn visit_unit<E: de::Error>(self) -> Result<StoreMap, E> {
        Ok(StoreMap::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<StoreMap, E> {
        Ok(StoreMap::new())
    }
}

impl<'de> Deserialize<'de> for StoreMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StoreMapVisitor)
    }
}

/// Decodes column text into a map. Never fails: empty, `null`, non-object
/// and malformed input all yield an empty map.
#[must_use]
pub fn decode(raw: Option<&str>) -> StoreMap {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return StoreMap::new();
    };
    match serde_json::from_str::<StoreMap>(text) {
        Ok(map) => map,
        Err(err) => {
            tracing::debug!(error = %err, "undecodable store column treated as empty");
            StoreMap::new()
        }
    }
}

/// Decodes a raw attribute slot. Only `Value::String` carries encoded content.
#[must_use]
pub fn decode_value(raw: Option<&Value>) -> StoreMap {
    decode(raw.and_then(Value::as_str))
}

/// Encodes a map as JSON in insertion order. An empty map encodes as `[]`.
#[must_use]
pub fn encode(map: &StoreMap) -> String {
    // Keys are strings and values are JSON-native, so serialization cannot fail.
    serde_json::to_string(map).unwrap_or_else(|_| EMPTY_ENCODED.to_string())
}

/// Read-time filter: drops `null` and `""` entries and, when `allowed_stores`
/// is given, every store not listed in it.
#[must_use]
pub fn filter<S: AsRef<str>>(map: &StoreMap, allowed_stores: Option<&[S]>) -> StoreMap {
    map.iter()
        .filter(|(_, value)| !value.is_empty())
        .filter(|(store, _)| {
            allowed_stores.is_none_or(|allowed| allowed.iter().any(|a| a.as_ref() == *store))
        })
        .map(|(store, value)| (store, value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample() -> StoreMap {
        StoreMap::from([("en", "Hello"), ("fr", "Bonjour")])
    }

    // ---- Decode ----

    #[test]
    fn decode_object_keeps_document_order() {
        let map = decode(Some(r#"{"nl":"hallo","en":"hello","kh":"សួរស្តី"}"#));
        assert_eq!(map.stores().collect::<Vec<_>>(), vec!["nl", "en", "kh"]);
        assert_eq!(map.get("kh"), Some(&Value::from("សួរស្តី")));
    }

    #[test]
    fn decode_empty_inputs_yield_empty_map() {
        assert!(decode(None).is_empty());
        assert!(decode(Some("")).is_empty());
        assert!(decode(Some("   ")).is_empty());
        assert!(decode(Some("[]")).is_empty());
        assert!(decode(Some("{}")).is_empty());
        assert!(decode(Some("null")).is_empty());
    }

    #[test]
    fn decode_malformed_input_yields_empty_map() {
        assert!(decode(Some("{not json")).is_empty());
        assert!(decode(Some("\"just a string\"")).is_empty());
        assert!(decode(Some("12")).is_empty());
    }

    #[test]
    fn decode_list_uses_indices_as_stores() {
        let map = decode(Some(r#"["a","b"]"#));
        assert_eq!(map.get("0"), Some(&Value::from("a")));
        assert_eq!(map.get("1"), Some(&Value::from("b")));
    }

    #[test]
    fn decode_value_ignores_non_string_slots() {
        assert!(decode_value(None).is_empty());
        assert!(decode_value(Some(&Value::Null)).is_empty());
        assert!(decode_value(Some(&Value::Int(3))).is_empty());
        let raw = Value::from(r#"{"en":"x"}"#);
        assert_eq!(decode_value(Some(&raw)).len(), 1);
    }

    // ---- Encode ----

    #[test]
    fn empty_map_encodes_as_empty_array() {
        assert_eq!(encode(&StoreMap::new()), "[]");
    }

    #[test]
    fn encode_follows_insertion_order() {
        let map = StoreMap::from([("fr", "Bonjour"), ("en", "Hello")]);
        assert_eq!(encode(&map), r#"{"fr":"Bonjour","en":"Hello"}"#);
    }

    #[test]
    fn encode_keeps_null_entries() {
        let map = StoreMap::from([("en", Value::from("x")), ("nl", Value::Null)]);
        assert_eq!(encode(&map), r#"{"en":"x","nl":null}"#);
    }

    // ---- Map behavior ----

    #[test]
    fn insert_existing_store_keeps_position() {
        let mut map = sample();
        let previous = map.insert("en", Value::from("Hi"));
        assert_eq!(previous, Some(Value::from("Hello")));
        assert_eq!(map.first_store(), Some("en"));
        assert_eq!(map.get("en"), Some(&Value::from("Hi")));
    }

    #[test]
    fn remove_keeps_order_of_remaining_entries() {
        let mut map = StoreMap::from([("a", "1"), ("b", "2"), ("c", "3")]);
        assert_eq!(map.remove("b"), Some(Value::from("2")));
        assert_eq!(map.stores().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(map.remove("missing"), None);
    }

    #[test]
    fn equality_ignores_order() {
        let a = StoreMap::from([("en", "Hello"), ("fr", "Bonjour")]);
        let b = StoreMap::from([("fr", "Bonjour"), ("en", "Hello")]);
        assert_eq!(a, b);
        assert_ne!(a, StoreMap::from([("en", "Hello")]));
    }

    // ---- Filter ----

    #[test]
    fn filter_drops_null_and_empty_but_keeps_zero() {
        let map = StoreMap::from([
            ("en", Value::from("x")),
            ("nl", Value::Null),
            ("de", Value::empty()),
            ("fr", Value::from("0")),
        ]);
        let filtered = filter::<&str>(&map, None);
        assert_eq!(filtered.stores().collect::<Vec<_>>(), vec!["en", "fr"]);
    }

    #[test]
    fn filter_restricts_to_allowed_stores() {
        let filtered = filter(&sample(), Some(&["en"][..]));
        assert_eq!(filtered, StoreMap::from([("en", "Hello")]));
    }

    #[test]
    fn filter_with_empty_allow_list_drops_everything() {
        let filtered = filter::<String>(&sample(), Some(&[][..]));
        assert!(filtered.is_empty());
    }

    // ---- Round-trip ----

    proptest! {
        #[test]
        fn decode_inverts_encode(
            entries in proptest::collection::vec(("[a-z]{1,5}", "[a-zA-Z0-9 ]{1,12}"), 0..8)
        ) {
            let map: StoreMap = entries.into_iter().collect();
            let decoded = decode(Some(&encode(&map)));
            prop_assert_eq!(&decoded, &map);
            prop_assert_eq!(
                decoded.stores().collect::<Vec<_>>(),
                map.stores().collect::<Vec<_>>()
            );
        }
    }
}
