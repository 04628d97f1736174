//! In-memory [`StorageEngine`] implementation backed by [`DashMap`].
//!
//! Provides concurrent read/write access without external locking. Suitable
//! for tests and for workloads where every row fits in memory.

use dashmap::DashMap;

use crate::engine::StorageEngine;
use crate::row::StoredRow;

/// In-memory storage backed by [`DashMap`].
pub struct HashMapStorage {
    rows: DashMap<String, StoredRow>,
}

impl HashMapStorage {
    /// Creates a new, empty `HashMapStorage`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }
}

impl Default for HashMapStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for HashMapStorage {
    fn put(&self, id: &str, row: StoredRow) -> Option<StoredRow> {
        self.rows.insert(id.to_string(), row)
    }

    fn get(&self, id: &str) -> Option<StoredRow> {
        self.rows.get(id).map(|r| r.clone())
    }

    fn remove(&self, id: &str) -> Option<StoredRow> {
        self.rows.remove(id).map(|(_, r)| r)
    }

    fn contains_key(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn clear(&self) {
        self.rows.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.rows.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::StorageValue;

    fn make_row(model: &str) -> StoredRow {
        StoredRow {
            model: model.to_string(),
            data: StorageValue { data: vec![0x80] },
        }
    }

    #[test]
    fn put_get_remove_round_trip() {
        let storage = HashMapStorage::new();

        assert!(storage.put("id1", make_row("posts")).is_none());

        let fetched = storage.get("id1");
        assert_eq!(fetched.map(|r| r.model), Some("posts".to_string()));

        let removed = storage.remove("id1");
        assert!(removed.is_some());
        assert!(storage.get("id1").is_none());
    }

    #[test]
    fn put_replaces_and_returns_previous() {
        let storage = HashMapStorage::new();
        storage.put("id1", make_row("posts"));

        let previous = storage.put("id1", make_row("pages"));

        assert_eq!(previous.map(|r| r.model), Some("posts".to_string()));
        assert_eq!(storage.get("id1").map(|r| r.model), Some("pages".to_string()));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn contains_key_reflects_state() {
        let storage = HashMapStorage::new();

        assert!(!storage.contains_key("id1"));

        storage.put("id1", make_row("posts"));
        assert!(storage.contains_key("id1"));

        storage.remove("id1");
        assert!(!storage.contains_key("id1"));
    }

    #[test]
    fn len_and_is_empty() {
        let storage = HashMapStorage::new();

        assert!(storage.is_empty());
        assert_eq!(storage.len(), 0);

        storage.put("a", make_row("posts"));
        assert!(!storage.is_empty());
        assert_eq!(storage.len(), 1);

        storage.put("b", make_row("posts"));
        assert_eq!(storage.len(), 2);

        storage.remove("a");
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn clear_empties_storage() {
        let storage = HashMapStorage::new();

        storage.put("a", make_row("posts"));
        storage.put("b", make_row("posts"));
        storage.put("c", make_row("posts"));
        assert_eq!(storage.len(), 3);

        storage.clear();
        assert!(storage.is_empty());
    }

    #[test]
    fn keys_returns_all_ids() {
        let storage = HashMapStorage::new();
        storage.put("a", make_row("posts"));
        storage.put("b", make_row("posts"));
        storage.put("c", make_row("posts"));

        let mut keys = storage.keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
