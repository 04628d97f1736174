//! Low-level storage engine trait.
//!
//! Defines [`StorageEngine`], the innermost persistence layer. Implementations
//! map record ids to [`StoredRow`]s.

use crate::row::StoredRow;

/// Typed key-value storage for persisted rows.
///
/// All operations are synchronous and take `&self`, so an engine can be
/// shared as `Arc<dyn StorageEngine>`.
pub trait StorageEngine: Send + Sync + 'static {
    /// Insert or replace a row by id. Returns the previous row if any.
    fn put(&self, id: &str, row: StoredRow) -> Option<StoredRow>;

    /// Retrieve a row by id, or `None` if not present.
    fn get(&self, id: &str) -> Option<StoredRow>;

    /// Remove a row by id, returning the removed row.
    fn remove(&self, id: &str) -> Option<StoredRow>;

    /// Check if an id exists without returning the row.
    fn contains_key(&self, id: &str) -> bool;

    /// Return the number of rows.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Remove all rows.
    fn clear(&self);

    /// Point-in-time snapshot of all ids, in no particular order.
    fn keys(&self) -> Vec<String>;
}
