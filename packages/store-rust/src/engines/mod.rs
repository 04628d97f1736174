//! [`StorageEngine`](crate::StorageEngine) implementations.

pub mod hashmap;

pub use hashmap::HashMapStorage;
