//! Storable Store — persistence for storable records.
//!
//! Records are kept as [`StoredRow`]s: the model name plus the raw attribute
//! bag, `MsgPack`-encoded. Storable fields travel as their encoded column
//! text, so a reloaded record resolves exactly as the saved one did.
//!
//! - [`StorageEngine`]: low-level key-value storage for rows
//! - [`HashMapStorage`]: in-memory engine backed by `DashMap`
//! - [`RecordRepository`]: `save` / `find` / `fresh` / `delete` for records

pub mod engine;
pub mod engines;
pub mod error;
pub mod repository;
pub mod row;

pub use engine::StorageEngine;
pub use engines::HashMapStorage;
pub use error::RepositoryError;
pub use repository::RecordRepository;
pub use row::{StorageValue, StoredRow};
