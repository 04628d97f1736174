//! Storable Core — store-scoped attribute values with fallback resolution.
//!
//! A storable field keeps one value per store (a locale or a sales channel)
//! in a single JSON-encoded column. Reads resolve the value for the current
//! store, falling back according to a shared [`FallbackPolicy`]; writes go
//! through optional per-field mutators and publish a [`StoreChangeEvent`].

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod record;
pub mod schema;
pub mod store_map;
pub mod traits;
pub mod types;

pub use config::{FallbackPolicy, MissingKey, MissingKeyCallback, StorableConfig};
pub use context::Storable;
pub use error::StorableError;
pub use event::{CompositeStoreChangeObserver, StoreChangeEvent, TracingObserver};
pub use record::{Attribute, Attributes, StorableRecord};
pub use schema::{GetMutator, ModelSchema, ModelSchemaBuilder, SetMutator};
pub use store_map::StoreMap;
pub use traits::StoreChangeObserver;
pub use types::Value;
