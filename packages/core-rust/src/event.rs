//! Store change events and observer fan-out.
//!
//! Defines [`StoreChangeEvent`], emitted by
//! [`StorableRecord::set_value`](crate::StorableRecord::set_value), and
//! [`CompositeStoreChangeObserver`] which fans a single event out to every
//! registered [`StoreChangeObserver`].

use std::sync::Arc;

use parking_lot::RwLock;

use crate::record::StorableRecord;
use crate::traits::StoreChangeObserver;
use crate::types::Value;

/// A store value was written.
///
/// Borrowed from the record for the duration of dispatch; observers that need
/// to keep it must copy what they need.
#[derive(Debug, Clone, Copy)]
pub struct StoreChangeEvent<'a> {
    /// The record that was written.
    pub record: &'a StorableRecord,
    /// Storable field name.
    pub key: &'a str,
    /// Store the value was written to.
    pub store: &'a str,
    /// Value before the write (`""` when the store had none).
    pub old_value: &'a Value,
    /// Value after the write, after any set mutator ran.
    pub new_value: &'a Value,
}

/// Composite observer that fans out to multiple observers.
///
/// Observers may be added at any time through a shared reference. Each event
/// is delivered to a snapshot of the registered observers, in registration
/// order, so an observer that subscribes another observer does not deadlock.
#[derive(Default)]
pub struct CompositeStoreChangeObserver {
    observers: RwLock<Vec<Arc<dyn StoreChangeObserver>>>,
}

impl CompositeStoreChangeObserver {
    /// Creates a composite observer with the given list of observers.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn StoreChangeObserver>>) -> Self {
        Self {
            observers: RwLock::new(observers),
        }
    }

    /// Adds an observer after construction.
    pub fn add(&self, observer: Arc<dyn StoreChangeObserver>) {
        self.observers.write().push(observer);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns `true` if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}

impl StoreChangeObserver for CompositeStoreChangeObserver {
    fn on_store_value_set(&self, event: &StoreChangeEvent<'_>) {
        let observers = self.observers.read().clone();
        for observer in &observers {
            observer.on_store_value_set(event);
        }
    }
}

/// Observer that logs every change at `debug` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StoreChangeObserver for TracingObserver {
    fn on_store_value_set(&self, event: &StoreChangeEvent<'_>) {
        tracing::debug!(
            model = %event.record.model(),
            id = ?event.record.id(),
            key = %event.key,
            store = %event.store,
            old_value = %event.old_value,
            new_value = %event.new_value,
            "store value set"
        );
    }
}
