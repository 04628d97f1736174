use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{FallbackPolicy, MissingKeyCallback, StorableConfig};
use crate::event::CompositeStoreChangeObserver;
use crate::traits::StoreChangeObserver;

/// Shared context threaded into every [`StorableRecord`](crate::StorableRecord):
/// the resolution settings and the change-event sink.
///
/// Cloning is cheap and every clone sees the same state. Settings may be
/// changed at any time; each read consults them at call time.
#[derive(Clone, Default)]
pub struct Storable {
    inner: Arc<StorableInner>,
}

#[derive(Default)]
struct StorableInner {
    config: RwLock<StorableConfig>,
    observers: CompositeStoreChangeObserver,
}

impl Storable {
    /// Creates a context with the given settings and no observers.
    #[must_use]
    pub fn new(config: StorableConfig) -> Self {
        Self {
            inner: Arc::new(StorableInner {
                config: RwLock::new(config),
                observers: CompositeStoreChangeObserver::default(),
            }),
        }
    }

    /// Replaces the fallback policy.
    pub fn fallback(&self, policy: FallbackPolicy) -> &Self {
        self.inner.config.write().fallback = policy;
        self
    }

    /// Sets the store used by records without a selected store.
    pub fn set_default_store(&self, store: impl Into<String>) -> &Self {
        self.inner.config.write().default_store = store.into();
        self
    }

    /// Sets the application-wide fallback store.
    pub fn set_app_fallback_store(&self, store: Option<String>) -> &Self {
        self.inner.config.write().app_fallback_store = store;
        self
    }

    /// Snapshot of the current settings.
    #[must_use]
    pub fn config(&self) -> StorableConfig {
        self.inner.config.read().clone()
    }

    /// The store used by records without a selected store.
    #[must_use]
    pub fn default_store(&self) -> String {
        self.inner.config.read().default_store.clone()
    }

    /// The configured missing-key callback, if any.
    #[must_use]
    pub fn missing_key_callback(&self) -> Option<MissingKeyCallback> {
        self.inner.config.read().fallback.missing_key_callback.clone()
    }

    /// Registers an observer for store change events.
    pub fn subscribe(&self, observer: Arc<dyn StoreChangeObserver>) -> &Self {
        self.inner.observers.add(observer);
        self
    }

    /// The event sink records publish to.
    #[must_use]
    pub fn observer(&self) -> &CompositeStoreChangeObserver {
        &self.inner.observers
    }
}

impl fmt::Debug for Storable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storable")
            .field("config", &*self.inner.config.read())
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_settings() {
        let storable = Storable::default();
        let clone = storable.clone();

        clone.set_default_store("fr");
        assert_eq!(storable.default_store(), "fr");

        clone.fallback(FallbackPolicy::new().with_fallback_any(true));
        assert!(storable.config().fallback.fallback_any);
    }

    #[test]
    fn fallback_replaces_whole_policy() {
        let storable = Storable::default();
        storable.fallback(
            FallbackPolicy::new()
                .with_fallback_store("en")
                .with_missing_key_callback(|_| Ok(None)),
        );
        assert!(storable.missing_key_callback().is_some());

        storable.fallback(FallbackPolicy::new().with_fallback_any(true));
        let config = storable.config();
        assert_eq!(config.fallback.fallback_store, None);
        assert!(config.fallback.fallback_any);
        assert!(storable.missing_key_callback().is_none());
    }

    #[test]
    fn app_fallback_store_is_settable() {
        let storable = Storable::default();
        storable.set_app_fallback_store(Some("nl".to_string()));
        assert_eq!(storable.config().fallback_store(), Some("nl"));
    }

    #[test]
    fn subscribe_registers_observer() {
        let storable = Storable::default();
        assert!(storable.observer().is_empty());
        storable.subscribe(Arc::new(crate::event::TracingObserver));
        assert_eq!(storable.observer().len(), 1);
    }
}
