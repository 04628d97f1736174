use crate::event::StoreChangeEvent;

/// Write-path notification for store value changes.
///
/// Implementations observe every successful `set_value` and may index or
/// broadcast the change. Called synchronously after the new value
/// is committed to the record's raw slot.
///
/// Used as `Arc<dyn StoreChangeObserver>`.
pub trait StoreChangeObserver: Send + Sync {
    /// Called once per written `(key, store)` value.
    fn on_store_value_set(&self, event: &StoreChangeEvent<'_>);
}
