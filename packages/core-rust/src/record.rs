//! Records with store-scoped attributes.
//!
//! A [`StorableRecord`] keeps a raw attribute bag. Storable fields hold an
//! encoded [`StoreMap`] in their slot; reads resolve one value out of it for
//! the requested store (with fallback), writes update one store's entry and
//! publish a [`StoreChangeEvent`].
//!
//! # Resolution order
//!
//! For a read of `(key, store)` with fallback enabled:
//!
//! 1. `store` itself, if it has a non-empty value
//! 2. the configured fallback store, if it has one
//! 3. with `fallback_any`, the first store (in insertion order) that has one
//! 4. otherwise `store`, which yields `""`
//!
//! Whenever the effective store differs from the requested one, the
//! missing-key callback may substitute a string. The field's get mutator, if
//! any, is applied last.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::MissingKey;
use crate::context::Storable;
use crate::error::StorableError;
use crate::event::StoreChangeEvent;
use crate::schema::ModelSchema;
use crate::store_map::{self, StoreMap};
use crate::traits::StoreChangeObserver;
use crate::types::Value;

/// Raw attribute bag: field name to column value.
pub type Attributes = BTreeMap<String, Value>;

/// Incoming value for [`StorableRecord::set_attribute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// A single value, written to the current store of a storable field.
    Value(Value),
    /// Values for several stores at once.
    Stores(StoreMap),
}

impl From<Value> for Attribute {
    fn from(value: Value) -> Self {
        Attribute::Value(value)
    }
}

impl From<StoreMap> for Attribute {
    fn from(map: StoreMap) -> Self {
        Attribute::Stores(map)
    }
}

impl From<&str> for Attribute {
    fn from(s: &str) -> Self {
        Attribute::Value(Value::from(s))
    }
}

impl From<String> for Attribute {
    fn from(s: String) -> Self {
        Attribute::Value(Value::from(s))
    }
}

impl From<i64> for Attribute {
    fn from(i: i64) -> Self {
        Attribute::Value(Value::Int(i))
    }
}

impl From<bool> for Attribute {
    fn from(b: bool) -> Self {
        Attribute::Value(Value::Bool(b))
    }
}

/// A record whose storable fields hold one value per store.
#[derive(Debug, Clone)]
pub struct StorableRecord {
    schema: Arc<ModelSchema>,
    storable: Storable,
    attributes: Attributes,
    selected_store: Option<String>,
    id: Option<String>,
}

impl StorableRecord {
    /// Creates an empty record of the given model.
    #[must_use]
    pub fn new(schema: Arc<ModelSchema>, storable: Storable) -> Self {
        Self {
            schema,
            storable,
            attributes: Attributes::new(),
            selected_store: None,
            id: None,
        }
    }

    /// Creates an empty record with `store` already selected.
    #[must_use]
    pub fn using_store(
        schema: Arc<ModelSchema>,
        storable: Storable,
        store: impl Into<String>,
    ) -> Self {
        let mut record = Self::new(schema, storable);
        record.set_store(store);
        record
    }

    /// The model definition.
    #[must_use]
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Model name.
    #[must_use]
    pub fn model(&self) -> &str {
        self.schema.name()
    }

    /// The shared settings and event sink.
    #[must_use]
    pub fn context(&self) -> &Storable {
        &self.storable
    }

    /// Persisted identifier, once saved.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Assigns the persisted identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    // ---- Store selector ----

    /// Selects the store used by [`get_attribute`](Self::get_attribute) and
    /// scalar [`set_attribute`](Self::set_attribute).
    pub fn set_store(&mut self, store: impl Into<String>) -> &mut Self {
        self.selected_store = Some(store.into());
        self
    }

    /// The selected store, or the configured default store when none (or an
    /// empty one) is selected.
    #[must_use]
    pub fn current_store(&self) -> String {
        match self.selected_store.as_deref() {
            Some(store) if !store.is_empty() => store.to_string(),
            _ => self.storable.default_store(),
        }
    }

    // ---- Raw slots ----

    /// The raw value in `key`'s slot.
    #[must_use]
    pub fn raw_attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Writes `key`'s raw slot without any interception.
    pub fn set_raw_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Clears `key`'s raw slot.
    pub fn forget_raw_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// All raw slots.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Replaces all raw slots, e.g. after loading from storage.
    pub fn replace_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    // ---- Resolution ----

    /// Returns `true` if `key` is one of the model's storable fields.
    #[must_use]
    pub fn is_storable(&self, key: &str) -> bool {
        self.schema.is_storable(key)
    }

    /// The model's storable fields in declaration order.
    #[must_use]
    pub fn storable_fields(&self) -> &[String] {
        self.schema.storable_fields()
    }

    fn guard(&self, key: &str) -> Result<(), StorableError> {
        if self.is_storable(key) {
            Ok(())
        } else {
            Err(StorableError::not_storable(key, self.storable_fields()))
        }
    }

    /// Filtered map for `key`. Callers have already guarded `key`.
    fn stored_values(&self, key: &str) -> StoreMap {
        let raw = store_map::decode_value(self.attributes.get(key));
        store_map::filter::<&str>(&raw, None)
    }

    /// The non-empty values of `key`, optionally restricted to `allowed_stores`.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn get_values<S: AsRef<str>>(
        &self,
        key: &str,
        allowed_stores: Option<&[S]>,
    ) -> Result<StoreMap, StorableError> {
        self.guard(key)?;
        let raw = store_map::decode_value(self.attributes.get(key));
        Ok(store_map::filter(&raw, allowed_stores))
    }

    /// [`get_values`](Self::get_values) for every storable field, in
    /// declaration order.
    #[must_use]
    pub fn get_all_values<S: AsRef<str>>(
        &self,
        allowed_stores: Option<&[S]>,
    ) -> Vec<(String, StoreMap)> {
        self.storable_fields()
            .iter()
            .map(|key| {
                let raw = store_map::decode_value(self.attributes.get(key));
                (key.clone(), store_map::filter(&raw, allowed_stores))
            })
            .collect()
    }

    /// Every storable field with all of its non-empty values.
    #[must_use]
    pub fn translations(&self) -> Vec<(String, StoreMap)> {
        self.get_all_values::<&str>(None)
    }

    /// Stores holding a non-empty value for `key`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn list_stores_with_value(&self, key: &str) -> Result<Vec<String>, StorableError> {
        self.guard(key)?;
        Ok(self.stored_values(key).stores().map(str::to_string).collect())
    }

    /// Returns `true` if `store` (or the current store) has a value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn has_value(&self, key: &str, store: Option<&str>) -> Result<bool, StorableError> {
        self.guard(key)?;
        let store = store.map_or_else(|| self.current_store(), str::to_string);
        Ok(self.stored_values(key).contains_store(&store))
    }

    /// Every store with a value in any storable field, first-seen order.
    #[must_use]
    pub fn stores(&self) -> Vec<String> {
        let mut stores: Vec<String> = Vec::new();
        for key in self.storable_fields() {
            for store in self.stored_values(key).stores() {
                if !stores.iter().any(|s| s == store) {
                    stores.push(store.to_string());
                }
            }
        }
        stores
    }

    /// The store a read of `(key, store)` is served from.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn normalize_store(
        &self,
        key: &str,
        store: &str,
        use_fallback: bool,
    ) -> Result<String, StorableError> {
        self.guard(key)?;
        Ok(self.normalize(&self.stored_values(key), store, use_fallback))
    }

    fn normalize(&self, values: &StoreMap, store: &str, use_fallback: bool) -> String {
        if values.contains_store(store) || !use_fallback {
            return store.to_string();
        }

        let config = self.storable.config();
        if let Some(fallback) = config.fallback_store() {
            if values.contains_store(fallback) {
                return fallback.to_string();
            }
        }

        if config.fallback.fallback_any {
            if let Some(first) = values.first_store() {
                return first.to_string();
            }
        }

        store.to_string()
    }

    /// Resolves `key` for `store`.
    ///
    /// A missing value reads as `""`, never as `Null`.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    /// Missing-key callback failures are logged and ignored.
    pub fn get_value(
        &self,
        key: &str,
        store: &str,
        use_fallback: bool,
    ) -> Result<Value, StorableError> {
        self.guard(key)?;
        Ok(self.resolve(key, store, use_fallback))
    }

    /// [`get_value`](Self::get_value) with fallback.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn get_value_with_fallback(&self, key: &str, store: &str) -> Result<Value, StorableError> {
        self.get_value(key, store, true)
    }

    /// [`get_value`](Self::get_value) without fallback.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn get_value_without_fallback(
        &self,
        key: &str,
        store: &str,
    ) -> Result<Value, StorableError> {
        self.get_value(key, store, false)
    }

    /// [`get_value`](Self::get_value) where an empty `store` means the
    /// current store.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn translate(
        &self,
        key: &str,
        store: &str,
        use_fallback: bool,
    ) -> Result<Value, StorableError> {
        if store.is_empty() {
            let current = self.current_store();
            return self.get_value(key, &current, use_fallback);
        }
        self.get_value(key, store, use_fallback)
    }

    fn resolve(&self, key: &str, store: &str, use_fallback: bool) -> Value {
        let values = self.stored_values(key);
        let effective = self.normalize(&values, store, use_fallback);
        let mut value = values.get(&effective).cloned().unwrap_or_else(Value::empty);

        if effective != store {
            tracing::trace!(
                model = %self.model(),
                key = %key,
                store = %store,
                effective_store = %effective,
                "store value missing, falling back"
            );
            if let Some(replacement) = self.run_missing_key_callback(key, store, &value, &effective)
            {
                value = replacement;
            }
        }

        match self.schema.get_mutator(key) {
            Some(mutator) => mutator(self, value),
            None => value,
        }
    }

    fn run_missing_key_callback(
        &self,
        key: &str,
        store: &str,
        value: &Value,
        effective: &str,
    ) -> Option<Value> {
        let callback = self.storable.missing_key_callback()?;
        let args = MissingKey {
            record: self,
            key,
            requested_store: store,
            value,
            effective_store: effective,
        };
        match panic::catch_unwind(AssertUnwindSafe(|| callback(args))) {
            Ok(Ok(Some(Value::String(replacement)))) => Some(Value::String(replacement)),
            Ok(Ok(_)) => None,
            Ok(Err(err)) => {
                tracing::warn!(
                    model = %self.model(),
                    key = %key,
                    store = %store,
                    error = %err,
                    "missing-key callback failed; keeping resolved value"
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    model = %self.model(),
                    key = %key,
                    store = %store,
                    "missing-key callback panicked; keeping resolved value"
                );
                None
            }
        }
    }

    // ---- Mutation ----

    /// Writes `value` for `store` in `key` and publishes a
    /// [`StoreChangeEvent`].
    ///
    /// With a set mutator registered for `key`, the mutator writes the raw
    /// slot and whatever it wrote is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable, or
    /// [`StorableError::Mutator`] if the set mutator fails (the slot is then
    /// restored and no event is published).
    pub fn set_value(
        &mut self,
        key: &str,
        store: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, StorableError> {
        self.guard(key)?;
        let value = value.into();
        let mut values = self.stored_values(key);
        let old_value = values.get(store).cloned().unwrap_or_else(Value::empty);

        let new_value = match self.schema.set_mutator(key).cloned() {
            Some(mutator) => {
                let previous = self.attributes.get(key).cloned();
                if let Err(source) = mutator(self, value, store) {
                    self.restore_slot(key, previous);
                    return Err(StorableError::Mutator {
                        key: key.to_string(),
                        source,
                    });
                }
                self.attributes.get(key).cloned().unwrap_or_default()
            }
            None => value,
        };

        values.insert(store, new_value.clone());
        self.attributes
            .insert(key.to_string(), Value::String(store_map::encode(&values)));

        self.storable.observer().on_store_value_set(&StoreChangeEvent {
            record: self,
            key,
            store,
            old_value: &old_value,
            new_value: &new_value,
        });
        Ok(self)
    }

    fn restore_slot(&mut self, key: &str, previous: Option<Value>) {
        match previous {
            Some(value) => {
                self.attributes.insert(key.to_string(), value);
            }
            None => {
                self.forget_raw_attribute(key);
            }
        }
    }

    /// Writes every entry of `values` through [`set_value`](Self::set_value),
    /// in order. An empty map resets the field to an empty encoding without
    /// publishing events.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable, or the
    /// first [`StorableError::Mutator`] raised.
    pub fn set_values(&mut self, key: &str, values: StoreMap) -> Result<&mut Self, StorableError> {
        self.guard(key)?;
        if values.is_empty() {
            self.attributes
                .insert(key.to_string(), Value::from(store_map::EMPTY_ENCODED));
            return Ok(self);
        }
        for (store, value) in values {
            self.set_value(key, &store, value)?;
        }
        Ok(self)
    }

    /// Removes `store`'s value from `key`.
    ///
    /// Only the map is rewritten: other stores keep their values as stored,
    /// their set mutators do not run again, and no event is published.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn unset_value(&mut self, key: &str, store: &str) -> Result<&mut Self, StorableError> {
        self.guard(key)?;
        let mut values = self.stored_values(key);
        values.remove(store);
        self.attributes
            .insert(key.to_string(), Value::String(store_map::encode(&values)));
        Ok(self)
    }

    /// Removes every value of `key`. The slot ends as an empty encoding, or
    /// as `Null` when `write_null` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable.
    pub fn unset_all_values_for_field(
        &mut self,
        key: &str,
        write_null: bool,
    ) -> Result<&mut Self, StorableError> {
        for store in self.list_stores_with_value(key)? {
            self.unset_value(key, &store)?;
        }
        let cleared = if write_null {
            Value::Null
        } else {
            Value::from(store_map::EMPTY_ENCODED)
        };
        self.attributes.insert(key.to_string(), cleared);
        Ok(self)
    }

    /// Removes `store`'s value from every storable field.
    ///
    /// # Errors
    ///
    /// Propagates [`unset_value`](Self::unset_value) errors; none occur for
    /// declared fields.
    pub fn unset_all_fields_for_store(&mut self, store: &str) -> Result<&mut Self, StorableError> {
        let fields = self.storable_fields().to_vec();
        for key in &fields {
            self.unset_value(key, store)?;
        }
        Ok(self)
    }

    /// Replaces all values of `key` with `values`.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::NotStorable`] if `key` is not storable, or the
    /// first [`StorableError::Mutator`] raised while writing `values`.
    pub fn replace_values(
        &mut self,
        key: &str,
        values: StoreMap,
    ) -> Result<&mut Self, StorableError> {
        for store in self.list_stores_with_value(key)? {
            self.unset_value(key, &store)?;
        }
        self.set_values(key, values)
    }

    // ---- Attribute access ----

    /// Reads an attribute.
    ///
    /// Storable fields resolve for the current store with fallback; other
    /// fields return their raw value (or `Null`), passed through a registered
    /// get mutator.
    #[must_use]
    pub fn get_attribute(&self, key: &str) -> Value {
        if self.is_storable(key) {
            let store = self.current_store();
            return self.resolve(key, &store, true);
        }
        let raw = self.attributes.get(key).cloned().unwrap_or_default();
        match self.schema.get_mutator(key) {
            Some(mutator) => mutator(self, raw),
            None => raw,
        }
    }

    /// Writes an attribute.
    ///
    /// Storable fields take a map of stores through
    /// [`set_values`](Self::set_values) (a list is keyed by its indices, as
    /// the column decoder reads it) and a scalar through
    /// [`set_value`](Self::set_value) for the current store. Other fields are
    /// written raw, through a registered set mutator when there is one.
    ///
    /// # Errors
    ///
    /// Returns [`StorableError::Mutator`] if a set mutator fails.
    pub fn set_attribute(
        &mut self,
        key: &str,
        value: impl Into<Attribute>,
    ) -> Result<&mut Self, StorableError> {
        let value = value.into();
        if self.is_storable(key) {
            return match value {
                Attribute::Stores(map) => self.set_values(key, map),
                Attribute::Value(Value::Map(map)) => self.set_values(key, map.into_iter().collect()),
                Attribute::Value(Value::Array(list)) => self.set_values(
                    key,
                    list.into_iter()
                        .enumerate()
                        .map(|(idx, value)| (idx.to_string(), value))
                        .collect(),
                ),
                Attribute::Value(scalar) => {
                    let store = self.current_store();
                    self.set_value(key, &store, scalar)
                }
            };
        }

        let raw = match value {
            Attribute::Value(v) => v,
            Attribute::Stores(map) => Value::Map(map.into_iter().collect()),
        };
        match self.schema.set_mutator(key).cloned() {
            Some(mutator) => {
                let store = self.current_store();
                mutator(self, raw, &store).map_err(|source| StorableError::Mutator {
                    key: key.to_string(),
                    source,
                })?;
            }
            None => {
                self.attributes.insert(key.to_string(), raw);
            }
        }
        Ok(self)
    }

    /// Writes several attributes through [`set_attribute`](Self::set_attribute).
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first error.
    pub fn fill<I, K, A>(&mut self, attributes: I) -> Result<&mut Self, StorableError>
    where
        I: IntoIterator<Item = (K, A)>,
        K: AsRef<str>,
        A: Into<Attribute>,
    {
        for (key, value) in attributes {
            self.set_attribute(key.as_ref(), value)?;
        }
        Ok(self)
    }
}
