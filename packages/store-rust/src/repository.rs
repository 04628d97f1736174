//! Record persistence on top of a [`StorageEngine`].

use std::sync::Arc;

use storable_core::{ModelSchema, Storable, StorableRecord};
use uuid::Uuid;

use crate::engine::StorageEngine;
use crate::engines::HashMapStorage;
use crate::error::RepositoryError;
use crate::row::StoredRow;

/// Saves and loads [`StorableRecord`]s by id.
///
/// Records are identified by a UUID v4 assigned on first save. Loading
/// rebuilds the record from its raw slots, so storable fields come back
/// exactly as they were written (including `"[]"` and `null` columns).
#[derive(Clone)]
pub struct RecordRepository {
    engine: Arc<dyn StorageEngine>,
}

impl RecordRepository {
    /// Creates a repository over `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self { engine }
    }

    /// Creates a repository over a fresh [`HashMapStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(HashMapStorage::new()))
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }

    /// Persists `record`, assigning an id on first save. Returns the id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Encode`] if the attributes cannot be
    /// encoded. The record is left without an id in that case.
    pub fn save(&self, record: &mut StorableRecord) -> Result<String, RepositoryError> {
        let row = StoredRow::encode(record.model(), record.attributes())?;
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                record.set_id(id.clone());
                id
            }
        };

        let replaced = self.engine.put(&id, row).is_some();
        tracing::debug!(model = %record.model(), id = %id, replaced, "record saved");
        Ok(id)
    }

    /// Loads the record stored under `id`.
    ///
    /// The loaded record has no store selected.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if nothing is stored under `id`,
    /// [`RepositoryError::ModelMismatch`] if the row belongs to another model,
    /// or [`RepositoryError::Decode`] if the row cannot be decoded.
    pub fn find(
        &self,
        schema: Arc<ModelSchema>,
        storable: Storable,
        id: &str,
    ) -> Result<StorableRecord, RepositoryError> {
        let row = self.engine.get(id).ok_or_else(|| RepositoryError::NotFound {
            id: id.to_string(),
        })?;
        if row.model != schema.name() {
            return Err(RepositoryError::ModelMismatch {
                id: id.to_string(),
                expected: schema.name().to_string(),
                found: row.model,
            });
        }

        let mut record = StorableRecord::new(schema, storable);
        record.replace_attributes(row.decode()?);
        record.set_id(id);
        tracing::trace!(model = %record.model(), id = %id, "record loaded");
        Ok(record)
    }

    /// Reloads `record` from storage as a new instance sharing its schema and
    /// context. Returns `None` if the record was never saved or has been
    /// deleted.
    ///
    /// # Errors
    ///
    /// Propagates [`find`](Self::find) errors other than `NotFound`.
    pub fn fresh(
        &self,
        record: &StorableRecord,
    ) -> Result<Option<StorableRecord>, RepositoryError> {
        let Some(id) = record.id() else {
            return Ok(None);
        };
        match self.find(Arc::clone(record.schema()), record.context().clone(), id) {
            Ok(found) => Ok(Some(found)),
            Err(RepositoryError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Reloads `record`'s attributes in place, keeping its selected store.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotSaved`] if the record has no id yet,
    /// [`RepositoryError::NotFound`] if it has been deleted, plus any
    /// [`find`](Self::find) error.
    pub fn refresh(&self, record: &mut StorableRecord) -> Result<(), RepositoryError> {
        let id = record
            .id()
            .map(str::to_string)
            .ok_or_else(|| RepositoryError::NotSaved {
                model: record.model().to_string(),
            })?;
        let loaded = self.find(Arc::clone(record.schema()), record.context().clone(), &id)?;
        record.replace_attributes(loaded.attributes().clone());
        Ok(())
    }

    /// Every stored record of `schema`'s model, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Decode`] if a matching row cannot be decoded.
    pub fn all(
        &self,
        schema: &Arc<ModelSchema>,
        storable: &Storable,
    ) -> Result<Vec<StorableRecord>, RepositoryError> {
        let mut ids = self.engine.keys();
        ids.sort_unstable();

        let mut records = Vec::new();
        for id in ids {
            match self.find(Arc::clone(schema), storable.clone(), &id) {
                Ok(record) => records.push(record),
                // Removed concurrently, or another model's row.
                Err(RepositoryError::NotFound { .. } | RepositoryError::ModelMismatch { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(records)
    }

    /// Deletes the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if nothing is stored under `id`.
    pub fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        match self.engine.remove(id) {
            Some(row) => {
                tracing::debug!(model = %row.model, id = %id, "record deleted");
                Ok(())
            }
            None => Err(RepositoryError::NotFound { id: id.to_string() }),
        }
    }

    /// Number of stored records across all models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.engine.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }
}

impl std::fmt::Debug for RecordRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordRepository")
            .field("len", &self.engine.len())
            .finish()
    }
}
