use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::record::StorableRecord;
use crate::types::Value;

/// Read transform applied to a field's resolved value before it is returned.
pub type GetMutator = Arc<dyn Fn(&StorableRecord, Value) -> Value + Send + Sync>;

/// Write transform for a field.
///
/// Receives the incoming value and the target store and is responsible for
/// writing the final value into the record's raw slot for the field (via
/// [`StorableRecord::set_raw_attribute`]). For storable fields the slot is
/// then read back as the value to store, so a mutator may derive it from
/// other fields' values for the same store.
pub type SetMutator =
    Arc<dyn Fn(&mut StorableRecord, Value, &str) -> anyhow::Result<()> + Send + Sync>;

/// Per-field transforms, resolved once when the schema is built.
#[derive(Clone, Default)]
struct FieldDef {
    get: Option<GetMutator>,
    set: Option<SetMutator>,
}

/// Definition of a record type: its name, which fields are storable, and the
/// dispatch table of read/write transforms per field.
pub struct ModelSchema {
    name: String,
    storable: Vec<String>,
    fields: HashMap<String, FieldDef>,
}

impl ModelSchema {
    /// Starts building a schema for the model `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            schema: ModelSchema {
                name: name.into(),
                storable: Vec::new(),
                fields: HashMap::new(),
            },
        }
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storable field names in declaration order.
    #[must_use]
    pub fn storable_fields(&self) -> &[String] {
        &self.storable
    }

    /// Returns `true` if `key` was declared storable.
    #[must_use]
    pub fn is_storable(&self, key: &str) -> bool {
        self.storable.iter().any(|field| field == key)
    }

    /// The read transform registered for `key`.
    #[must_use]
    pub fn get_mutator(&self, key: &str) -> Option<&GetMutator> {
        self.fields.get(key).and_then(|def| def.get.as_ref())
    }

    /// The write transform registered for `key`.
    #[must_use]
    pub fn set_mutator(&self, key: &str) -> Option<&SetMutator> {
        self.fields.get(key).and_then(|def| def.set.as_ref())
    }
}

impl fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut get: Vec<&str> = Vec::new();
        let mut set: Vec<&str> = Vec::new();
        for (key, def) in &self.fields {
            if def.get.is_some() {
                get.push(key);
            }
            if def.set.is_some() {
                set.push(key);
            }
        }
        get.sort_unstable();
        set.sort_unstable();
        f.debug_struct("ModelSchema")
            .field("name", &self.name)
            .field("storable", &self.storable)
            .field("get_mutators", &get)
            .field("set_mutators", &set)
            .finish()
    }
}

/// Builder for [`ModelSchema`].
pub struct ModelSchemaBuilder {
    schema: ModelSchema,
}

impl ModelSchemaBuilder {
    /// Declares storable fields. Duplicates are ignored.
    #[must_use]
    pub fn storable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.schema.storable.contains(&field) {
                self.schema.storable.push(field);
            }
        }
        self
    }

    /// Registers a read transform for `field`, replacing any previous one.
    #[must_use]
    pub fn get_mutator<F>(mut self, field: impl Into<String>, mutator: F) -> Self
    where
        F: Fn(&StorableRecord, Value) -> Value + Send + Sync + 'static,
    {
        self.schema.fields.entry(field.into()).or_default().get = Some(Arc::new(mutator));
        self
    }

    /// Registers a write transform for `field`, replacing any previous one.
    #[must_use]
    pub fn set_mutator<F>(mut self, field: impl Into<String>, mutator: F) -> Self
    where
        F: Fn(&mut StorableRecord, Value, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.schema.fields.entry(field.into()).or_default().set = Some(Arc::new(mutator));
        self
    }

    /// Finishes the schema.
    #[must_use]
    pub fn build(self) -> ModelSchema {
        self.schema
    }
}
