//! Persisted row types.

use serde::{Deserialize, Serialize};
use storable_core::Attributes;

use crate::error::RepositoryError;

/// Opaque encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageValue {
    /// `MsgPack` bytes.
    pub data: Vec<u8>,
}

/// A persisted record: its model name and encoded attribute bag.
///
/// Only raw slots are stored. The selected store and the shared context are
/// runtime state and are supplied again on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// Model the row belongs to.
    pub model: String,
    /// The attribute bag, `MsgPack`-encoded.
    pub data: StorageValue,
}

impl StoredRow {
    /// Encodes `attributes` for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Encode`] if serialization fails.
    pub fn encode(model: &str, attributes: &Attributes) -> Result<Self, RepositoryError> {
        let data = rmp_serde::to_vec_named(attributes)?;
        Ok(Self {
            model: model.to_string(),
            data: StorageValue { data },
        })
    }

    /// Decodes the attribute bag.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Decode`] if the payload is not a valid
    /// encoded attribute bag.
    pub fn decode(&self) -> Result<Attributes, RepositoryError> {
        Ok(rmp_serde::from_slice(&self.data.data)?)
    }
}
