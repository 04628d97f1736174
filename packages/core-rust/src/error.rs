/// Errors returned by store-scoped attribute operations.
#[derive(Debug, thiserror::Error)]
pub enum StorableError {
    /// A store-scoped operation was invoked on a field that is not storable.
    #[error(
        "Cannot translate attribute `{key}` as it's not one of the storable attributes: `{}`",
        .storable.join(", ")
    )]
    NotStorable {
        /// The offending field name.
        key: String,
        /// The storable fields declared by the model.
        storable: Vec<String>,
    },
    /// A field's set mutator failed; the raw slot was left unchanged.
    #[error("set mutator for `{key}` failed: {source}")]
    Mutator {
        /// The field whose mutator failed.
        key: String,
        /// Error reported by the mutator.
        source: anyhow::Error,
    },
}

impl StorableError {
    /// Builds a [`StorableError::NotStorable`] for `key`.
    #[must_use]
    pub fn not_storable(key: &str, storable: &[String]) -> Self {
        Self::NotStorable {
            key: key.to_string(),
            storable: storable.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_storable_message_lists_storable_fields() {
        let err = StorableError::not_storable(
            "untranslated",
            &["name".to_string(), "other_field".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "Cannot translate attribute `untranslated` as it's not one of the storable \
             attributes: `name, other_field`"
        );
    }

    #[test]
    fn mutator_error_keeps_source() {
        let err = StorableError::Mutator {
            key: "name".to_string(),
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.to_string(), "set mutator for `name` failed: boom");
        assert!(std::error::Error::source(&err).is_some());
    }
}
