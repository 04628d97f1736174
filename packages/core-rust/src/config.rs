use std::fmt;
use std::sync::Arc;

use crate::record::StorableRecord;
use crate::types::Value;

/// Arguments handed to a [`MissingKeyCallback`] when a read fell back to
/// another store (or to no store at all).
#[derive(Debug, Clone, Copy)]
pub struct MissingKey<'a> {
    /// The record being read.
    pub record: &'a StorableRecord,
    /// The storable field being read.
    pub key: &'a str,
    /// The store the caller asked for.
    pub requested_store: &'a str,
    /// The value resolved so far (`""` when nothing was found).
    pub value: &'a Value,
    /// The store the value was actually taken from.
    pub effective_store: &'a str,
}

/// Hook invoked when a requested store has no value.
///
/// Returning `Ok(Some(Value::String(_)))` replaces the resolved value. Other
/// returns leave it untouched, as do errors and panics.
pub type MissingKeyCallback =
    Arc<dyn Fn(MissingKey<'_>) -> anyhow::Result<Option<Value>> + Send + Sync>;

/// Fallback rules applied when a requested store has no value.
#[derive(Clone, Default)]
pub struct FallbackPolicy {
    /// Store to read instead. `None` defers to
    /// [`StorableConfig::app_fallback_store`].
    pub fallback_store: Option<String>,
    /// When neither the requested nor the fallback store has a value, use the
    /// first store that has one.
    pub fallback_any: bool,
    /// Hook invoked whenever the requested store was missing.
    pub missing_key_callback: Option<MissingKeyCallback>,
}

impl FallbackPolicy {
    /// Policy with no fallback store, `fallback_any` off and no callback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback store.
    #[must_use]
    pub fn with_fallback_store(mut self, store: impl Into<String>) -> Self {
        self.fallback_store = Some(store.into());
        self
    }

    /// Enables or disables fallback to any valued store.
    #[must_use]
    pub fn with_fallback_any(mut self, fallback_any: bool) -> Self {
        self.fallback_any = fallback_any;
        self
    }

    /// Installs a missing-key callback.
    #[must_use]
    pub fn with_missing_key_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(MissingKey<'_>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        self.missing_key_callback = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackPolicy")
            .field("fallback_store", &self.fallback_store)
            .field("fallback_any", &self.fallback_any)
            .field(
                "missing_key_callback",
                &self.missing_key_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

/// Process-level settings read by every resolution.
#[derive(Debug, Clone)]
pub struct StorableConfig {
    /// Store used when a record has no selected store (the application locale).
    pub default_store: String,
    /// Application-wide fallback store, consulted when the policy names none.
    pub app_fallback_store: Option<String>,
    /// Fallback rules.
    pub fallback: FallbackPolicy,
}

impl StorableConfig {
    /// The fallback store in effect: the policy's, else the application's.
    ///
    /// An explicitly configured empty policy store still wins over the
    /// application fallback; it simply never matches a valued store.
    #[must_use]
    pub fn fallback_store(&self) -> Option<&str> {
        self.fallback
            .fallback_store
            .as_deref()
            .or(self.app_fallback_store.as_deref())
    }
}

impl Default for StorableConfig {
    fn default() -> Self {
        Self {
            default_store: "en".to_string(),
            app_fallback_store: None,
            fallback: FallbackPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_fallback() {
        let config = StorableConfig::default();
        assert_eq!(config.default_store, "en");
        assert_eq!(config.fallback_store(), None);
        assert!(!config.fallback.fallback_any);
        assert!(config.fallback.missing_key_callback.is_none());
    }

    #[test]
    fn policy_store_wins_over_app_fallback() {
        let config = StorableConfig {
            app_fallback_store: Some("nl".to_string()),
            fallback: FallbackPolicy::new().with_fallback_store("en"),
            ..StorableConfig::default()
        };
        assert_eq!(config.fallback_store(), Some("en"));
    }

    #[test]
    fn app_fallback_used_when_policy_has_none() {
        let config = StorableConfig {
            app_fallback_store: Some("nl".to_string()),
            ..StorableConfig::default()
        };
        assert_eq!(config.fallback_store(), Some("nl"));
    }

    #[test]
    fn empty_policy_store_shadows_app_fallback() {
        let config = StorableConfig {
            app_fallback_store: Some("en".to_string()),
            fallback: FallbackPolicy::new().with_fallback_store(""),
            ..StorableConfig::default()
        };
        assert_eq!(config.fallback_store(), Some(""));
    }

    #[test]
    fn policy_debug_hides_callback() {
        let policy = FallbackPolicy::new().with_missing_key_callback(|_| Ok(None));
        let rendered = format!("{policy:?}");
        assert!(rendered.contains("<callback>"));
    }
}
