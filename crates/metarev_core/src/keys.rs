//! Versioned key configuration.
//!
//! A [`MetadataKeySet`] maps each entity type to the ordered list of
//! metadata keys that are versioned for it. Everything else stored on an
//! entity is invisible to revisions, restores and drafts.

use crate::error::{CoreError, CoreResult};
use crate::types::EntityType;
use std::collections::{HashMap, HashSet};

/// A metadata key that is tracked across revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedKey {
    name: String,
    label: String,
}

impl VersionedKey {
    /// Creates a versioned key whose label is its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
        }
    }

    /// Sets the human-readable label used by diff renderers.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Returns the metadata key name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl From<&str> for VersionedKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Which metadata keys are versioned, per entity type.
///
/// # Example
///
/// ```rust
/// use metarev_core::{MetadataKeySet, VersionedKey};
///
/// let keys = MetadataKeySet::new()
///     .version("post", ["caption", "tags"])
///     .version_key("post", VersionedKey::new("gallery").with_label("Gallery"));
///
/// assert_eq!(keys.keys_for("post").len(), 3);
/// assert!(keys.keys_for("page").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataKeySet {
    by_type: HashMap<EntityType, Vec<VersionedKey>>,
}

impl MetadataKeySet {
    /// Creates an empty key set. Nothing is versioned.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds plain keys (label = name) for an entity type.
    #[must_use]
    pub fn version<I, K>(mut self, entity_type: impl Into<EntityType>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<VersionedKey>,
    {
        self.by_type
            .entry(entity_type.into())
            .or_default()
            .extend(keys.into_iter().map(Into::into));
        self
    }

    /// Adds one key for an entity type.
    #[must_use]
    pub fn version_key(mut self, entity_type: impl Into<EntityType>, key: VersionedKey) -> Self {
        self.by_type.entry(entity_type.into()).or_default().push(key);
        self
    }

    /// Returns the versioned keys for `entity_type`, in configuration order.
    ///
    /// Unconfigured types yield an empty slice.
    #[must_use]
    pub fn keys_for(&self, entity_type: &str) -> &[VersionedKey] {
        self.by_type
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if `key` is versioned for `entity_type`.
    #[must_use]
    pub fn contains(&self, entity_type: &str, key: &str) -> bool {
        self.keys_for(entity_type).iter().any(|k| k.name() == key)
    }

    /// Checks the key set for configuration mistakes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] for an empty type name, an empty
    /// key name, or a key listed twice for the same type.
    pub fn validate(&self) -> CoreResult<()> {
        for (entity_type, keys) in &self.by_type {
            if entity_type.is_empty() {
                return Err(CoreError::invalid_config("entity type name is empty"));
            }
            let mut seen = HashSet::new();
            for key in keys {
                if key.name().is_empty() {
                    return Err(CoreError::invalid_config(format!(
                        "empty metadata key for type '{entity_type}'"
                    )));
                }
                if !seen.insert(key.name()) {
                    return Err(CoreError::invalid_config(format!(
                        "metadata key '{}' listed twice for type '{entity_type}'",
                        key.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_type_is_empty_not_error() {
        let keys = MetadataKeySet::new().version("post", ["caption"]);
        assert!(keys.keys_for("product").is_empty());
        assert!(!keys.contains("product", "caption"));
    }

    #[test]
    fn order_follows_configuration() {
        let keys = MetadataKeySet::new()
            .version("post", ["tags", "caption"])
            .version("post", ["gallery"]);
        let names: Vec<_> = keys.keys_for("post").iter().map(VersionedKey::name).collect();
        assert_eq!(names, ["tags", "caption", "gallery"]);
    }

    #[test]
    fn labels_default_to_names() {
        let keys = MetadataKeySet::new()
            .version("post", ["caption"])
            .version_key("post", VersionedKey::new("_thumb").with_label("Thumbnail"));
        let post = keys.keys_for("post");
        assert_eq!(post[0].label(), "caption");
        assert_eq!(post[1].label(), "Thumbnail");
    }

    #[test]
    fn validate_rejects_duplicates() {
        let keys = MetadataKeySet::new().version("post", ["tags", "tags"]);
        assert!(matches!(
            keys.validate(),
            Err(CoreError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_names() {
        assert!(MetadataKeySet::new().version("", ["a"]).validate().is_err());
        assert!(MetadataKeySet::new().version("post", [""]).validate().is_err());
        assert!(MetadataKeySet::new()
            .version("post", ["a"])
            .version("page", ["a"])
            .validate()
            .is_ok());
    }
}
