//! Engine configuration.

use crate::error::{CoreError, CoreResult};
use crate::keys::MetadataKeySet;
use crate::types::EntityType;
use metarev_codec::Value;

/// How metadata value sequences are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparisonMode {
    /// Same length, same values, same order, no type juggling.
    #[default]
    Strict,
    /// Element-wise [`Value::loosely_equals`]. Numeric text equals the
    /// matching integer. Only for hosts that relied on loose comparison.
    Loose,
}

impl ComparisonMode {
    /// Compares two single values.
    #[must_use]
    pub fn values_equal(self, a: &Value, b: &Value) -> bool {
        match self {
            Self::Strict => a == b,
            Self::Loose => a.loosely_equals(b),
        }
    }

    /// Compares two ordered value sequences.
    ///
    /// Sequence equality, never set equality: reordering or a changed
    /// duplicate count is a difference in both modes.
    #[must_use]
    pub fn sequences_equal(self, a: &[Value], b: &[Value]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.values_equal(x, y))
    }
}

/// Configuration for opening a [`crate::Versioning`] engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Versioned keys per entity type.
    pub key_set: MetadataKeySet,

    /// Type assumed for entities the host never registered.
    pub default_entity_type: EntityType,

    /// Comparison used by change detection and draft saves.
    pub comparison: ComparisonMode,

    /// Whether to flush the journal after every record.
    pub sync_on_write: bool,

    /// Number of events kept for polling.
    pub event_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_set: MetadataKeySet::new(),
            default_entity_type: EntityType::new("document"),
            comparison: ComparisonMode::Strict,
            sync_on_write: true,
            event_history: 1024,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the versioned key set.
    #[must_use]
    pub fn key_set(mut self, key_set: MetadataKeySet) -> Self {
        self.key_set = key_set;
        self
    }

    /// Sets the fallback entity type.
    #[must_use]
    pub fn default_entity_type(mut self, entity_type: impl Into<EntityType>) -> Self {
        self.default_entity_type = entity_type.into();
        self
    }

    /// Sets the comparison mode.
    #[must_use]
    pub fn comparison(mut self, mode: ComparisonMode) -> Self {
        self.comparison = mode;
        self
    }

    /// Sets whether to flush the journal on every write.
    #[must_use]
    pub fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the event history size.
    #[must_use]
    pub fn event_history(mut self, size: usize) -> Self {
        self.event_history = size;
        self
    }

    /// Validates the configuration. Called when an engine opens.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the key set is invalid or the
    /// default entity type is empty.
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_entity_type.is_empty() {
            return Err(CoreError::invalid_config("default entity type is empty"));
        }
        self.key_set.validate()
    }
}
