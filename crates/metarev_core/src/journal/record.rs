//! Journal record types and payload encoding.

use crate::entity::EntityId;
use crate::snapshot::Snapshot;
use crate::types::{EntityKind, EntityType, RevisionId};
use metarev_codec::{decode_value, encode_value, CodecError, CodecResult, Value};

/// Magic bytes opening every journal record.
pub const JOURNAL_MAGIC: [u8; 4] = *b"MREV";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// Type byte of a journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JournalRecordType {
    /// An entity was registered with the catalog.
    EntityRegistered = 1,
    /// All values of one live key were replaced.
    MetaReplaced = 2,
    /// One live key was deleted.
    MetaDeleted = 3,
    /// A revision was created.
    RevisionCreated = 4,
    /// An entity's draft was written.
    DraftSaved = 5,
    /// An entity's draft was discarded.
    DraftDiscarded = 6,
}

impl JournalRecordType {
    /// Converts a byte to a record type.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::EntityRegistered),
            2 => Some(Self::MetaReplaced),
            3 => Some(Self::MetaDeleted),
            4 => Some(Self::RevisionCreated),
            5 => Some(Self::DraftSaved),
            6 => Some(Self::DraftDiscarded),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Short name used by tooling output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EntityRegistered => "entity-registered",
            Self::MetaReplaced => "meta-replaced",
            Self::MetaDeleted => "meta-deleted",
            Self::RevisionCreated => "revision-created",
            Self::DraftSaved => "draft-saved",
            Self::DraftDiscarded => "draft-discarded",
        }
    }
}

/// One durable state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalRecord {
    /// An entity was registered.
    EntityRegistered {
        /// The entity.
        entity: EntityId,
        /// Its type tag.
        entity_type: EntityType,
        /// Live document or revision.
        kind: EntityKind,
    },

    /// A live key now holds exactly `values`.
    MetaReplaced {
        /// Owning entity.
        entity: EntityId,
        /// Metadata key.
        key: String,
        /// New ordered values (never empty).
        values: Vec<Value>,
    },

    /// A live key was removed.
    MetaDeleted {
        /// Owning entity.
        entity: EntityId,
        /// Metadata key.
        key: String,
    },

    /// A revision was frozen.
    RevisionCreated {
        /// Revision ID.
        revision: RevisionId,
        /// Entity the revision belongs to.
        parent: EntityId,
        /// Document body captured with the revision.
        body: Value,
        /// Versioned metadata at creation time.
        snapshot: Snapshot,
        /// SHA-256 of the snapshot encoding.
        fingerprint: [u8; 32],
    },

    /// An entity's draft now holds `snapshot`.
    DraftSaved {
        /// Entity being edited.
        entity: EntityId,
        /// Full draft contents after the save.
        snapshot: Snapshot,
        /// Number of autosaves folded into the draft.
        saves: u64,
    },

    /// An entity's draft was dropped.
    DraftDiscarded {
        /// Entity whose edit session ended.
        entity: EntityId,
    },
}

impl JournalRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> JournalRecordType {
        match self {
            Self::EntityRegistered { .. } => JournalRecordType::EntityRegistered,
            Self::MetaReplaced { .. } => JournalRecordType::MetaReplaced,
            Self::MetaDeleted { .. } => JournalRecordType::MetaDeleted,
            Self::RevisionCreated { .. } => JournalRecordType::RevisionCreated,
            Self::DraftSaved { .. } => JournalRecordType::DraftSaved,
            Self::DraftDiscarded { .. } => JournalRecordType::DraftDiscarded,
        }
    }

    /// Returns the entity the record is about.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        match self {
            Self::EntityRegistered { entity, .. }
            | Self::MetaReplaced { entity, .. }
            | Self::MetaDeleted { entity, .. }
            | Self::DraftSaved { entity, .. }
            | Self::DraftDiscarded { entity } => *entity,
            Self::RevisionCreated { parent, .. } => *parent,
        }
    }

    /// Serializes the record payload (without envelope).
    ///
    /// # Errors
    ///
    /// Returns an error if CBOR encoding fails.
    pub fn encode_payload(&self) -> CodecResult<Vec<u8>> {
        let fields = match self {
            Self::EntityRegistered {
                entity,
                entity_type,
                kind,
            } => vec![
                field("entity", entity_value(*entity)),
                field("type", Value::text(entity_type.as_str())),
                field("kind", Value::Integer(i64::from(kind.as_byte()))),
            ],
            Self::MetaReplaced {
                entity,
                key,
                values,
            } => vec![
                field("entity", entity_value(*entity)),
                field("key", Value::text(key.as_str())),
                field("values", Value::Array(values.clone())),
            ],
            Self::MetaDeleted { entity, key } => vec![
                field("entity", entity_value(*entity)),
                field("key", Value::text(key.as_str())),
            ],
            Self::RevisionCreated {
                revision,
                parent,
                body,
                snapshot,
                fingerprint,
            } => vec![
                field("revision", revision_value(*revision)?),
                field("parent", entity_value(*parent)),
                field("body", body.clone()),
                field("snapshot", snapshot.to_value()),
                field("fingerprint", Value::Bytes(fingerprint.to_vec())),
            ],
            Self::DraftSaved {
                entity,
                snapshot,
                saves,
            } => vec![
                field("entity", entity_value(*entity)),
                field("snapshot", snapshot.to_value()),
                field("saves", counter_value(*saves)?),
            ],
            Self::DraftDiscarded { entity } => vec![field("entity", entity_value(*entity))],
        };
        encode_value(&Value::Map(fields))
    }

    /// Decodes a payload of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid CBOR or a field is
    /// missing or has the wrong shape.
    pub fn decode_payload(record_type: JournalRecordType, payload: &[u8]) -> CodecResult<Self> {
        let fields = Fields(decode_value(payload)?);
        Ok(match record_type {
            JournalRecordType::EntityRegistered => Self::EntityRegistered {
                entity: fields.entity("entity")?,
                entity_type: EntityType::new(fields.text("type")?),
                kind: u8::try_from(fields.integer("kind")?)
                    .ok()
                    .and_then(EntityKind::from_byte)
                    .ok_or_else(|| CodecError::unexpected_shape("entity kind"))?,
            },
            JournalRecordType::MetaReplaced => Self::MetaReplaced {
                entity: fields.entity("entity")?,
                key: fields.text("key")?,
                values: fields.array("values")?,
            },
            JournalRecordType::MetaDeleted => Self::MetaDeleted {
                entity: fields.entity("entity")?,
                key: fields.text("key")?,
            },
            JournalRecordType::RevisionCreated => Self::RevisionCreated {
                revision: RevisionId::new(fields.counter("revision")?),
                parent: fields.entity("parent")?,
                body: fields.get("body")?.clone(),
                snapshot: Snapshot::from_value(fields.get("snapshot")?.clone())?,
                fingerprint: fields
                    .bytes("fingerprint")?
                    .try_into()
                    .map_err(|_| CodecError::unexpected_shape("32-byte fingerprint"))?,
            },
            JournalRecordType::DraftSaved => Self::DraftSaved {
                entity: fields.entity("entity")?,
                snapshot: Snapshot::from_value(fields.get("snapshot")?.clone())?,
                saves: fields.counter("saves")?,
            },
            JournalRecordType::DraftDiscarded => Self::DraftDiscarded {
                entity: fields.entity("entity")?,
            },
        })
    }
}

fn field(name: &str, value: Value) -> (Value, Value) {
    (Value::text(name), value)
}

fn entity_value(entity: EntityId) -> Value {
    Value::Bytes(entity.as_bytes().to_vec())
}

fn revision_value(revision: RevisionId) -> CodecResult<Value> {
    counter_value(revision.as_u64())
}

fn counter_value(n: u64) -> CodecResult<Value> {
    i64::try_from(n)
        .map(Value::Integer)
        .map_err(|_| CodecError::IntegerOverflow)
}

/// Field accessor over a decoded payload map.
struct Fields(Value);

impl Fields {
    fn get(&self, name: &str) -> CodecResult<&Value> {
        self.0
            .get(name)
            .ok_or_else(|| CodecError::unexpected_shape(format!("field '{name}'")))
    }

    fn text(&self, name: &str) -> CodecResult<String> {
        self.get(name)?
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| CodecError::unexpected_shape(format!("text field '{name}'")))
    }

    fn integer(&self, name: &str) -> CodecResult<i64> {
        self.get(name)?
            .as_integer()
            .ok_or_else(|| CodecError::unexpected_shape(format!("integer field '{name}'")))
    }

    fn counter(&self, name: &str) -> CodecResult<u64> {
        u64::try_from(self.integer(name)?)
            .map_err(|_| CodecError::unexpected_shape(format!("non-negative field '{name}'")))
    }

    fn bytes(&self, name: &str) -> CodecResult<&[u8]> {
        self.get(name)?
            .as_bytes()
            .ok_or_else(|| CodecError::unexpected_shape(format!("bytes field '{name}'")))
    }

    fn array(&self, name: &str) -> CodecResult<Vec<Value>> {
        self.get(name)?
            .as_array()
            .map(<[Value]>::to_vec)
            .ok_or_else(|| CodecError::unexpected_shape(format!("array field '{name}'")))
    }

    fn entity(&self, name: &str) -> CodecResult<EntityId> {
        EntityId::from_slice(self.bytes(name)?)
            .ok_or_else(|| CodecError::unexpected_shape(format!("16-byte entity '{name}'")))
    }
}
