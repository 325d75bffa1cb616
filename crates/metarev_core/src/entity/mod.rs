//! Entity identity and the entity catalog.

mod catalog;
mod id;

pub use catalog::{EntityCatalog, EntityRecord};
pub use id::EntityId;
