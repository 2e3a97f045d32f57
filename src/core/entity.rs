//! Entity trait - common interface for all stored record types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Common trait for all DCE records
pub trait Entity: Serialize + DeserializeOwned {
    /// The entity type prefix (e.g., EST, CMP)
    const PREFIX: EntityPrefix;

    /// Get the entity's unique ID
    fn id(&self) -> &EntityId;

    /// Get the entity's display name
    fn title(&self) -> &str;

    /// Get the user who owns this record
    fn owner(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;
}

/// Implements [`Entity`] for a record with `id`, `owner` and `created`
/// fields and a named title field.
macro_rules! impl_entity {
    ($ty:ty, $prefix:expr, $title:ident) => {
        impl $crate::core::entity::Entity for $ty {
            const PREFIX: $crate::core::identity::EntityPrefix = $prefix;

            fn id(&self) -> &$crate::core::identity::EntityId {
                &self.id
            }

            fn title(&self) -> &str {
                &self.$title
            }

            fn owner(&self) -> &str {
                &self.owner
            }

            fn created(&self) -> chrono::DateTime<chrono::Utc> {
                self.created
            }
        }
    };
}

pub(crate) use impl_entity;
