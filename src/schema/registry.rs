//! Embedded JSON schemas, one per entity type

use rust_embed::Embed;
use std::collections::HashMap;

use crate::core::identity::EntityPrefix;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Schema sources keyed by entity prefix
pub struct SchemaRegistry {
    schemas: HashMap<EntityPrefix, String>,
}

impl SchemaRegistry {
    /// File name of the schema for a prefix (e.g. `est.schema.json`)
    pub fn file_name(prefix: EntityPrefix) -> String {
        format!("{}.schema.json", prefix.as_str().to_lowercase())
    }

    pub fn get(&self, prefix: EntityPrefix) -> Option<&str> {
        self.schemas.get(&prefix).map(String::as_str)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = EntityPrefix> + '_ {
        self.schemas.keys().copied()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let mut schemas = HashMap::new();
        for prefix in EntityPrefix::all() {
            let Some(file) = EmbeddedSchemas::get(&Self::file_name(*prefix)) else {
                continue;
            };
            schemas.insert(*prefix, String::from_utf8_lossy(&file.data).into_owned());
        }
        Self { schemas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entity_has_a_schema() {
        let registry = SchemaRegistry::default();
        for prefix in EntityPrefix::all() {
            let schema = registry.get(*prefix).unwrap_or_else(|| panic!("no schema for {}", prefix));
            let json: serde_json::Value = serde_json::from_str(schema).unwrap();
            assert_eq!(json["type"], "object");
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(SchemaRegistry::file_name(EntityPrefix::Conv), "conv.schema.json");
    }
}
