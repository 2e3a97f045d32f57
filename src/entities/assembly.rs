//! Assembly entity - reusable bundles of components

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::impl_entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::component::ComponentCategory;

/// One component inside an assembly, with its fixed internal quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyMember {
    /// Component ID (CMP-...)
    pub component_id: EntityId,

    /// Quantity of this component per assembly
    pub quantity: f64,

    /// Assembly-specific notes (e.g., "field-cut to length")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Assembly entity - components priced together as a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    /// Unique identifier (ASM-...)
    pub id: EntityId,

    pub name: String,

    #[serde(default)]
    pub category: ComponentCategory,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Member components with quantities
    #[serde(default)]
    pub members: Vec<AssemblyMember>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub owner: String,

    pub created: DateTime<Utc>,
}

impl_entity!(Assembly, EntityPrefix::Asm, name);

impl Assembly {
    /// Create a new, empty assembly
    pub fn new(name: impl Into<String>, category: ComponentCategory, owner: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Asm),
            name: name.into(),
            category,
            description: None,
            members: Vec::new(),
            tags: Vec::new(),
            owner: owner.into(),
            created: Utc::now(),
        }
    }

    /// Add a component; an existing member for the same component gains the quantity
    pub fn add_member(&mut self, component_id: EntityId, quantity: f64) {
        if let Some(existing) = self
            .members
            .iter_mut()
            .find(|m| m.component_id == component_id)
        {
            existing.quantity += quantity;
            return;
        }
        self.members.push(AssemblyMember {
            component_id,
            quantity,
            notes: None,
        });
    }

    /// Remove a member; returns whether it was present
    pub fn remove_member(&mut self, component_id: &EntityId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| &m.component_id != component_id);
        self.members.len() != before
    }

    /// Ids of every member component, in member order
    pub fn component_ids(&self) -> Vec<EntityId> {
        self.members.iter().map(|m| m.component_id.clone()).collect()
    }

    /// Total count of component units across members
    pub fn total_component_count(&self) -> f64 {
        self.members.iter().map(|m| m.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_member_merges_same_component() {
        let mut asm = Assembly::new("Hot Aisle Pod", ComponentCategory::Cooling, "alice");
        let crah = EntityId::new(EntityPrefix::Cmp);
        let rack = EntityId::new(EntityPrefix::Cmp);

        asm.add_member(crah.clone(), 2.0);
        asm.add_member(rack.clone(), 20.0);
        asm.add_member(crah.clone(), 1.0);

        assert_eq!(asm.members.len(), 2);
        assert_eq!(asm.members[0].quantity, 3.0);
        assert_eq!(asm.total_component_count(), 23.0);
        assert_eq!(asm.component_ids(), vec![crah, rack]);
    }

    #[test]
    fn test_remove_member() {
        let mut asm = Assembly::new("Busway Run", ComponentCategory::Power, "alice");
        let busway = EntityId::new(EntityPrefix::Cmp);
        asm.add_member(busway.clone(), 120.0);

        assert!(asm.remove_member(&busway));
        assert!(!asm.remove_member(&busway));
        assert!(asm.members.is_empty());
    }

    #[test]
    fn test_assembly_roundtrip() {
        let mut asm = Assembly::new("Fiber Trunk", ComponentCategory::Network, "bob");
        asm.add_member(EntityId::new(EntityPrefix::Cmp), 12.5);

        let yaml = serde_yml::to_string(&asm).unwrap();
        let parsed: Assembly = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.id, asm.id);
        assert_eq!(parsed.members, asm.members);
        assert_eq!(parsed.category, ComponentCategory::Network);
    }
}
