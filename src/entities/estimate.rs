//! Estimate entity - saved cost estimates and their line items
//!
//! An estimate is either a flat list of component lines (the original
//! shape) or a list of assembly items, each carrying the component lines it
//! was expanded from. Totals are fixed when the estimate is built; reading an
//! estimate never recomputes them from its children.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::impl_entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::component::{ComponentCategory, QualityTier};

/// A component bound to a quantity and a chosen quality tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLineItem {
    /// Line id (ULID), unique within the estimate
    pub id: String,

    pub component_id: EntityId,

    pub component_name: String,

    #[serde(default)]
    pub category: ComponentCategory,

    /// Copy of the tier at the time the line was priced
    pub quality_tier: QualityTier,

    pub quantity: f64,

    pub unit: String,

    /// Labor hours per unit, when labor is tracked for this component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor_hours: Option<f64>,

    /// Labor rate ($/hour) applied to this line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor_rate: Option<f64>,

    /// Material plus labor for the whole quantity
    pub total_cost: f64,
}

impl ComponentLineItem {
    /// Material cost: unit cost × quantity
    pub fn material_cost(&self) -> f64 {
        self.quality_tier.unit_cost * self.quantity
    }

    /// Labor cost: hours per unit × quantity × rate (zero when untracked)
    pub fn labor_cost(&self) -> f64 {
        match (self.labor_hours, self.labor_rate) {
            (Some(hours), Some(rate)) => hours * self.quantity * rate,
            _ => 0.0,
        }
    }

    /// Labor hours for the whole quantity
    pub fn total_labor_hours(&self) -> f64 {
        self.labor_hours.unwrap_or(0.0) * self.quantity
    }

    /// Change the quantity and re-derive the total
    pub fn set_quantity(&mut self, quantity: f64) {
        self.quantity = quantity;
        self.total_cost = self.material_cost() + self.labor_cost();
    }
}

/// An assembly added to an estimate with its own multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyEstimateItem {
    /// Line id (ULID), unique within the estimate
    pub id: String,

    pub assembly_id: EntityId,

    pub assembly_name: String,

    #[serde(default)]
    pub category: ComponentCategory,

    /// Number of assemblies (at least 1)
    pub quantity: u32,

    /// Material cost of one assembly
    pub total_material_cost: f64,

    /// Labor cost of one assembly
    pub total_labor_cost: f64,

    /// Labor hours of one assembly
    pub total_labor_hours: f64,

    /// Member lines for one assembly
    #[serde(default)]
    pub components: Vec<ComponentLineItem>,
}

impl AssemblyEstimateItem {
    /// Cost shown to the user: (material + labor) × quantity
    pub fn display_total(&self) -> f64 {
        (self.total_material_cost + self.total_labor_cost) * f64::from(self.quantity)
    }

    /// Material cost for all assemblies on this line
    pub fn scaled_material_cost(&self) -> f64 {
        self.total_material_cost * f64::from(self.quantity)
    }

    /// Labor cost for all assemblies on this line
    pub fn scaled_labor_cost(&self) -> f64 {
        self.total_labor_cost * f64::from(self.quantity)
    }

    /// Labor hours for all assemblies on this line
    pub fn scaled_labor_hours(&self) -> f64 {
        self.total_labor_hours * f64::from(self.quantity)
    }
}

/// The two estimate shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum EstimateBody {
    /// Component lines only
    Flat {
        #[serde(default)]
        items: Vec<ComponentLineItem>,
    },
    /// Assembly lines, each with nested component lines
    Hierarchical {
        #[serde(default)]
        assemblies: Vec<AssemblyEstimateItem>,
    },
}

impl Default for EstimateBody {
    fn default() -> Self {
        EstimateBody::Flat { items: Vec::new() }
    }
}

impl EstimateBody {
    pub fn shape(&self) -> &'static str {
        match self {
            EstimateBody::Flat { .. } => "flat",
            EstimateBody::Hierarchical { .. } => "hierarchical",
        }
    }

    /// Number of top-level lines
    pub fn line_count(&self) -> usize {
        match self {
            EstimateBody::Flat { items } => items.len(),
            EstimateBody::Hierarchical { assemblies } => assemblies.len(),
        }
    }
}

/// A saved estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimate {
    /// Unique identifier (EST-...)
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Project this estimate prices (PRJ-...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,

    /// Labor rate ($/hour) applied when the estimate was built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor_rate: Option<f64>,

    #[serde(flatten)]
    pub body: EstimateBody,

    /// Grand total fixed at save time
    pub total_cost: f64,

    /// Total labor hours fixed at save time
    pub total_labor_hours: f64,

    pub owner: String,

    pub created: DateTime<Utc>,

    pub updated: DateTime<Utc>,
}

impl_entity!(Estimate, EntityPrefix::Est, name);

impl Estimate {
    /// Flat lines, empty for hierarchical estimates
    pub fn items(&self) -> &[ComponentLineItem] {
        match &self.body {
            EstimateBody::Flat { items } => items,
            EstimateBody::Hierarchical { .. } => &[],
        }
    }

    /// Assembly lines, empty for flat estimates
    pub fn assemblies(&self) -> &[AssemblyEstimateItem] {
        match &self.body {
            EstimateBody::Flat { .. } => &[],
            EstimateBody::Hierarchical { assemblies } => assemblies,
        }
    }

    pub fn summary(&self) -> EstimateSummary {
        EstimateSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            shape: self.body.shape(),
            project_id: self.project_id.clone(),
            lines: self.body.line_count(),
            total_cost: self.total_cost,
            total_labor_hours: self.total_labor_hours,
            updated: self.updated,
        }
    }
}

/// List-view projection of an estimate
#[derive(Debug, Clone, Serialize)]
pub struct EstimateSummary {
    pub id: EntityId,
    pub name: String,
    pub shape: &'static str,
    pub project_id: Option<EntityId>,
    pub lines: usize,
    pub total_cost: f64,
    pub total_labor_hours: f64,
    pub updated: DateTime<Utc>,
}
