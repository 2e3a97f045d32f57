//! Estimate builder - turns catalog selections into costed line items

use chrono::Utc;
use thiserror::Error;
use ulid::Ulid;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::store::{Catalog, StoreError};
use crate::cost::rollup;
use crate::entities::assembly::Assembly;
use crate::entities::component::{Component, QualityTier};
use crate::entities::estimate::{
    AssemblyEstimateItem, ComponentLineItem, Estimate, EstimateBody,
};

#[derive(Debug, Error, miette::Diagnostic)]
pub enum BuildError {
    #[error("component '{0}' has no quality tiers to price it with")]
    #[diagnostic(code(dce::build::no_tiers), help("Add one with `dce cmp add-tier`."))]
    NoTiers(String),

    #[error("component '{component}' has no tier '{tier}'")]
    #[diagnostic(code(dce::build::unknown_tier))]
    UnknownTier { component: String, tier: String },

    #[error("quantity must be a finite number greater than zero, got {0}")]
    #[diagnostic(code(dce::build::quantity))]
    InvalidQuantity(f64),

    #[error("assembly quantity must be a whole number of at least 1, got {0}")]
    #[diagnostic(code(dce::build::assembly_quantity))]
    AssemblyQuantity(f64),

    #[error("no line '{0}' in this estimate")]
    #[diagnostic(code(dce::build::no_line))]
    NoSuchLine(String),

    #[error("an estimate holds either component lines or assemblies, not both")]
    #[diagnostic(code(dce::build::mixed_shapes))]
    MixedShapes,

    #[error("labor rate must be a non-negative amount, got {0}")]
    #[diagnostic(code(dce::build::labor_rate))]
    InvalidLaborRate(f64),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] StoreError),
}

/// Outcome of adding an assembly
#[derive(Debug, Clone)]
pub struct AssemblyAddition {
    /// Id of the new assembly line
    pub line_id: String,
    /// Members whose component could not be priced and were left out
    pub skipped: Vec<EntityId>,
}

/// Outcome of a quantity change
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityChange {
    Updated,
    Removed,
}

/// In-memory estimate being assembled or edited
#[derive(Debug, Clone)]
pub struct EstimateBuilder {
    id: EntityId,
    name: String,
    description: Option<String>,
    project_id: Option<EntityId>,
    labor_rate: Option<f64>,
    items: Vec<ComponentLineItem>,
    assemblies: Vec<AssemblyEstimateItem>,
    created: Option<chrono::DateTime<Utc>>,
}

impl EstimateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Est),
            name: name.into(),
            description: None,
            project_id: None,
            labor_rate: None,
            items: Vec::new(),
            assemblies: Vec::new(),
            created: None,
        }
    }

    /// Reopen a saved estimate for editing; id and creation time are kept
    pub fn from_estimate(estimate: Estimate) -> Self {
        let (items, assemblies) = match estimate.body {
            EstimateBody::Flat { items } => (items, Vec::new()),
            EstimateBody::Hierarchical { assemblies } => (Vec::new(), assemblies),
        };
        Self {
            id: estimate.id,
            name: estimate.name,
            description: estimate.description,
            project_id: estimate.project_id,
            labor_rate: estimate.labor_rate,
            items,
            assemblies,
            created: Some(estimate.created),
        }
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn project(mut self, project_id: Option<EntityId>) -> Self {
        self.project_id = project_id;
        self
    }

    /// Rate applied to lines added from now on
    pub fn labor_rate(mut self, rate: Option<f64>) -> Result<Self, BuildError> {
        if let Some(r) = rate {
            if !r.is_finite() || r < 0.0 {
                return Err(BuildError::InvalidLaborRate(r));
            }
        }
        self.labor_rate = rate;
        Ok(self)
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn items(&self) -> &[ComponentLineItem] {
        &self.items
    }

    pub fn assemblies(&self) -> &[AssemblyEstimateItem] {
        &self.assemblies
    }

    /// Add one unit of a component at a tier (first tier when `tier` is None)
    ///
    /// A line for the same component and tier gains one unit instead of
    /// being duplicated.
    pub fn add_component(
        &mut self,
        component: &Component,
        tier: Option<&str>,
    ) -> Result<&ComponentLineItem, BuildError> {
        let tier = pick_tier(component, tier)?.clone();

        let index = match self
            .items
            .iter()
            .position(|i| i.component_id == component.id && i.quality_tier.id == tier.id)
        {
            Some(index) => {
                let item = &mut self.items[index];
                item.set_quantity(item.quantity + 1.0);
                index
            }
            None => {
                self.items
                    .push(price_line(component, tier, 1.0, self.labor_rate));
                self.items.len() - 1
            }
        };

        Ok(&self.items[index])
    }

    /// Add `units` of a component in one step; returns the line id
    pub fn add_units(
        &mut self,
        component: &Component,
        tier: Option<&str>,
        units: f64,
    ) -> Result<String, BuildError> {
        if !units.is_finite() || units <= 0.0 {
            return Err(BuildError::InvalidQuantity(units));
        }
        let line = self.add_component(component, tier)?;
        let (line_id, quantity) = (line.id.clone(), line.quantity);
        if units != 1.0 {
            self.update_quantity(&line_id, quantity - 1.0 + units)?;
        }
        Ok(line_id)
    }

    /// Add `quantity` copies of an assembly, pricing members at their first tier
    ///
    /// All member components are resolved with a single catalog call.
    pub fn add_assembly<C: Catalog + ?Sized>(
        &mut self,
        assembly: &Assembly,
        quantity: u32,
        catalog: &C,
    ) -> Result<AssemblyAddition, BuildError> {
        if quantity == 0 {
            return Err(BuildError::AssemblyQuantity(0.0));
        }

        let resolved = catalog.resolve_components(&assembly.component_ids())?;

        let mut components = Vec::with_capacity(assembly.members.len());
        let mut skipped = Vec::new();

        for member in &assembly.members {
            let Some(component) = resolved.get(&member.component_id) else {
                tracing::warn!(
                    assembly = %assembly.id,
                    component = %member.component_id,
                    "assembly member not found in catalog, skipping"
                );
                skipped.push(member.component_id.clone());
                continue;
            };
            let Some(tier) = component.default_tier() else {
                tracing::warn!(
                    assembly = %assembly.id,
                    component = %member.component_id,
                    "assembly member has no quality tiers, skipping"
                );
                skipped.push(member.component_id.clone());
                continue;
            };
            components.push(price_line(
                component,
                tier.clone(),
                member.quantity,
                self.labor_rate,
            ));
        }

        let line_id = Ulid::new().to_string();
        self.assemblies.push(AssemblyEstimateItem {
            id: line_id.clone(),
            assembly_id: assembly.id.clone(),
            assembly_name: assembly.name.clone(),
            category: assembly.category,
            quantity,
            total_material_cost: components.iter().map(|c| c.material_cost()).sum(),
            total_labor_cost: components.iter().map(|c| c.labor_cost()).sum(),
            total_labor_hours: components.iter().map(|c| c.total_labor_hours()).sum(),
            components,
        });

        Ok(AssemblyAddition { line_id, skipped })
    }

    /// Set the quantity of a component or assembly line; zero or less removes it
    pub fn update_quantity(
        &mut self,
        line_id: &str,
        quantity: f64,
    ) -> Result<QuantityChange, BuildError> {
        if !quantity.is_finite() {
            return Err(BuildError::InvalidQuantity(quantity));
        }
        if quantity <= 0.0 {
            return if self.remove(line_id) {
                Ok(QuantityChange::Removed)
            } else {
                Err(BuildError::NoSuchLine(line_id.to_string()))
            };
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.id == line_id) {
            item.set_quantity(quantity);
            return Ok(QuantityChange::Updated);
        }

        if let Some(asm) = self.assemblies.iter_mut().find(|a| a.id == line_id) {
            if quantity.fract() != 0.0 || quantity > f64::from(u32::MAX) {
                return Err(BuildError::AssemblyQuantity(quantity));
            }
            asm.quantity = quantity as u32;
            return Ok(QuantityChange::Updated);
        }

        Err(BuildError::NoSuchLine(line_id.to_string()))
    }

    /// Remove a line by id (component or assembly)
    pub fn remove(&mut self, line_id: &str) -> bool {
        let before = self.items.len() + self.assemblies.len();
        self.items.retain(|i| i.id != line_id);
        self.assemblies.retain(|a| a.id != line_id);
        self.items.len() + self.assemblies.len() != before
    }

    /// Fix the totals and produce the estimate record
    pub fn build(self, owner: &str) -> Result<Estimate, BuildError> {
        let body = match (self.items.is_empty(), self.assemblies.is_empty()) {
            (false, false) => return Err(BuildError::MixedShapes),
            (_, false) => EstimateBody::Hierarchical {
                assemblies: self.assemblies,
            },
            _ => EstimateBody::Flat { items: self.items },
        };

        let now = Utc::now();
        let mut estimate = Estimate {
            id: self.id,
            name: self.name,
            description: self.description,
            project_id: self.project_id,
            labor_rate: self.labor_rate,
            body,
            total_cost: 0.0,
            total_labor_hours: 0.0,
            owner: owner.to_string(),
            created: self.created.unwrap_or(now),
            updated: now,
        };
        estimate.total_cost = rollup::grand_total(&estimate);
        estimate.total_labor_hours = rollup::total_labor_hours(&estimate);
        Ok(estimate)
    }
}

fn pick_tier<'a>(component: &'a Component, tier: Option<&str>) -> Result<&'a QualityTier, BuildError> {
    match tier {
        Some(key) => component.tier(key).ok_or_else(|| BuildError::UnknownTier {
            component: component.name.clone(),
            tier: key.to_string(),
        }),
        None => component
            .default_tier()
            .ok_or_else(|| BuildError::NoTiers(component.name.clone())),
    }
}

fn price_line(
    component: &Component,
    tier: QualityTier,
    quantity: f64,
    labor_rate: Option<f64>,
) -> ComponentLineItem {
    let mut line = ComponentLineItem {
        id: Ulid::new().to_string(),
        component_id: component.id.clone(),
        component_name: component.name.clone(),
        category: component.category,
        quality_tier: tier,
        quantity,
        unit: component.unit.clone(),
        labor_hours: component.labor_hours,
        labor_rate,
        total_cost: 0.0,
    };
    line.set_quantity(quantity);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::component::ComponentCategory;

    fn component(name: &str, unit_cost: f64, labor_hours: Option<f64>) -> Component {
        let mut cmp = Component::new(name, ComponentCategory::Power, "alice");
        cmp.labor_hours = labor_hours;
        cmp.add_tier(QualityTier::new("Standard", unit_cost, None).unwrap())
            .unwrap();
        cmp.add_tier(QualityTier::new("Premium", unit_cost * 2.0, None).unwrap())
            .unwrap();
        cmp
    }

    #[test]
    fn test_add_component_twice_increments_quantity() {
        let cmp = component("PDU", 1200.0, None);
        let mut builder = EstimateBuilder::new("Hall A");

        builder.add_component(&cmp, None).unwrap();
        let line = builder.add_component(&cmp, Some("standard")).unwrap();

        assert_eq!(line.quantity, 2.0);
        assert_eq!(line.total_cost, 2400.0);
        assert_eq!(builder.items().len(), 1);
    }

    #[test]
    fn test_different_tier_is_a_separate_line() {
        let cmp = component("PDU", 1200.0, None);
        let mut builder = EstimateBuilder::new("Hall A");

        builder.add_component(&cmp, Some("standard")).unwrap();
        builder.add_component(&cmp, Some("Premium")).unwrap();

        assert_eq!(builder.items().len(), 2);
        assert_eq!(builder.items()[1].total_cost, 2400.0);
    }

    #[test]
    fn test_add_component_errors() {
        let mut builder = EstimateBuilder::new("Hall A");
        let bare = Component::new("Bare", ComponentCategory::General, "alice");
        assert!(matches!(
            builder.add_component(&bare, None),
            Err(BuildError::NoTiers(_))
        ));

        let cmp = component("PDU", 10.0, None);
        assert!(matches!(
            builder.add_component(&cmp, Some("gold")),
            Err(BuildError::UnknownTier { .. })
        ));
    }

    #[test]
    fn test_line_total_is_unit_cost_times_quantity() {
        let cmp = component("Cable Tray", 42.35, None);
        let mut builder = EstimateBuilder::new("Hall A");
        let id = builder.add_component(&cmp, None).unwrap().id.clone();

        for q in [1.0, 7.0, 12.5, 300.0] {
            builder.update_quantity(&id, q).unwrap();
            let line = &builder.items()[0];
            assert!((line.total_cost - 42.35 * q).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let cmp = component("PDU", 1200.0, None);
        let mut builder = EstimateBuilder::new("Hall A");
        let id = builder.add_component(&cmp, None).unwrap().id.clone();

        assert_eq!(builder.update_quantity(&id, 0.0).unwrap(), QuantityChange::Removed);
        assert!(builder.items().is_empty());
        assert!(matches!(
            builder.update_quantity(&id, 0.0),
            Err(BuildError::NoSuchLine(_))
        ));
    }

    #[test]
    fn test_assembly_scenario_totals() {
        // tier $100, 3 per assembly, 1 h/unit at $85/h, 2 assemblies
        let cmp = component("Busway Tap", 100.0, Some(1.0));
        let mut asm = Assembly::new("Row Power", ComponentCategory::Power, "alice");
        asm.add_member(cmp.id.clone(), 3.0);

        let mut builder = EstimateBuilder::new("Test").labor_rate(Some(85.0)).unwrap();
        let added = builder.add_assembly(&asm, 2, &vec![cmp]).unwrap();
        assert!(added.skipped.is_empty());

        let line = &builder.assemblies()[0];
        assert_eq!(line.components[0].total_cost, 555.0);
        assert_eq!(line.total_material_cost, 300.0);
        assert_eq!(line.total_labor_cost, 255.0);
        assert_eq!(line.total_labor_hours, 3.0);
        assert_eq!(line.display_total(), 1110.0);

        let estimate = builder.build("alice").unwrap();
        assert_eq!(estimate.total_cost, 1110.0);
        assert_eq!(estimate.total_labor_hours, 6.0);
    }

    #[test]
    fn test_assembly_sums_members() {
        let a = component("A", 10.0, Some(0.5));
        let b = component("B", 20.0, None);
        let mut asm = Assembly::new("Pair", ComponentCategory::Power, "alice");
        asm.add_member(a.id.clone(), 4.0);
        asm.add_member(b.id.clone(), 2.5);

        let mut builder = EstimateBuilder::new("E").labor_rate(Some(100.0)).unwrap();
        builder.add_assembly(&asm, 1, &vec![a, b]).unwrap();

        let line = &builder.assemblies()[0];
        assert_eq!(line.total_material_cost, 10.0 * 4.0 + 20.0 * 2.5);
        assert_eq!(line.total_labor_cost, 0.5 * 4.0 * 100.0);
        assert_eq!(line.total_labor_hours, 2.0);
    }

    #[test]
    fn test_scaling_assembly_quantity_scales_total() {
        let cmp = component("Rack", 1500.0, Some(2.0));
        let mut asm = Assembly::new("Pod", ComponentCategory::Structural, "alice");
        asm.add_member(cmp.id.clone(), 10.0);

        let mut builder = EstimateBuilder::new("E").labor_rate(Some(90.0)).unwrap();
        let added = builder.add_assembly(&asm, 1, &vec![cmp]).unwrap();
        let single = builder.assemblies()[0].display_total();

        for k in [2u32, 5, 12] {
            builder.update_quantity(&added.line_id, f64::from(k)).unwrap();
            let scaled = builder.assemblies()[0].display_total();
            assert!((scaled - single * f64::from(k)).abs() < 1e-6);
        }

        assert!(matches!(
            builder.update_quantity(&added.line_id, 1.5),
            Err(BuildError::AssemblyQuantity(_))
        ));
        assert_eq!(
            builder.update_quantity(&added.line_id, -1.0).unwrap(),
            QuantityChange::Removed
        );
    }

    #[test]
    fn test_missing_member_is_skipped_and_reported() {
        let known = component("Known", 50.0, None);
        let mut asm = Assembly::new("Partial", ComponentCategory::Power, "alice");
        let missing = EntityId::new(EntityPrefix::Cmp);
        asm.add_member(known.id.clone(), 2.0);
        asm.add_member(missing.clone(), 5.0);

        let mut builder = EstimateBuilder::new("E");
        let added = builder.add_assembly(&asm, 1, &vec![known]).unwrap();

        assert_eq!(added.skipped, vec![missing]);
        let line = &builder.assemblies()[0];
        assert_eq!(line.components.len(), 1);
        assert_eq!(line.total_material_cost, 100.0);
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let cmp = component("X", 1.0, None);
        let mut asm = Assembly::new("Y", ComponentCategory::Power, "alice");
        asm.add_member(cmp.id.clone(), 1.0);

        let mut builder = EstimateBuilder::new("E");
        builder.add_component(&cmp, None).unwrap();
        builder.add_assembly(&asm, 1, &vec![cmp]).unwrap();

        assert!(matches!(builder.build("alice"), Err(BuildError::MixedShapes)));
    }

    #[test]
    fn test_reopen_keeps_identity() {
        let cmp = component("X", 10.0, None);
        let mut builder = EstimateBuilder::new("E");
        builder.add_component(&cmp, None).unwrap();
        let saved = builder.build("alice").unwrap();

        let mut reopened = EstimateBuilder::from_estimate(saved.clone());
        reopened.add_component(&cmp, None).unwrap();
        let edited = reopened.build("alice").unwrap();

        assert_eq!(edited.id, saved.id);
        assert_eq!(edited.created, saved.created);
        assert_eq!(edited.total_cost, 20.0);
    }

    #[test]
    fn test_non_finite_quantity_rejected() {
        let cmp = component("UPS", 100.0, Some(1.0));
        let mut builder = EstimateBuilder::new("E").labor_rate(Some(85.0)).unwrap();
        let id = builder.add_component(&cmp, None).unwrap().id.clone();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                builder.update_quantity(&id, bad),
                Err(BuildError::InvalidQuantity(_))
            ));
        }

        let estimate = builder.build("alice").unwrap();
        assert_eq!(estimate.total_cost, 185.0);
        assert!(estimate.total_cost.is_finite());
    }

    #[test]
    fn test_add_units() {
        let cmp = component("PDU", 40.0, None);
        let mut builder = EstimateBuilder::new("E");

        let first = builder.add_units(&cmp, None, 3.0).unwrap();
        let again = builder.add_units(&cmp, None, 2.0).unwrap();
        assert_eq!(first, again);
        assert_eq!(builder.items().len(), 1);
        assert_eq!(builder.items()[0].quantity, 5.0);
        assert_eq!(builder.items()[0].total_cost, 200.0);

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                builder.add_units(&cmp, None, bad),
                Err(BuildError::InvalidQuantity(_))
            ));
        }
        assert_eq!(builder.items()[0].quantity, 5.0);
    }

    #[test]
    fn test_negative_labor_rate_rejected() {
        assert!(matches!(
            EstimateBuilder::new("E").labor_rate(Some(-5.0)),
            Err(BuildError::InvalidLaborRate(_))
        ));
    }
}
