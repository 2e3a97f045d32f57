//! Cost roll-ups over estimate lines

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::component::{ComponentCategory, QualityTier};
use crate::entities::estimate::{Estimate, EstimateBody};

/// Round a currency amount to whole cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Material cost of the whole estimate
pub fn total_material_cost(estimate: &Estimate) -> f64 {
    match &estimate.body {
        EstimateBody::Flat { items } => items.iter().map(|i| i.material_cost()).sum(),
        EstimateBody::Hierarchical { assemblies } => {
            assemblies.iter().map(|a| a.scaled_material_cost()).sum()
        }
    }
}

/// Labor cost of the whole estimate
pub fn total_labor_cost(estimate: &Estimate) -> f64 {
    match &estimate.body {
        EstimateBody::Flat { items } => items.iter().map(|i| i.labor_cost()).sum(),
        EstimateBody::Hierarchical { assemblies } => {
            assemblies.iter().map(|a| a.scaled_labor_cost()).sum()
        }
    }
}

/// Labor hours of the whole estimate
pub fn total_labor_hours(estimate: &Estimate) -> f64 {
    match &estimate.body {
        EstimateBody::Flat { items } => items.iter().map(|i| i.total_labor_hours()).sum(),
        EstimateBody::Hierarchical { assemblies } => {
            assemblies.iter().map(|a| a.scaled_labor_hours()).sum()
        }
    }
}

/// Sum of the line totals as currently priced
pub fn grand_total(estimate: &Estimate) -> f64 {
    match &estimate.body {
        EstimateBody::Flat { items } => items.iter().map(|i| i.total_cost).sum(),
        EstimateBody::Hierarchical { assemblies } => {
            assemblies.iter().map(|a| a.display_total()).sum()
        }
    }
}

/// Headline numbers for one estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostTotals {
    pub material: f64,
    pub labor: f64,
    pub labor_hours: f64,
    pub total: f64,
}

impl CostTotals {
    pub fn of(estimate: &Estimate) -> Self {
        Self {
            material: round_cents(total_material_cost(estimate)),
            labor: round_cents(total_labor_cost(estimate)),
            labor_hours: total_labor_hours(estimate),
            total: round_cents(grand_total(estimate)),
        }
    }
}

/// One row of a per-category breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: ComponentCategory,
    pub lines: usize,
    pub material: f64,
    pub labor: f64,
    pub total: f64,
}

/// Totals grouped by trade category, in category order
///
/// Hierarchical estimates are grouped by the category of each member
/// component, scaled by the assembly quantity.
pub fn category_breakdown(estimate: &Estimate) -> Vec<CategoryTotal> {
    let mut map: BTreeMap<ComponentCategory, CategoryTotal> = BTreeMap::new();

    let mut add = |category: ComponentCategory, material: f64, labor: f64| {
        let row = map.entry(category).or_insert(CategoryTotal {
            category,
            lines: 0,
            material: 0.0,
            labor: 0.0,
            total: 0.0,
        });
        row.lines += 1;
        row.material += material;
        row.labor += labor;
        row.total += material + labor;
    };

    match &estimate.body {
        EstimateBody::Flat { items } => {
            for item in items {
                add(item.category, item.material_cost(), item.labor_cost());
            }
        }
        EstimateBody::Hierarchical { assemblies } => {
            for asm in assemblies {
                let k = f64::from(asm.quantity);
                for item in &asm.components {
                    add(item.category, item.material_cost() * k, item.labor_cost() * k);
                }
            }
        }
    }

    map.into_values()
        .map(|mut row| {
            row.material = round_cents(row.material);
            row.labor = round_cents(row.labor);
            row.total = round_cents(row.total);
            row
        })
        .collect()
}

/// Difference between the stored total and the total re-derived from lines
///
/// Reading an estimate never rewrites its stored total; this only reports.
pub fn stored_total_drift(estimate: &Estimate) -> Option<f64> {
    let drift = round_cents(grand_total(estimate) - estimate.total_cost);
    (drift.abs() >= 0.01).then_some(drift)
}

/// Visual treatment for a quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TierBadge {
    Secondary,
    Default,
    Destructive,
}

impl TierBadge {
    pub fn for_tier(tier: &QualityTier) -> Self {
        match tier.id.as_str() {
            "budget" => TierBadge::Secondary,
            "premium" => TierBadge::Destructive,
            _ => TierBadge::Default,
        }
    }

    pub fn paint(&self, text: &str) -> String {
        match self {
            TierBadge::Secondary => console::style(text).dim().to_string(),
            TierBadge::Default => text.to_string(),
            TierBadge::Destructive => console::style(text).red().to_string(),
        }
    }
}
