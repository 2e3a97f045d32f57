//! Estimated-versus-actual variance analysis

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::identity::EntityId;
use crate::cost::rollup::round_cents;
use crate::entities::actual_cost::ActualCost;
use crate::entities::estimate::{ComponentLineItem, Estimate, EstimateBody};

/// A line whose overrun exceeds this percentage is critical
pub const CRITICAL_VARIANCE_PCT: f64 = 10.0;

/// Percentage of `variance` relative to `estimated`; None for a zero estimate
pub fn variance_percentage(estimated: f64, variance: f64) -> Option<f64> {
    if estimated == 0.0 {
        None
    } else {
        Some(variance / estimated * 100.0)
    }
}

/// Planned quantity and cost of one component across an estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatedLine {
    pub component_id: EntityId,
    pub component_name: String,
    pub quantity: f64,
    pub total: f64,
}

impl EstimatedLine {
    /// Blended unit cost (zero when nothing is planned)
    pub fn unit_cost(&self) -> f64 {
        if self.quantity == 0.0 {
            0.0
        } else {
            self.total / self.quantity
        }
    }
}

/// Planned quantities and costs per component, assemblies flattened
pub fn estimated_lines(estimate: &Estimate) -> Vec<EstimatedLine> {
    let mut lines: Vec<EstimatedLine> = Vec::new();

    let mut add = |item: &ComponentLineItem, factor: f64| {
        let quantity = item.quantity * factor;
        let total = item.total_cost * factor;
        match lines.iter_mut().find(|l| l.component_id == item.component_id) {
            Some(line) => {
                line.quantity += quantity;
                line.total += total;
            }
            None => lines.push(EstimatedLine {
                component_id: item.component_id.clone(),
                component_name: item.component_name.clone(),
                quantity,
                total,
            }),
        }
    };

    match &estimate.body {
        EstimateBody::Flat { items } => {
            for item in items {
                add(item, 1.0);
            }
        }
        EstimateBody::Hierarchical { assemblies } => {
            for asm in assemblies {
                for item in &asm.components {
                    add(item, f64::from(asm.quantity));
                }
            }
        }
    }

    lines
}

/// Comparison for one component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceAnalysis {
    pub component_id: EntityId,
    pub component_name: String,
    pub estimated_quantity: f64,
    pub estimated_unit_cost: f64,
    pub estimated_total: f64,
    pub actual_quantity: f64,
    pub actual_unit_cost: f64,
    pub actual_total: f64,
    pub cost_variance: f64,
    pub cost_variance_percentage: Option<f64>,
}

impl VarianceAnalysis {
    /// Overrun strictly above the critical threshold
    pub fn is_critical(&self) -> bool {
        self.cost_variance_percentage
            .is_some_and(|pct| pct > CRITICAL_VARIANCE_PCT)
    }
}

/// Variance of a whole estimate against its recorded actuals
#[derive(Debug, Clone, Serialize)]
pub struct VarianceReport {
    pub estimate_id: EntityId,
    pub lines: Vec<VarianceAnalysis>,
    /// Actuals for components the estimate does not contain
    pub unmatched_actuals: Vec<EntityId>,
    pub estimated_total: f64,
    /// Every actual passed in, matched or not
    pub actual_total: f64,
    pub cost_variance: f64,
    pub cost_variance_percentage: Option<f64>,
}

impl VarianceReport {
    pub fn critical_lines(&self) -> impl Iterator<Item = &VarianceAnalysis> {
        self.lines.iter().filter(|l| l.is_critical())
    }

    pub fn critical_count(&self) -> usize {
        self.critical_lines().count()
    }
}

/// Compare an estimate with the actual costs recorded against it
///
/// Every estimated component gets a line, with zero actuals if nothing was
/// recorded for it. The estimate's stored total is the baseline.
pub fn analyze(estimate: &Estimate, actuals: &[ActualCost]) -> VarianceReport {
    let planned = estimated_lines(estimate);

    let mut spent: BTreeMap<&EntityId, (f64, f64)> = BTreeMap::new();
    let mut unmatched = Vec::new();
    for actual in actuals {
        if planned.iter().any(|p| p.component_id == actual.component_id) {
            let entry = spent.entry(&actual.component_id).or_insert((0.0, 0.0));
            entry.0 += actual.actual_quantity;
            entry.1 += actual.actual_total_cost;
        } else {
            tracing::debug!(
                actual = %actual.id,
                component = %actual.component_id,
                "actual cost has no matching estimate line"
            );
            unmatched.push(actual.id.clone());
        }
    }

    let lines: Vec<VarianceAnalysis> = planned
        .iter()
        .map(|p| {
            let (actual_quantity, actual_total) =
                spent.get(&p.component_id).copied().unwrap_or((0.0, 0.0));
            let actual_unit_cost = if actual_quantity == 0.0 {
                0.0
            } else {
                actual_total / actual_quantity
            };
            let cost_variance = round_cents(actual_total - p.total);
            VarianceAnalysis {
                component_id: p.component_id.clone(),
                component_name: p.component_name.clone(),
                estimated_quantity: p.quantity,
                estimated_unit_cost: round_cents(p.unit_cost()),
                estimated_total: round_cents(p.total),
                actual_quantity,
                actual_unit_cost: round_cents(actual_unit_cost),
                actual_total: round_cents(actual_total),
                cost_variance,
                cost_variance_percentage: variance_percentage(p.total, actual_total - p.total),
            }
        })
        .collect();

    let actual_total = round_cents(actuals.iter().map(|a| a.actual_total_cost).sum());
    let estimated_total = round_cents(estimate.total_cost);
    let cost_variance = round_cents(actual_total - estimated_total);

    VarianceReport {
        estimate_id: estimate.id.clone(),
        lines,
        unmatched_actuals: unmatched,
        estimated_total,
        actual_total,
        cost_variance,
        cost_variance_percentage: variance_percentage(estimated_total, cost_variance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use crate::cost::builder::EstimateBuilder;
    use crate::entities::actual_cost::ActualCostDraft;
    use crate::entities::assembly::Assembly;
    use crate::entities::component::{Component, ComponentCategory, QualityTier};
    use chrono::NaiveDate;

    fn component(name: &str, unit_cost: f64) -> Component {
        let mut cmp = Component::new(name, ComponentCategory::Cooling, "alice");
        cmp.add_tier(QualityTier::new("Standard", unit_cost, None).unwrap())
            .unwrap();
        cmp
    }

    fn actual(project: &EntityId, cmp: &Component, quantity: f64, unit_cost: f64) -> ActualCost {
        let day = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        ActualCost::record(
            ActualCostDraft {
                project_id: project.clone(),
                component_id: cmp.id.clone(),
                component_name: cmp.name.clone(),
                actual_quantity: quantity,
                actual_unit_cost: unit_cost,
                cost_date: day,
                vendor: None,
                po_number: None,
                invoice_number: None,
                notes: None,
            },
            day,
            "alice",
        )
        .unwrap()
    }

    #[test]
    fn test_zero_estimate_has_no_percentage() {
        assert_eq!(variance_percentage(0.0, 500.0), None);
        assert_eq!(variance_percentage(0.0, 0.0), None);
        assert_eq!(variance_percentage(200.0, 50.0), Some(25.0));
    }

    #[test]
    fn test_analyze_flat_estimate() {
        let chiller = component("Chiller", 1000.0);
        let crah = component("CRAH", 500.0);
        let stray = component("Stray", 10.0);
        let project = EntityId::new(EntityPrefix::Prj);

        let mut builder = EstimateBuilder::new("Cooling");
        builder.add_component(&chiller, None).unwrap();
        let crah_line = builder.add_component(&crah, None).unwrap().id.clone();
        builder.update_quantity(&crah_line, 4.0).unwrap();
        let estimate = builder.build("alice").unwrap();

        let actuals = vec![
            actual(&project, &chiller, 1.0, 1150.0),
            actual(&project, &crah, 4.0, 490.0),
            actual(&project, &stray, 2.0, 10.0),
        ];
        let report = analyze(&estimate, &actuals);

        assert_eq!(report.lines.len(), 2);
        let chiller_line = &report.lines[0];
        assert_eq!(chiller_line.cost_variance, 150.0);
        assert_eq!(chiller_line.cost_variance_percentage, Some(15.0));
        assert!(chiller_line.is_critical());

        let crah_row = &report.lines[1];
        assert_eq!(crah_row.estimated_unit_cost, 500.0);
        assert_eq!(crah_row.actual_unit_cost, 490.0);
        assert_eq!(crah_row.cost_variance, -40.0);
        assert!(!crah_row.is_critical());

        assert_eq!(report.unmatched_actuals, vec![actuals[2].id.clone()]);
        assert_eq!(report.estimated_total, 3000.0);
        assert_eq!(report.actual_total, 1150.0 + 1960.0 + 20.0);
        assert_eq!(report.critical_count(), 1);
    }

    #[test]
    fn test_exactly_ten_percent_is_not_critical() {
        let cmp = component("Pump", 100.0);
        let project = EntityId::new(EntityPrefix::Prj);
        let mut builder = EstimateBuilder::new("E");
        builder.add_component(&cmp, None).unwrap();
        let estimate = builder.build("alice").unwrap();

        let report = analyze(&estimate, &[actual(&project, &cmp, 1.0, 110.0)]);
        assert_eq!(report.lines[0].cost_variance_percentage, Some(10.0));
        assert!(!report.lines[0].is_critical());
    }

    #[test]
    fn test_zero_cost_line_never_nan() {
        let free = component("Donated Rack", 0.0);
        let project = EntityId::new(EntityPrefix::Prj);
        let mut builder = EstimateBuilder::new("E");
        builder.add_component(&free, None).unwrap();
        let estimate = builder.build("alice").unwrap();

        let report = analyze(&estimate, &[actual(&project, &free, 1.0, 25.0)]);
        assert_eq!(report.lines[0].cost_variance, 25.0);
        assert_eq!(report.lines[0].cost_variance_percentage, None);
        assert!(!report.lines[0].is_critical());
        assert_eq!(report.cost_variance_percentage, None);
    }

    #[test]
    fn test_assemblies_are_flattened() {
        let cmp = component("Fan Wall", 200.0);
        let mut asm = Assembly::new("Hall Cooling", ComponentCategory::Cooling, "alice");
        asm.add_member(cmp.id.clone(), 3.0);

        let mut builder = EstimateBuilder::new("E");
        builder.add_assembly(&asm, 2, &vec![cmp.clone()]).unwrap();
        let estimate = builder.build("alice").unwrap();

        let lines = estimated_lines(&estimate);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 6.0);
        assert_eq!(lines[0].total, 1200.0);
        assert_eq!(lines[0].unit_cost(), 200.0);
    }
}
