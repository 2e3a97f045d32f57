//! Portfolio overview across every estimate and project in a workspace

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::identity::EntityId;
use crate::cost::rollup::{category_breakdown, round_cents, CategoryTotal};
use crate::cost::variance::analyze;
use crate::entities::actual_cost::ActualCost;
use crate::entities::change_order::ChangeOrder;
use crate::entities::component::ComponentCategory;
use crate::entities::estimate::Estimate;
use crate::entities::project::Project;

/// Largest estimate by stored total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargestEstimate {
    pub id: EntityId,
    pub name: String,
    pub total_cost: f64,
}

/// Spend and variance status for one project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStatus {
    pub id: EntityId,
    pub name: String,
    pub budget: Option<f64>,
    pub adjusted_budget: Option<f64>,
    pub estimated: f64,
    pub spent: f64,
    pub estimates: usize,
    /// Critical component lines summed over the project's estimates
    pub critical_lines: usize,
    pub pending_change_orders: usize,
}

impl ProjectStatus {
    /// Spend above the adjusted budget
    pub fn over_budget(&self) -> bool {
        self.adjusted_budget.is_some_and(|b| self.spent > b)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub estimate_count: usize,
    pub total_estimated: f64,
    pub average_estimate: Option<f64>,
    pub largest_estimate: Option<LargestEstimate>,
    pub total_spent: f64,
    pub projects: Vec<ProjectStatus>,
    pub categories: Vec<CategoryTotal>,
}

impl Dashboard {
    pub fn compute(
        estimates: &[Estimate],
        projects: &[Project],
        actuals: &[ActualCost],
        change_orders: &[ChangeOrder],
    ) -> Self {
        let total_estimated: f64 = estimates.iter().map(|e| e.total_cost).sum();
        let average_estimate = (!estimates.is_empty())
            .then(|| round_cents(total_estimated / estimates.len() as f64));

        let largest_estimate = estimates
            .iter()
            .max_by(|a, b| a.total_cost.total_cmp(&b.total_cost))
            .map(|e| LargestEstimate {
                id: e.id.clone(),
                name: e.name.clone(),
                total_cost: e.total_cost,
            });

        let projects = projects
            .iter()
            .map(|p| project_status(p, estimates, actuals, change_orders))
            .collect();

        Self {
            estimate_count: estimates.len(),
            total_estimated: round_cents(total_estimated),
            average_estimate,
            largest_estimate,
            total_spent: round_cents(actuals.iter().map(|a| a.actual_total_cost).sum()),
            projects,
            categories: merge_categories(estimates),
        }
    }

    pub fn critical_projects(&self) -> usize {
        self.projects.iter().filter(|p| p.critical_lines > 0).count()
    }
}

fn project_status(
    project: &Project,
    estimates: &[Estimate],
    actuals: &[ActualCost],
    change_orders: &[ChangeOrder],
) -> ProjectStatus {
    let own_estimates: Vec<&Estimate> = estimates
        .iter()
        .filter(|e| e.project_id.as_ref() == Some(&project.id))
        .collect();
    let own_actuals: Vec<ActualCost> = actuals
        .iter()
        .filter(|a| a.project_id == project.id)
        .cloned()
        .collect();

    let critical_lines = own_estimates
        .iter()
        .map(|e| analyze(e, &own_actuals).critical_count())
        .sum();

    ProjectStatus {
        id: project.id.clone(),
        name: project.name.clone(),
        budget: project.budget,
        adjusted_budget: project.adjusted_budget(change_orders),
        estimated: round_cents(own_estimates.iter().map(|e| e.total_cost).sum()),
        spent: round_cents(own_actuals.iter().map(|a| a.actual_total_cost).sum()),
        estimates: own_estimates.len(),
        critical_lines,
        pending_change_orders: change_orders
            .iter()
            .filter(|c| c.project_id == project.id && c.is_pending())
            .count(),
    }
}

fn merge_categories(estimates: &[Estimate]) -> Vec<CategoryTotal> {
    let mut merged: BTreeMap<ComponentCategory, CategoryTotal> = BTreeMap::new();
    for row in estimates.iter().flat_map(category_breakdown) {
        let entry = merged.entry(row.category).or_insert(CategoryTotal {
            category: row.category,
            lines: 0,
            material: 0.0,
            labor: 0.0,
            total: 0.0,
        });
        entry.lines += row.lines;
        entry.material = round_cents(entry.material + row.material);
        entry.labor = round_cents(entry.labor + row.labor);
        entry.total = round_cents(entry.total + row.total);
    }
    merged.into_values().collect()
}
