//! Project entity - a data-center build that estimates and costs roll up to

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::impl_entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::change_order::{ChangeOrder, ChangeOrderStatus};

/// Phase progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Planned,
    Active,
    Complete,
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseStatus::Planned => write!(f, "planned"),
            PhaseStatus::Active => write!(f, "active"),
            PhaseStatus::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for PhaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planned" => Ok(PhaseStatus::Planned),
            "active" => Ok(PhaseStatus::Active),
            "complete" => Ok(PhaseStatus::Complete),
            _ => Err(format!("Unknown phase status: {}", s)),
        }
    }
}

/// A schedule phase (design, shell, fit-out, commissioning, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,

    pub start: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,

    #[serde(default)]
    pub status: PhaseStatus,
}

/// Project entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (PRJ-...)
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Approved budget before change orders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<Phase>,

    pub owner: String,

    pub created: DateTime<Utc>,
}

impl_entity!(Project, EntityPrefix::Prj, name);

impl Project {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Prj),
            name: name.into(),
            description: None,
            location: None,
            budget: None,
            phases: Vec::new(),
            owner: owner.into(),
            created: Utc::now(),
        }
    }

    /// Add a phase; phases are kept ordered by start date
    pub fn add_phase(&mut self, phase: Phase) -> Result<(), String> {
        if let Some(end) = phase.end {
            if end < phase.start {
                return Err(format!(
                    "phase '{}' ends ({}) before it starts ({})",
                    phase.name, end, phase.start
                ));
            }
        }
        if self.phases.iter().any(|p| p.name.eq_ignore_ascii_case(&phase.name)) {
            return Err(format!("phase '{}' already exists", phase.name));
        }
        self.phases.push(phase);
        self.phases.sort_by_key(|p| p.start);
        Ok(())
    }

    /// The phase currently marked active, if any
    pub fn active_phase(&self) -> Option<&Phase> {
        self.phases.iter().find(|p| p.status == PhaseStatus::Active)
    }

    /// Sum of approved change orders belonging to this project
    pub fn approved_changes(&self, change_orders: &[ChangeOrder]) -> f64 {
        change_orders
            .iter()
            .filter(|c| c.project_id == self.id && c.status == ChangeOrderStatus::Approved)
            .map(|c| c.amount)
            .sum()
    }

    /// Budget plus approved change orders; None when no budget is set
    pub fn adjusted_budget(&self, change_orders: &[ChangeOrder]) -> Option<f64> {
        self.budget
            .map(|budget| budget + self.approved_changes(change_orders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_phases_sorted_and_validated() {
        let mut prj = Project::new("DAL-1", "alice");
        prj.add_phase(Phase {
            name: "Fit-out".into(),
            start: date("2026-06-01"),
            end: None,
            status: PhaseStatus::Planned,
        })
        .unwrap();
        prj.add_phase(Phase {
            name: "Shell".into(),
            start: date("2026-01-15"),
            end: Some(date("2026-05-30")),
            status: PhaseStatus::Active,
        })
        .unwrap();

        assert_eq!(prj.phases[0].name, "Shell");
        assert_eq!(prj.active_phase().unwrap().name, "Shell");

        let backwards = Phase {
            name: "Commissioning".into(),
            start: date("2026-09-01"),
            end: Some(date("2026-08-01")),
            status: PhaseStatus::Planned,
        };
        assert!(prj.add_phase(backwards).is_err());

        let duplicate = Phase {
            name: "shell".into(),
            start: date("2026-02-01"),
            end: None,
            status: PhaseStatus::Planned,
        };
        assert!(prj.add_phase(duplicate).is_err());
    }

    #[test]
    fn test_adjusted_budget_counts_only_approved_changes() {
        let mut prj = Project::new("DAL-1", "alice");
        prj.budget = Some(1_000_000.0);

        let mut approved = ChangeOrder::new(prj.id.clone(), "Extra CRAH", 25_000.0, "alice");
        approved.approve();
        let pending = ChangeOrder::new(prj.id.clone(), "Upsize feeders", 40_000.0, "alice");
        let mut credit = ChangeOrder::new(prj.id.clone(), "Delete canopy", -5_000.0, "alice");
        credit.approve();
        let other = {
            let mut c = ChangeOrder::new(EntityId::new(EntityPrefix::Prj), "Other", 99.0, "alice");
            c.approve();
            c
        };

        let changes = vec![approved, pending, credit, other];
        assert_eq!(prj.approved_changes(&changes), 20_000.0);
        assert_eq!(prj.adjusted_budget(&changes), Some(1_020_000.0));

        prj.budget = None;
        assert_eq!(prj.adjusted_budget(&changes), None);
    }
}
