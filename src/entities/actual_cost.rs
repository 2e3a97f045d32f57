//! Actual cost entity - recorded real-world spend against a project component

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::impl_entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// Input for recording an actual cost, before validation
#[derive(Debug, Clone)]
pub struct ActualCostDraft {
    pub project_id: EntityId,
    pub component_id: EntityId,
    pub component_name: String,
    pub actual_quantity: f64,
    pub actual_unit_cost: f64,
    pub cost_date: NaiveDate,
    pub vendor: Option<String>,
    pub po_number: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

/// Rejections when recording an actual cost
#[derive(Debug, Error, miette::Diagnostic, PartialEq)]
pub enum ActualCostError {
    #[error("cost date {date} is in the future (today is {today})")]
    #[diagnostic(code(dce::actual::future_date), help("Actual costs can only be recorded once incurred."))]
    FutureDate { date: NaiveDate, today: NaiveDate },

    #[error("actual quantity must be greater than zero, got {0}")]
    #[diagnostic(code(dce::actual::quantity))]
    NonPositiveQuantity(f64),

    #[error("actual unit cost must not be negative, got {0}")]
    #[diagnostic(code(dce::actual::unit_cost))]
    NegativeUnitCost(f64),
}

/// A recorded expenditure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualCost {
    /// Unique identifier (ACT-...)
    pub id: EntityId,

    pub project_id: EntityId,

    pub component_id: EntityId,

    pub component_name: String,

    pub actual_quantity: f64,

    pub actual_unit_cost: f64,

    /// actual_quantity × actual_unit_cost, fixed when recorded
    pub actual_total_cost: f64,

    pub cost_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub owner: String,

    pub created: DateTime<Utc>,
}

impl_entity!(ActualCost, EntityPrefix::Act, component_name);

impl ActualCost {
    /// Validate a draft against `today` and compute its total
    ///
    /// The date check runs first so a future-dated entry is always reported
    /// as such, whatever else is wrong with it.
    pub fn record(
        draft: ActualCostDraft,
        today: NaiveDate,
        owner: impl Into<String>,
    ) -> Result<Self, ActualCostError> {
        if draft.cost_date > today {
            return Err(ActualCostError::FutureDate {
                date: draft.cost_date,
                today,
            });
        }
        if !(draft.actual_quantity > 0.0) || !draft.actual_quantity.is_finite() {
            return Err(ActualCostError::NonPositiveQuantity(draft.actual_quantity));
        }
        if !(draft.actual_unit_cost >= 0.0) || !draft.actual_unit_cost.is_finite() {
            return Err(ActualCostError::NegativeUnitCost(draft.actual_unit_cost));
        }

        Ok(Self {
            id: EntityId::new(EntityPrefix::Act),
            project_id: draft.project_id,
            component_id: draft.component_id,
            component_name: draft.component_name,
            actual_quantity: draft.actual_quantity,
            actual_unit_cost: draft.actual_unit_cost,
            actual_total_cost: draft.actual_quantity * draft.actual_unit_cost,
            cost_date: draft.cost_date,
            vendor: draft.vendor,
            po_number: draft.po_number,
            invoice_number: draft.invoice_number,
            notes: draft.notes,
            owner: owner.into(),
            created: Utc::now(),
        })
    }

    /// Whether the stored total still equals quantity × unit cost (to the cent)
    pub fn total_is_consistent(&self) -> bool {
        let expected = self.actual_quantity * self.actual_unit_cost;
        (expected - self.actual_total_cost).abs() < 0.005
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn draft(quantity: f64, unit_cost: f64, on: &str) -> ActualCostDraft {
        ActualCostDraft {
            project_id: EntityId::new(EntityPrefix::Prj),
            component_id: EntityId::new(EntityPrefix::Cmp),
            component_name: "Cat6A Drop".to_string(),
            actual_quantity: quantity,
            actual_unit_cost: unit_cost,
            cost_date: date(on),
            vendor: Some("Graybar".to_string()),
            po_number: Some("PO-1042".to_string()),
            invoice_number: None,
            notes: None,
        }
    }

    #[test]
    fn test_record_computes_total() {
        let cost = ActualCost::record(draft(40.0, 12.5, "2026-03-01"), date("2026-03-02"), "alice")
            .unwrap();
        assert_eq!(cost.actual_total_cost, 500.0);
        assert!(cost.total_is_consistent());
        assert!(cost.id.to_string().starts_with("ACT-"));
    }

    #[test]
    fn test_same_day_is_allowed() {
        assert!(ActualCost::record(draft(1.0, 1.0, "2026-03-02"), date("2026-03-02"), "alice").is_ok());
    }

    #[test]
    fn test_future_date_is_distinguishable_from_negative_quantity() {
        let today = date("2026-03-02");

        let future = ActualCost::record(draft(5.0, 10.0, "2026-04-01"), today, "alice").unwrap_err();
        assert!(matches!(future, ActualCostError::FutureDate { .. }));

        let negative = ActualCost::record(draft(-5.0, 10.0, "2026-02-01"), today, "alice").unwrap_err();
        assert_eq!(negative, ActualCostError::NonPositiveQuantity(-5.0));

        assert_ne!(future, negative);
    }

    #[test]
    fn test_negative_unit_cost_rejected() {
        let err = ActualCost::record(draft(1.0, -0.01, "2026-01-01"), date("2026-03-02"), "alice")
            .unwrap_err();
        assert_eq!(err, ActualCostError::NegativeUnitCost(-0.01));
    }

    #[test]
    fn test_nan_quantity_rejected() {
        let err = ActualCost::record(draft(f64::NAN, 1.0, "2026-01-01"), date("2026-03-02"), "alice")
            .unwrap_err();
        assert!(matches!(err, ActualCostError::NonPositiveQuantity(_)));
    }
}
