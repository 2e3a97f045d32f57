//! Change order entity - approved or pending scope changes on a project

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::impl_entity;
use crate::core::identity::{EntityId, EntityPrefix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrderStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ChangeOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOrderStatus::Pending => write!(f, "pending"),
            ChangeOrderStatus::Approved => write!(f, "approved"),
            ChangeOrderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A change to a project's budget; negative amounts are credits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeOrder {
    /// Unique identifier (CHG-...)
    pub id: EntityId,

    pub project_id: EntityId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub amount: f64,

    #[serde(default)]
    pub status: ChangeOrderStatus,

    /// When the order was approved or rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided: Option<DateTime<Utc>>,

    pub owner: String,

    pub created: DateTime<Utc>,
}

impl_entity!(ChangeOrder, EntityPrefix::Chg, title);

impl ChangeOrder {
    pub fn new(
        project_id: EntityId,
        title: impl Into<String>,
        amount: f64,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Chg),
            project_id,
            title: title.into(),
            description: None,
            amount,
            status: ChangeOrderStatus::Pending,
            decided: None,
            owner: owner.into(),
            created: Utc::now(),
        }
    }

    pub fn approve(&mut self) {
        self.decide(ChangeOrderStatus::Approved);
    }

    pub fn reject(&mut self) {
        self.decide(ChangeOrderStatus::Rejected);
    }

    fn decide(&mut self, status: ChangeOrderStatus) {
        self.status = status;
        self.decided = Some(Utc::now());
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChangeOrderStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_records_timestamp() {
        let mut chg = ChangeOrder::new(EntityId::new(EntityPrefix::Prj), "Add generator", 250_000.0, "bob");
        assert!(chg.is_pending());
        assert!(chg.decided.is_none());

        chg.reject();
        assert_eq!(chg.status, ChangeOrderStatus::Rejected);
        assert!(chg.decided.is_some());
    }
}
