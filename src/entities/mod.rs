//! Entity types - the records a workspace stores

pub mod actual_cost;
pub mod assembly;
pub mod change_order;
pub mod component;
pub mod conversation;
pub mod estimate;
pub mod project;

pub use actual_cost::{ActualCost, ActualCostDraft, ActualCostError};
pub use assembly::{Assembly, AssemblyMember};
pub use change_order::{ChangeOrder, ChangeOrderStatus};
pub use component::{Component, ComponentCategory, QualityTier, TierError};
pub use conversation::{ChatMessage, ChatRole, Conversation};
pub use estimate::{AssemblyEstimateItem, ComponentLineItem, Estimate, EstimateBody, EstimateSummary};
pub use project::{Phase, PhaseStatus, Project};
