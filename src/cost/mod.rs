//! Cost engine - estimate building, roll-ups, variance and exports

pub mod builder;
pub mod export;
pub mod portfolio;
pub mod rollup;
pub mod variance;

pub use builder::{AssemblyAddition, BuildError, EstimateBuilder, QuantityChange};
pub use portfolio::Dashboard;
pub use rollup::{category_breakdown, round_cents, CategoryTotal, CostTotals, TierBadge};
pub use variance::{analyze, variance_percentage, VarianceAnalysis, VarianceReport, CRITICAL_VARIANCE_PCT};
