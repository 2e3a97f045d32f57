//! Component entity type - catalog items priced through quality tiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::impl_entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// Trade category of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Power,
    Cooling,
    Electrical,
    Mechanical,
    Network,
    Structural,
    FireProtection,
    Security,
    #[default]
    General,
}

impl ComponentCategory {
    pub fn all() -> &'static [ComponentCategory] {
        &[
            ComponentCategory::Power,
            ComponentCategory::Cooling,
            ComponentCategory::Electrical,
            ComponentCategory::Mechanical,
            ComponentCategory::Network,
            ComponentCategory::Structural,
            ComponentCategory::FireProtection,
            ComponentCategory::Security,
            ComponentCategory::General,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentCategory::Power => "power",
            ComponentCategory::Cooling => "cooling",
            ComponentCategory::Electrical => "electrical",
            ComponentCategory::Mechanical => "mechanical",
            ComponentCategory::Network => "network",
            ComponentCategory::Structural => "structural",
            ComponentCategory::FireProtection => "fire_protection",
            ComponentCategory::Security => "security",
            ComponentCategory::General => "general",
        }
    }
}

impl std::fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ComponentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace(['-', ' '], "_");
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Invalid category: {}. Use power, cooling, electrical, mechanical, network, structural, fire_protection, security, or general",
                    s
                )
            })
    }
}

/// A named price point for a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTier {
    /// Slug of the name, unique within the component
    pub id: String,

    /// Display name (e.g., "Standard")
    pub name: String,

    /// Material cost per unit
    pub unit_cost: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl QualityTier {
    /// Create a validated tier; the id is derived from the name
    pub fn new(
        name: impl Into<String>,
        unit_cost: f64,
        description: Option<String>,
    ) -> Result<Self, TierError> {
        let name = name.into();
        let id = tier_slug(&name);
        if id.is_empty() {
            return Err(TierError::EmptyName);
        }
        validate_unit_cost(unit_cost)?;
        Ok(Self {
            id,
            name,
            unit_cost,
            description,
        })
    }
}

/// Derive a tier id from its display name
pub fn tier_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Check that a currency value is non-negative with at most two decimals
pub fn validate_unit_cost(unit_cost: f64) -> Result<(), TierError> {
    if !unit_cost.is_finite() || unit_cost < 0.0 {
        return Err(TierError::NegativeCost(unit_cost));
    }
    let cents = unit_cost * 100.0;
    if (cents - cents.round()).abs() > 1e-6 {
        return Err(TierError::SubCentPrecision(unit_cost));
    }
    Ok(())
}

/// Quality tier validation failures
#[derive(Debug, Error, miette::Diagnostic, PartialEq)]
pub enum TierError {
    #[error("quality tier name must not be empty")]
    #[diagnostic(code(dce::tier::name))]
    EmptyName,

    #[error("unit cost must be a non-negative amount, got {0}")]
    #[diagnostic(code(dce::tier::negative))]
    NegativeCost(f64),

    #[error("unit cost {0} has more than two decimal places")]
    #[diagnostic(code(dce::tier::precision))]
    SubCentPrecision(f64),

    #[error("component already has a tier with id '{0}'")]
    #[diagnostic(code(dce::tier::duplicate))]
    Duplicate(String),
}

/// A Component entity - a priced catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Unique identifier
    pub id: EntityId,

    /// Short name (e.g., "500 kVA UPS Module")
    pub name: String,

    #[serde(default)]
    pub category: ComponentCategory,

    /// Unit of measure (ea, ft, m, ...)
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Installation labor hours per unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor_hours: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Price points, first is the default
    #[serde(default)]
    pub tiers: Vec<QualityTier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub owner: String,

    pub created: DateTime<Utc>,
}

fn default_unit() -> String {
    "ea".to_string()
}

impl_entity!(Component, EntityPrefix::Cmp, name);

impl Component {
    /// Create a new component without tiers
    pub fn new(name: impl Into<String>, category: ComponentCategory, owner: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Cmp),
            name: name.into(),
            category,
            unit: default_unit(),
            labor_hours: None,
            manufacturer: None,
            description: None,
            tiers: Vec::new(),
            tags: Vec::new(),
            owner: owner.into(),
            created: Utc::now(),
        }
    }

    /// Append a tier, rejecting duplicate ids
    pub fn add_tier(&mut self, tier: QualityTier) -> Result<&QualityTier, TierError> {
        if self.tier(&tier.id).is_some() {
            return Err(TierError::Duplicate(tier.id));
        }
        self.tiers.push(tier);
        Ok(&self.tiers[self.tiers.len() - 1])
    }

    /// Look up a tier by id or (case-insensitive) name
    pub fn tier(&self, key: &str) -> Option<&QualityTier> {
        let slug = tier_slug(key);
        self.tiers
            .iter()
            .find(|t| t.id == key || t.id == slug || t.name.eq_ignore_ascii_case(key))
    }

    /// The tier used when no explicit choice is made
    pub fn default_tier(&self) -> Option<&QualityTier> {
        self.tiers.first()
    }

    /// Cheapest and most expensive unit cost across tiers
    pub fn price_range(&self) -> Option<(f64, f64)> {
        let mut costs = self.tiers.iter().map(|t| t.unit_cost);
        let first = costs.next()?;
        Some(costs.fold((first, first), |(lo, hi), c| (lo.min(c), hi.max(c))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Entity;

    fn ups() -> Component {
        let mut cmp = Component::new("UPS Module", ComponentCategory::Power, "alice");
        cmp.add_tier(QualityTier::new("Budget", 18000.0, None).unwrap())
            .unwrap();
        cmp.add_tier(QualityTier::new("Premium", 32500.5, Some("Li-ion".into())).unwrap())
            .unwrap();
        cmp
    }

    #[test]
    fn test_component_creation() {
        let cmp = ups();
        assert!(cmp.id.to_string().starts_with("CMP-"));
        assert_eq!(cmp.unit, "ea");
        assert_eq!(cmp.default_tier().unwrap().id, "budget");
        assert_eq!(cmp.title(), "UPS Module");
        assert_eq!(cmp.owner(), "alice");
    }

    #[test]
    fn test_tier_lookup_by_id_or_name() {
        let cmp = ups();
        assert_eq!(cmp.tier("premium").unwrap().unit_cost, 32500.5);
        assert_eq!(cmp.tier("Premium").unwrap().id, "premium");
        assert!(cmp.tier("standard").is_none());
    }

    #[test]
    fn test_duplicate_tier_rejected() {
        let mut cmp = ups();
        let err = cmp
            .add_tier(QualityTier::new("budget", 1.0, None).unwrap())
            .unwrap_err();
        assert_eq!(err, TierError::Duplicate("budget".to_string()));
    }

    #[test]
    fn test_unit_cost_validation() {
        assert!(validate_unit_cost(0.0).is_ok());
        assert!(validate_unit_cost(1250.99).is_ok());
        assert_eq!(
            validate_unit_cost(-1.0),
            Err(TierError::NegativeCost(-1.0))
        );
        assert_eq!(
            validate_unit_cost(10.005),
            Err(TierError::SubCentPrecision(10.005))
        );
        assert!(validate_unit_cost(f64::NAN).is_err());
    }

    #[test]
    fn test_tier_slug() {
        assert_eq!(tier_slug("  Tier III / Premium "), "tier-iii-premium");
        assert_eq!(tier_slug("Standard"), "standard");
        assert_eq!(tier_slug("***"), "");
    }

    #[test]
    fn test_price_range() {
        assert_eq!(ups().price_range(), Some((18000.0, 32500.5)));
        let bare = Component::new("Bare", ComponentCategory::General, "alice");
        assert_eq!(bare.price_range(), None);
    }

    #[test]
    fn test_component_roundtrip() {
        let cmp = ups();
        let yaml = serde_yml::to_string(&cmp).unwrap();
        assert!(yaml.contains("category: power"));
        let parsed: Component = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.id, cmp.id);
        assert_eq!(parsed.tiers, cmp.tiers);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            "fire-protection".parse::<ComponentCategory>().unwrap(),
            ComponentCategory::FireProtection
        );
        assert!("plumbing".parse::<ComponentCategory>().is_err());
    }
}
