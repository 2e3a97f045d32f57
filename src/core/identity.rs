//! Entity identity system using type-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Entity type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Catalog component with quality tiers
    Cmp,
    /// Catalog assembly (bundle of components)
    Asm,
    /// Cost estimate
    Est,
    /// Construction project
    Prj,
    /// Recorded actual cost
    Act,
    /// Project change order
    Chg,
    /// AI estimate-builder conversation
    Conv,
}

impl EntityPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Cmp => "CMP",
            EntityPrefix::Asm => "ASM",
            EntityPrefix::Est => "EST",
            EntityPrefix::Prj => "PRJ",
            EntityPrefix::Act => "ACT",
            EntityPrefix::Chg => "CHG",
            EntityPrefix::Conv => "CONV",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[
            EntityPrefix::Cmp,
            EntityPrefix::Asm,
            EntityPrefix::Est,
            EntityPrefix::Prj,
            EntityPrefix::Act,
            EntityPrefix::Chg,
            EntityPrefix::Conv,
        ]
    }

    /// Human-readable singular name, used in messages
    pub fn noun(&self) -> &'static str {
        match self {
            EntityPrefix::Cmp => "component",
            EntityPrefix::Asm => "assembly",
            EntityPrefix::Est => "estimate",
            EntityPrefix::Prj => "project",
            EntityPrefix::Act => "actual cost",
            EntityPrefix::Chg => "change order",
            EntityPrefix::Conv => "conversation",
        }
    }

    /// Try to determine entity prefix from a filename
    /// Looks for patterns like "EST-xxx.dce.yaml" or "est.schema.json"
    pub fn from_filename(filename: &str) -> Option<Self> {
        let upper = filename.to_uppercase();
        for prefix in Self::all() {
            let prefix_str = prefix.as_str();
            if upper.starts_with(&format!("{}-", prefix_str)) {
                return Some(*prefix);
            }
            if upper.starts_with(&format!("{}.", prefix_str)) {
                return Some(*prefix);
            }
        }
        None
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CMP" => Ok(EntityPrefix::Cmp),
            "ASM" => Ok(EntityPrefix::Asm),
            "EST" => Ok(EntityPrefix::Est),
            "PRJ" => Ok(EntityPrefix::Prj),
            "ACT" => Ok(EntityPrefix::Act),
            "CHG" => Ok(EntityPrefix::Chg),
            "CONV" => Ok(EntityPrefix::Conv),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique entity identifier combining a type prefix and ULID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl PartialOrd for EntityPrefix {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityPrefix {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl EntityId {
    /// Create a new EntityId with the given prefix
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    /// Create an EntityId from a prefix and existing ULID
    pub fn from_parts(prefix: EntityPrefix, ulid: Ulid) -> Self {
        Self { prefix, ulid }
    }

    /// Get the entity prefix
    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    /// Get the ULID component
    pub fn ulid(&self) -> Ulid {
        self.ulid
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing entity IDs
#[derive(Debug, Error, miette::Diagnostic)]
pub enum IdParseError {
    #[error("invalid entity prefix: '{0}' (valid: CMP, ASM, EST, PRJ, ACT, CHG, CONV)")]
    #[diagnostic(code(dce::id::prefix))]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in entity ID: '{0}'")]
    #[diagnostic(code(dce::id::delimiter))]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    #[diagnostic(code(dce::id::ulid))]
    InvalidUlid(String, String),
}
