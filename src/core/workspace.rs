//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// File suffix shared by every record file
pub const RECORD_SUFFIX: &str = ".dce.yaml";

/// Represents a DCE workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .dce/)
    root: PathBuf,
}

impl Workspace {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current =
            std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Use an explicit root if given, otherwise discover from the current directory
    pub fn open(explicit: Option<&Path>) -> Result<Self, WorkspaceError> {
        match explicit {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(".dce").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace structure at the given path
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(".dce").exists() {
            return Err(WorkspaceError::AlreadyExists(root));
        }

        Self::init_force(&root)
    }

    /// Initialize even if .dce/ exists; existing records are left untouched
    pub fn init_force(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let dce_dir = root.join(".dce");
        std::fs::create_dir_all(&dce_dir).map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        let config_path = dce_dir.join("config.yaml");
        if !config_path.exists() {
            std::fs::write(&config_path, Self::default_config())
                .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        }

        for prefix in EntityPrefix::all() {
            std::fs::create_dir_all(root.join(Self::entity_directory(*prefix)))
                .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# DCE Workspace Configuration

# Default author / login name (can be overridden by global config or DCE_AUTHOR)
# author: ""

# Labor rate applied when an estimate does not set its own ($/hour)
# default_labor_rate: 85.0

# Per-user labor rates ($/hour)
# labor_rates:
#   alice: 92.5

# Session lifetime for `dce login`
# session_ttl_hours: 12

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto

# AI estimate builder endpoint
# chat:
#   endpoint: "https://example.invalid/functions/v1/ai-chat"
#   timeout_secs: 60
#   max_requests: 10
#   window_secs: 60
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .dce state directory
    pub fn dce_dir(&self) -> PathBuf {
        self.root.join(".dce")
    }

    /// Get the path for an entity file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.root
            .join(Self::entity_directory(id.prefix()))
            .join(format!("{}{}", id, RECORD_SUFFIX))
    }

    /// Get the absolute directory for a given entity prefix
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(Self::entity_directory(prefix))
    }

    /// Get the directory for a given entity prefix, relative to the root
    pub fn entity_directory(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Cmp => "catalog/components",
            EntityPrefix::Asm => "catalog/assemblies",
            EntityPrefix::Est => "estimates",
            EntityPrefix::Prj => "projects",
            EntityPrefix::Act => "costs/actuals",
            EntityPrefix::Chg => "costs/change_orders",
            EntityPrefix::Conv => "conversations",
        }
    }

    /// Iterate all entity files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.entity_dir(prefix))
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(RECORD_SUFFIX))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error, miette::Diagnostic)]
pub enum WorkspaceError {
    #[error("not a DCE workspace (searched from {searched_from:?}). Run 'dce init' to create one.")]
    #[diagnostic(code(dce::workspace::not_found))]
    NotFound { searched_from: PathBuf },

    #[error("DCE workspace already exists at {0:?}")]
    #[diagnostic(code(dce::workspace::exists))]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    #[diagnostic(code(dce::workspace::io))]
    IoError(String),
}
