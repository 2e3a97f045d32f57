//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::Workspace;

const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CHAT_MAX_REQUESTS: u32 = 10;
const DEFAULT_CHAT_WINDOW_SECS: i64 = 60;

/// DCE configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author / login name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Labor rate ($/hour) used when neither the estimate nor the user sets one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_labor_rate: Option<f64>,

    /// Per-user labor rates ($/hour)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labor_rates: BTreeMap<String, f64>,

    /// Session lifetime in hours
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl_hours: Option<i64>,

    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,

    /// AI chat endpoint settings
    pub chat: ChatConfig,
}

/// Settings for the remote chat-completion endpoint
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer key sent with each request; never printed by `dce config show`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Requests allowed per window by the local rate limiter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_secs: Option<i64>,
}

impl ChatConfig {
    fn merge(&mut self, other: ChatConfig) {
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.max_requests.is_some() {
            self.max_requests = other.max_requests;
        }
        if other.window_secs.is_some() {
            self.window_secs = other.window_secs;
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS))
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests.unwrap_or(DEFAULT_CHAT_MAX_REQUESTS)
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs.unwrap_or(DEFAULT_CHAT_WINDOW_SECS))
    }
}

impl Config {
    /// Load configuration from all sources, discovering the workspace from
    /// the current directory
    pub fn load() -> Self {
        Self::load_for(Workspace::discover().ok().as_ref())
    }

    /// Load configuration from all sources, merging in priority order
    pub fn load_for(workspace: Option<&Workspace>) -> Self {
        let mut config = Config::default();

        // Global user config (~/.config/dce/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // Workspace config (.dce/config.yaml)
        if let Some(ws) = workspace {
            if let Some(local) = Self::read_file(&Self::workspace_config_path(ws)) {
                config.merge(local);
            }
        }

        // Environment variables
        if let Ok(author) = std::env::var("DCE_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(endpoint) = std::env::var("DCE_CHAT_ENDPOINT") {
            config.chat.endpoint = Some(endpoint);
        }
        if let Ok(key) = std::env::var("DCE_CHAT_API_KEY") {
            config.chat.api_key = Some(key);
        }

        config
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dce")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Get the path to a workspace's config file
    pub fn workspace_config_path(workspace: &Workspace) -> PathBuf {
        workspace.dce_dir().join("config.yaml")
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.default_labor_rate.is_some() {
            self.default_labor_rate = other.default_labor_rate;
        }
        self.labor_rates.extend(other.labor_rates);
        if other.session_ttl_hours.is_some() {
            self.session_ttl_hours = other.session_ttl_hours;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        self.chat.merge(other.chat);
    }

    /// Get the author name, falling back to the OS username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Labor rate for a user: their own rate, else the workspace default
    pub fn labor_rate_for(&self, user: &str) -> Option<f64> {
        self.labor_rates
            .get(user)
            .copied()
            .or(self.default_labor_rate)
    }

    /// Session lifetime
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS))
    }
}
