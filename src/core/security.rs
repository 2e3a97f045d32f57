//! Error sanitizing, the local security log and the advisory rate limiter
//!
//! None of this is a security boundary: the log and the rate-limit counters
//! are plain files under `.dce/` that any user of the workspace can edit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::chat::ChatError;
use crate::core::identity::IdParseError;
use crate::core::session::SessionError;
use crate::core::store::StoreError;
use crate::core::workspace::{Workspace, WorkspaceError};
use crate::cost::builder::BuildError;
use crate::cost::export::ExportError;
use crate::entities::actual_cost::ActualCostError;
use crate::entities::component::TierError;
use crate::yaml::YamlError;

const LOG_FILE: &str = "security_log.json";
const RATE_FILE: &str = "rate_limits.json";

/// Stored events are capped; older ones are dropped first
pub const MAX_LOG_EVENTS: usize = 100;

/// How many events `dce security log` shows by default
pub const DISPLAY_LOG_EVENTS: usize = 20;

/// Broad failure classes, each with one user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Validation,
    Remote,
    RateLimited,
    Unknown,
}

impl ErrorCategory {
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Authentication failed. Please log in and try again.",
            ErrorCategory::Validation => {
                "Some of the values provided are invalid. Please review them and try again."
            }
            ErrorCategory::Remote => {
                "The request could not be completed by the data store or service. Please try again."
            }
            ErrorCategory::RateLimited => "Too many requests. Please wait a moment and try again.",
            ErrorCategory::Unknown => "An unexpected error occurred.",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Remote => "remote",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// An error split into what the user sees and what the log keeps
#[derive(Debug, Clone)]
pub struct SanitizedError {
    pub category: ErrorCategory,
    pub user_message: &'static str,
    pub detail: String,
}

/// Classify an error and pair it with its generic message
pub fn sanitize(report: &miette::Report) -> SanitizedError {
    let detail = format!("{}", report);
    let category = classify(report).unwrap_or_else(|| classify_text(&detail));
    SanitizedError {
        category,
        user_message: category.user_message(),
        detail,
    }
}

fn classify(report: &miette::Report) -> Option<ErrorCategory> {
    if report.downcast_ref::<SessionError>().is_some() {
        return Some(ErrorCategory::Authentication);
    }
    if report.downcast_ref::<RateLimitError>().is_some() {
        return Some(ErrorCategory::RateLimited);
    }
    if report.downcast_ref::<ActualCostError>().is_some()
        || report.downcast_ref::<TierError>().is_some()
        || report.downcast_ref::<BuildError>().is_some()
        || report.downcast_ref::<IdParseError>().is_some()
        || report.downcast_ref::<YamlError>().is_some()
    {
        return Some(ErrorCategory::Validation);
    }
    if let Some(store) = report.downcast_ref::<StoreError>() {
        return Some(match store {
            StoreError::Forbidden { .. } => ErrorCategory::Authentication,
            StoreError::Parse(_) => ErrorCategory::Validation,
            _ => ErrorCategory::Remote,
        });
    }
    if report.downcast_ref::<ChatError>().is_some()
        || report.downcast_ref::<ExportError>().is_some()
        || report.downcast_ref::<WorkspaceError>().is_some()
    {
        return Some(ErrorCategory::Remote);
    }
    None
}

/// Fallback for errors that reached us only as text
fn classify_text(message: &str) -> ErrorCategory {
    let msg = message.to_lowercase();
    if ["login", "logged in", "session", "unauthorized", "forbidden", "belongs to another user"]
        .iter()
        .any(|k| msg.contains(k))
    {
        ErrorCategory::Authentication
    } else if ["too many requests", "rate limit"].iter().any(|k| msg.contains(k)) {
        ErrorCategory::RateLimited
    } else if ["invalid", "must", "expected", "required", "missing"]
        .iter()
        .any(|k| msg.contains(k))
    {
        ErrorCategory::Validation
    } else if ["network", "connection", "timed out", "timeout", "not found", "io error"]
        .iter()
        .any(|k| msg.contains(k))
    {
        ErrorCategory::Remote
    } else {
        ErrorCategory::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    Login,
    Logout,
    SessionExpired,
    RateLimited,
    LogCleared,
    Error,
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SecurityEventKind::Login => "login",
            SecurityEventKind::Logout => "logout",
            SecurityEventKind::SessionExpired => "session_expired",
            SecurityEventKind::RateLimited => "rate_limited",
            SecurityEventKind::LogCleared => "log_cleared",
            SecurityEventKind::Error => "error",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: SecurityEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub detail: String,
}

impl SecurityEvent {
    pub fn new(kind: SecurityEventKind, user: Option<&str>, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            user: user.map(str::to_string),
            category: None,
            detail: detail.into(),
        }
    }

    /// Event for a failed command, keeping the detailed message
    pub fn from_error(sanitized: &SanitizedError, user: Option<&str>) -> Self {
        let kind = match sanitized.category {
            ErrorCategory::RateLimited => SecurityEventKind::RateLimited,
            _ => SecurityEventKind::Error,
        };
        Self {
            category: Some(sanitized.category),
            ..Self::new(kind, user, sanitized.detail.clone())
        }
    }
}

/// Local, capped log of security-relevant events
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SecurityLog {
    events: Vec<SecurityEvent>,
}

impl SecurityLog {
    /// Load the log, or start empty if missing or unreadable
    pub fn load(workspace: &Workspace) -> Self {
        let path = Self::path(workspace);
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, workspace: &Workspace) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::path(workspace), content)
    }

    /// Load, append one event and save
    pub fn append(workspace: &Workspace, event: SecurityEvent) -> std::io::Result<()> {
        let mut log = Self::load(workspace);
        log.record(event);
        log.save(workspace)
    }

    pub fn record(&mut self, event: SecurityEvent) {
        self.events.push(event);
        if self.events.len() > MAX_LOG_EVENTS {
            let excess = self.events.len() - MAX_LOG_EVENTS;
            self.events.drain(..excess);
        }
    }

    /// The most recent `limit` events, newest first
    pub fn recent(&self, limit: usize) -> Vec<&SecurityEvent> {
        self.events.iter().rev().take(limit).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn path(workspace: &Workspace) -> PathBuf {
        workspace.dce_dir().join(LOG_FILE)
    }
}

#[derive(Debug, Error, miette::Diagnostic)]
#[error("rate limit reached for {key}: {max} requests per {window_secs}s, retry in {retry_after_secs}s")]
#[diagnostic(code(dce::rate_limit))]
pub struct RateLimitError {
    pub key: String,
    pub max: u32,
    pub window_secs: i64,
    pub retry_after_secs: i64,
}

/// Sliding-window request counter persisted in the workspace
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RateLimiter {
    requests: BTreeMap<String, Vec<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn load(workspace: &Workspace) -> Self {
        std::fs::read_to_string(Self::path(workspace))
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, workspace: &Workspace) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::path(workspace), content)
    }

    /// Count a request against `key`, or refuse it if the window is full
    pub fn check(
        &mut self,
        key: &str,
        max: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        let entries = self.requests.entry(key.to_string()).or_default();
        entries.retain(|t| *t > now - window);

        if entries.len() >= max as usize {
            let oldest = entries.iter().min().copied().unwrap_or(now);
            let retry_after = (oldest + window - now).num_seconds().max(1);
            tracing::warn!(key, max, "rate limit reached");
            return Err(RateLimitError {
                key: key.to_string(),
                max,
                window_secs: window.num_seconds(),
                retry_after_secs: retry_after,
            });
        }

        entries.push(now);
        Ok(())
    }

    fn path(workspace: &Workspace) -> PathBuf {
        workspace.dce_dir().join(RATE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_by_type() {
        let report: miette::Report = SessionError::NotLoggedIn.into();
        let s = sanitize(&report);
        assert_eq!(s.category, ErrorCategory::Authentication);
        assert_eq!(s.user_message, ErrorCategory::Authentication.user_message());
        assert!(s.detail.contains("not logged in"));

        let report: miette::Report = TierError::NegativeCost(-1.0).into();
        assert_eq!(sanitize(&report).category, ErrorCategory::Validation);

        let report: miette::Report = StoreError::NotFound {
            noun: "estimate",
            id: "EST-1".into(),
        }
        .into();
        assert_eq!(sanitize(&report).category, ErrorCategory::Remote);
    }

    #[test]
    fn test_sanitize_by_text() {
        let report = miette::miette!("connection reset by peer");
        assert_eq!(sanitize(&report).category, ErrorCategory::Remote);

        let report = miette::miette!("quantity must be positive");
        assert_eq!(sanitize(&report).category, ErrorCategory::Validation);

        let report = miette::miette!("something odd");
        assert_eq!(sanitize(&report).category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_log_is_capped_and_recent_is_newest_first() {
        let mut log = SecurityLog::default();
        for i in 0..(MAX_LOG_EVENTS + 5) {
            log.record(SecurityEvent::new(SecurityEventKind::Error, None, format!("e{}", i)));
        }
        assert_eq!(log.len(), MAX_LOG_EVENTS);

        let recent = log.recent(DISPLAY_LOG_EVENTS);
        assert_eq!(recent.len(), DISPLAY_LOG_EVENTS);
        assert_eq!(recent[0].detail, format!("e{}", MAX_LOG_EVENTS + 4));
    }

    #[test]
    fn test_log_persists() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();

        SecurityLog::append(&ws, SecurityEvent::new(SecurityEventKind::Login, Some("alice"), "login"))
            .unwrap();
        let log = SecurityLog::load(&ws);
        assert_eq!(log.len(), 1);
        assert_eq!(log.recent(1)[0].user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_rate_limiter_window() {
        let mut limiter = RateLimiter::default();
        let window = Duration::seconds(60);
        let t0 = Utc::now();

        limiter.check("chat", 2, window, t0).unwrap();
        limiter.check("chat", 2, window, t0 + Duration::seconds(10)).unwrap();

        let err = limiter
            .check("chat", 2, window, t0 + Duration::seconds(20))
            .unwrap_err();
        assert_eq!(err.retry_after_secs, 40);

        // other keys are independent
        limiter.check("export", 2, window, t0).unwrap();

        // once the first request ages out there is room again
        limiter.check("chat", 2, window, t0 + Duration::seconds(61)).unwrap();
    }
}
