//! Login session context
//!
//! A [`Session`] is created by `dce login`, handed explicitly to everything
//! that needs to know the current user, and destroyed by `dce logout` or on
//! first use after it expires.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::core::workspace::Workspace;

const SESSION_FILE: &str = "session.yaml";

#[derive(Debug, Error, miette::Diagnostic)]
pub enum SessionError {
    #[error("not logged in")]
    #[diagnostic(code(dce::session::none), help("Run `dce login` first."))]
    NotLoggedIn,

    #[error("session for '{user}' expired at {expired}")]
    #[diagnostic(code(dce::session::expired), help("Run `dce login` again."))]
    Expired {
        user: String,
        expired: DateTime<Utc>,
    },

    #[error("user name must not be empty")]
    #[diagnostic(code(dce::session::user))]
    EmptyUser,

    #[error("session file {path}: {message}")]
    #[diagnostic(code(dce::session::io))]
    Io { path: PathBuf, message: String },
}

/// The authenticated user context for one workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    user: String,
    started: DateTime<Utc>,
    expires: DateTime<Utc>,
}

impl Session {
    /// Create a session and persist it in the workspace
    pub fn login(workspace: &Workspace, user: &str, ttl: Duration) -> Result<Self, SessionError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(SessionError::EmptyUser);
        }

        let now = Utc::now();
        let session = Self {
            user: user.to_string(),
            started: now,
            expires: now + ttl,
        };

        let path = Self::path(workspace);
        let yaml = serde_yml::to_string(&session).map_err(|e| SessionError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, yaml).map_err(|e| SessionError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;

        tracing::info!(user = %session.user, expires = %session.expires, "session started");
        Ok(session)
    }

    /// Load the active session; an expired one is torn down and reported
    pub fn current(workspace: &Workspace) -> Result<Self, SessionError> {
        Self::current_at(workspace, Utc::now())
    }

    fn current_at(workspace: &Workspace, now: DateTime<Utc>) -> Result<Self, SessionError> {
        let path = Self::path(workspace);
        if !path.exists() {
            return Err(SessionError::NotLoggedIn);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| SessionError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let session: Session = match serde_yml::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt session file");
                let _ = std::fs::remove_file(&path);
                return Err(SessionError::NotLoggedIn);
            }
        };

        if session.is_expired_at(now) {
            tracing::info!(user = %session.user, "session expired");
            let _ = std::fs::remove_file(&path);
            return Err(SessionError::Expired {
                user: session.user,
                expired: session.expires,
            });
        }

        Ok(session)
    }

    /// Destroy the session
    pub fn logout(self, workspace: &Workspace) -> Result<String, SessionError> {
        let path = Self::path(workspace);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| SessionError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }
        tracing::info!(user = %self.user, "session ended");
        Ok(self.user)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }

    fn path(workspace: &Workspace) -> PathBuf {
        workspace.dce_dir().join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_login_current_logout() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();

        assert!(matches!(Session::current(&ws), Err(SessionError::NotLoggedIn)));

        let session = Session::login(&ws, " alice ", Duration::hours(1)).unwrap();
        assert_eq!(session.user(), "alice");

        let current = Session::current(&ws).unwrap();
        assert_eq!(current, session);

        assert_eq!(current.logout(&ws).unwrap(), "alice");
        assert!(matches!(Session::current(&ws), Err(SessionError::NotLoggedIn)));
    }

    #[test]
    fn test_expired_session_is_destroyed() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        let session = Session::login(&ws, "alice", Duration::minutes(30)).unwrap();

        let later = session.started() + Duration::hours(1);
        let err = Session::current_at(&ws, later).unwrap_err();
        assert!(matches!(err, SessionError::Expired { ref user, .. } if user == "alice"));

        // Torn down: the next lookup sees no session at all
        assert!(matches!(Session::current(&ws), Err(SessionError::NotLoggedIn)));
    }

    #[test]
    fn test_empty_user_rejected() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        assert!(matches!(
            Session::login(&ws, "   ", Duration::hours(1)),
            Err(SessionError::EmptyUser)
        ));
    }
}
