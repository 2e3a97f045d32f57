//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;
use crate::core::security::{SecurityEvent, SecurityEventKind, SecurityLog};
use crate::core::session::{Session, SessionError};
use crate::core::store::FileStore;
use crate::core::{Config, Workspace};

/// Everything a command that reads or writes records needs
pub struct Context {
    pub workspace: Workspace,
    pub session: Session,
    pub store: FileStore,
    pub config: Config,
}

impl Context {
    /// Open the workspace and require a live session
    ///
    /// An expired session is recorded in the security log before the
    /// error is returned.
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let workspace = open_workspace(global)?;
        let config = Config::load_for(Some(&workspace));

        let session = match Session::current(&workspace) {
            Ok(session) => session,
            Err(SessionError::Expired { user, expired }) => {
                let _ = SecurityLog::append(
                    &workspace,
                    SecurityEvent::new(
                        SecurityEventKind::SessionExpired,
                        Some(&user),
                        format!("session expired at {}", expired),
                    ),
                );
                return Err(SessionError::Expired { user, expired }.into());
            }
            Err(e) => return Err(e.into()),
        };

        let store = FileStore::for_session(&workspace, &session);
        Ok(Self {
            workspace,
            session,
            store,
            config,
        })
    }

    pub fn user(&self) -> &str {
        self.session.user()
    }
}

/// Locate the workspace from `--workspace` or the current directory
pub fn open_workspace(global: &GlobalOpts) -> Result<Workspace> {
    Ok(Workspace::open(global.workspace.as_deref())?)
}

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Format a currency amount as `$1,234.56`
pub fn money(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Format an optional percentage, `n/a` when absent
pub fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |p| format!("{:+.1}%", p))
}

/// Parse a `YYYY-MM-DD` date argument
pub fn parse_date(s: &str) -> std::result::Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

/// Print a record as YAML or JSON; returns false for other formats
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Print rows as a table in the requested format
///
/// The first column is treated as the record id for `--format id`.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Id => {
            for row in &rows {
                if let Some(id) = row.first() {
                    println!("{}", id);
                }
            }
        }
        OutputFormat::Tsv => {
            println!("{}", headers.join("\t"));
            for row in &rows {
                println!("{}", row.join("\t"));
            }
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(headers).into_diagnostic()?;
            for row in &rows {
                wtr.write_record(row).into_diagnostic()?;
            }
            wtr.flush().into_diagnostic()?;
        }
        _ => {
            let mut builder = Builder::default();
            builder.push_record(headers.iter().map(|h| h.to_string()));
            for row in rows {
                builder.push_record(row);
            }
            let mut table = builder.build();
            table.with(Style::rounded());
            println!("{}", table);
        }
    }
    Ok(())
}

/// Print a `✓` confirmation unless `--quiet`
pub fn confirm(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{} {}", style("✓").green(), message);
    }
}
