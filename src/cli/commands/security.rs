//! `dce security` command - Local security event log

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{confirm, open_workspace, print_structured, print_table, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::security::{
    SecurityEvent, SecurityEventKind, SecurityLog, DISPLAY_LOG_EVENTS, MAX_LOG_EVENTS,
};

#[derive(Subcommand, Debug)]
pub enum SecurityCommands {
    /// Show recent security events, newest first
    Log(LogArgs),

    /// Clear the security log
    Clear,
}

#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// Number of events to show
    #[arg(long, short = 'n', default_value_t = DISPLAY_LOG_EVENTS)]
    pub limit: usize,
}

pub fn run(cmd: SecurityCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SecurityCommands::Log(args) => run_log(args, global),
        SecurityCommands::Clear => run_clear(global),
    }
}

fn run_log(args: LogArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let log = SecurityLog::load(&workspace);
    let events = log.recent(args.limit);

    if print_structured(&events, global.format)? {
        return Ok(());
    }

    let rows = events
        .iter()
        .map(|e| {
            vec![
                e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.kind.to_string(),
                e.user.clone().unwrap_or_else(|| "-".to_string()),
                e.category
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                e.detail.clone(),
            ]
        })
        .collect();
    print_table(&["TIME", "EVENT", "USER", "CATEGORY", "DETAIL"], rows, global.format)?;

    if global.format == OutputFormat::Auto && !global.quiet {
        println!(
            "{} of {} stored event(s) (at most {} kept)",
            style(events.len()).cyan(),
            log.len(),
            MAX_LOG_EVENTS
        );
    }
    Ok(())
}

fn run_clear(global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut log = SecurityLog::load(&ctx.workspace);
    let removed = log.len();
    log.clear();
    log.record(SecurityEvent::new(
        SecurityEventKind::LogCleared,
        Some(ctx.user()),
        format!("{} events removed", removed),
    ));
    log.save(&ctx.workspace).into_diagnostic()?;

    confirm(global, format!("Cleared {} security event(s)", removed));
    Ok(())
}
