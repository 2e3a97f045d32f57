//! `dce login`, `dce logout` and `dce whoami`

use console::style;
use miette::Result;

use crate::cli::helpers::{confirm, open_workspace, print_structured};
use crate::cli::GlobalOpts;
use crate::core::security::{SecurityEvent, SecurityEventKind, SecurityLog};
use crate::core::{Config, Session};

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// User name (default: configured author)
    pub user: Option<String>,

    /// Session lifetime in hours (default: session_ttl_hours from config)
    #[arg(long)]
    pub hours: Option<i64>,
}

pub fn login(args: LoginArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let config = Config::load_for(Some(&workspace));

    let user = args.user.unwrap_or_else(|| config.author());
    let ttl = args
        .hours
        .map(chrono::Duration::hours)
        .unwrap_or_else(|| config.session_ttl());

    let session = Session::login(&workspace, &user, ttl)?;
    if let Err(e) = SecurityLog::append(
        &workspace,
        SecurityEvent::new(SecurityEventKind::Login, Some(session.user()), "session started"),
    ) {
        tracing::warn!(error = %e, "could not write security log");
    }

    confirm(
        global,
        format!(
            "Logged in as {} until {}",
            style(session.user()).cyan(),
            session.expires().format("%Y-%m-%d %H:%M UTC")
        ),
    );
    Ok(())
}

pub fn logout(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let session = Session::current(&workspace)?;
    let user = session.logout(&workspace)?;

    if let Err(e) = SecurityLog::append(
        &workspace,
        SecurityEvent::new(SecurityEventKind::Logout, Some(&user), "session ended"),
    ) {
        tracing::warn!(error = %e, "could not write security log");
    }

    confirm(global, format!("Logged out {}", style(&user).cyan()));
    Ok(())
}

pub fn whoami(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let session = Session::current(&workspace)?;

    if print_structured(&session, global.format)? {
        return Ok(());
    }

    println!("{}", session.user());
    if !global.quiet {
        println!(
            "  {} {}",
            style("since").dim(),
            session.started().format("%Y-%m-%d %H:%M UTC")
        );
        println!(
            "  {} {}",
            style("expires").dim(),
            session.expires().format("%Y-%m-%d %H:%M UTC")
        );
    }
    Ok(())
}
