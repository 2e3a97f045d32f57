use clap::Parser;
use console::style;
use tracing_subscriber::{fmt, EnvFilter};

use dce::cli::commands;
use dce::cli::{Cli, Commands, GlobalOpts};
use dce::core::security::{self, ErrorCategory, SecurityEvent, SecurityLog};
use dce::core::{Session, Workspace};

fn main() {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }));

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(global.verbose);

    if let Err(report) = dispatch(cli.command, &global) {
        report_failure(&report, &global);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("DCE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    if let Err(e) = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("failed to initialise logging: {e}");
    }
}

fn dispatch(command: Commands, global: &GlobalOpts) -> miette::Result<()> {
    match command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Login(args) => commands::session::login(args, global),
        Commands::Logout => commands::session::logout(global),
        Commands::Whoami => commands::session::whoami(global),
        Commands::Cmp(cmd) => commands::cmp::run(cmd, global),
        Commands::Asm(cmd) => commands::asm::run(cmd, global),
        Commands::Est(cmd) => commands::est::run(cmd, global),
        Commands::Proj(cmd) => commands::proj::run(cmd, global),
        Commands::Cost(cmd) => commands::cost::run(cmd, global),
        Commands::Chg(cmd) => commands::chg::run(cmd, global),
        Commands::Variance(args) => commands::variance::run(args, global),
        Commands::Dashboard(args) => commands::dashboard::run(args, global),
        Commands::Chat(cmd) => commands::chat::run(cmd, global),
        Commands::Security(cmd) => commands::security::run(cmd, global),
        Commands::Validate(args) => commands::validate::run(args, global),
        Commands::Config(cmd) => commands::config::run(cmd, global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

/// Log the failure to the workspace security log and show the sanitized message
fn report_failure(report: &miette::Report, global: &GlobalOpts) {
    let sanitized = security::sanitize(report);

    if let Ok(workspace) = Workspace::open(global.workspace.as_deref()) {
        let user = Session::current(&workspace)
            .ok()
            .map(|s| s.user().to_string());
        let event = SecurityEvent::from_error(&sanitized, user.as_deref());
        if let Err(e) = SecurityLog::append(&workspace, event) {
            tracing::warn!(error = %e, "could not write security log");
        }
    }

    if global.verbose {
        eprintln!("{:?}", report);
        return;
    }

    eprintln!("{} {}", style("error:").red().bold(), sanitized.user_message);
    // Validation details describe the user's own input
    if sanitized.category == ErrorCategory::Validation {
        eprintln!("  {}", sanitized.detail);
    } else {
        eprintln!("  {}", style("Run with --verbose for details.").dim());
    }
}
