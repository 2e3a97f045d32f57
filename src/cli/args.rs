//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    asm::AsmCommands,
    chat::ChatCommands,
    chg::ChgCommands,
    cmp::CmpCommands,
    completions::CompletionsArgs,
    config::ConfigCommands,
    cost::CostCommands,
    dashboard::DashboardArgs,
    est::EstCommands,
    init::InitArgs,
    proj::ProjCommands,
    security::SecurityCommands,
    session::LoginArgs,
    validate::ValidateArgs,
    variance::VarianceArgs,
};

#[derive(Parser)]
#[command(name = "dce")]
#[command(author, version, about = "Data-center construction cost estimator")]
#[command(long_about = "Build data-center construction cost estimates from a catalog of priced components and assemblies, and track actual spend against them. Records are plain YAML files in a workspace.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Show full error diagnostics and debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .dce/)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new estimating workspace
    Init(InitArgs),

    /// Start a session as the given user
    Login(LoginArgs),

    /// End the current session
    Logout,

    /// Show the current session
    Whoami,

    /// Catalog components and their quality tiers
    #[command(subcommand)]
    Cmp(CmpCommands),

    /// Catalog assemblies (bundles of components)
    #[command(subcommand)]
    Asm(AsmCommands),

    /// Cost estimates
    #[command(subcommand)]
    Est(EstCommands),

    /// Construction projects and phases
    #[command(subcommand)]
    Proj(ProjCommands),

    /// Actual costs recorded against projects
    #[command(subcommand)]
    Cost(CostCommands),

    /// Project change orders
    #[command(subcommand)]
    Chg(ChgCommands),

    /// Compare an estimate with recorded actual costs
    Variance(VarianceArgs),

    /// Portfolio overview across estimates and projects
    Dashboard(DashboardArgs),

    /// Talk to the AI estimate assistant
    #[command(subcommand)]
    Chat(ChatCommands),

    /// Security event log
    #[command(subcommand)]
    Security(SecurityCommands),

    /// Validate workspace files against schemas and stored totals
    Validate(ValidateArgs),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tables for lists, a readable summary for single records
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
    /// CSV format (for spreadsheets)
    Csv,
    /// Just IDs, one per line
    Id,
}
