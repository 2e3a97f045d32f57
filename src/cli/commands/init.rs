//! `dce init` command - Initialize a new estimating workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::identity::EntityPrefix;
use crate::core::workspace::{Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Re-create missing directories even if .dce/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let workspace = if args.force {
        Workspace::init_force(&path)
    } else {
        Workspace::init(&path)
    };

    match workspace {
        Ok(workspace) => {
            println!(
                "{} Initialized DCE workspace at {}",
                style("✓").green(),
                style(workspace.root().display()).cyan()
            );
            println!();
            println!("Created workspace structure:");
            print_structure(workspace.root());
            println!();
            println!("Next steps:");
            println!("  {} Start a session", style("dce login <name>").yellow());
            println!(
                "  {} Add a catalog component",
                style("dce cmp new \"UPS Module\" --category power --tier Standard=48500").yellow()
            );
            println!("  {} Start an estimate", style("dce est new \"Hall A\"").yellow());
            Ok(())
        }
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} DCE workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("dce init --force").yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_structure(root: &Path) {
    println!("  {}/", style(".dce").dim());
    println!("    config.yaml");
    for prefix in EntityPrefix::all() {
        let dir = Workspace::entity_directory(*prefix);
        if root.join(dir).exists() {
            println!("  {}/", style(dir).dim());
        }
    }
}
