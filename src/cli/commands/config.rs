//! `dce config` command - inspect the merged configuration

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Workspace};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the merged configuration (API keys are never printed)
    Show,

    /// Show paths to configuration files
    Path,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global.workspace.as_deref()).ok();

    match cmd {
        ConfigCommands::Show => {
            let config = Config::load_for(workspace.as_ref());
            match global.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&config).into_diagnostic()?)
                }
                _ => print!("{}", serde_yml::to_string(&config).into_diagnostic()?),
            }
            if !global.quiet && config.chat.api_key.is_some() {
                eprintln!("{}", style("# chat.api_key is set (hidden)").dim());
            }
        }
        ConfigCommands::Path => {
            match Config::global_config_path() {
                Some(path) => println!(
                    "{} {}{}",
                    style("global:").bold(),
                    path.display(),
                    exists_marker(&path)
                ),
                None => println!("{} (no home directory)", style("global:").bold()),
            }
            match workspace {
                Some(ws) => {
                    let path = Config::workspace_config_path(&ws);
                    println!(
                        "{} {}{}",
                        style("workspace:").bold(),
                        path.display(),
                        exists_marker(&path)
                    );
                }
                None => println!("{} (not in a workspace)", style("workspace:").bold()),
            }
        }
    }
    Ok(())
}

fn exists_marker(path: &std::path::Path) -> String {
    if path.exists() {
        String::new()
    } else {
        style(" (missing)").dim().to_string()
    }
}
