//! `dce proj` command - Construction projects and their phases

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{
    confirm, money, parse_date, print_structured, print_table, truncate_str, Context,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::Store;
use crate::entities::actual_cost::ActualCost;
use crate::entities::change_order::ChangeOrder;
use crate::entities::estimate::Estimate;
use crate::entities::project::{Phase, PhaseStatus, Project};

#[derive(Subcommand, Debug)]
pub enum ProjCommands {
    /// List projects
    List,

    /// Create a new project
    New(NewArgs),

    /// Show a project with its phases, estimates and spend
    Show(IdArg),

    /// Add a phase to a project
    AddPhase(AddPhaseArgs),

    /// Delete a project
    Delete(IdArg),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Project name
    pub name: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Site location
    #[arg(long, short = 'l')]
    pub location: Option<String>,

    /// Approved budget
    #[arg(long, short = 'b')]
    pub budget: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Project ID (or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AddPhaseArgs {
    /// Project ID (or unique prefix)
    pub project: String,

    /// Phase name
    pub name: String,

    /// Start date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start: NaiveDate,

    /// End date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// planned, active or complete
    #[arg(long, default_value = "planned")]
    pub status: PhaseStatus,
}

pub fn run(cmd: ProjCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProjCommands::List => run_list(global),
        ProjCommands::New(args) => run_new(args, global),
        ProjCommands::Show(args) => run_show(args, global),
        ProjCommands::AddPhase(args) => run_add_phase(args, global),
        ProjCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let projects: Vec<Project> = ctx.store.list()?;
    let change_orders: Vec<ChangeOrder> = ctx.store.list()?;

    if print_structured(&projects, global.format)? {
        return Ok(());
    }

    let rows = projects
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                truncate_str(&p.name, 36),
                p.location.clone().unwrap_or_else(|| "-".to_string()),
                p.adjusted_budget(&change_orders)
                    .map(money)
                    .unwrap_or_else(|| "-".to_string()),
                p.active_phase()
                    .map(|ph| ph.name.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(
        &["ID", "NAME", "LOCATION", "BUDGET", "ACTIVE PHASE"],
        rows,
        global.format,
    )?;

    if global.format == OutputFormat::Auto && !global.quiet {
        println!("{} project(s)", style(projects.len()).cyan());
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    if let Some(b) = args.budget {
        if !b.is_finite() || b < 0.0 {
            return Err(miette::miette!("budget must be a non-negative amount, got {}", b));
        }
    }

    let ctx = Context::open(global)?;
    let mut project = Project::new(args.name, ctx.user());
    project.description = args.description;
    project.location = args.location;
    project.budget = args.budget;

    let id = ctx.store.save(&project)?;
    if global.format == OutputFormat::Id {
        println!("{}", id);
        return Ok(());
    }
    confirm(
        global,
        format!("Created project {} {}", style(&id).cyan(), style(&project.name).yellow()),
    );
    Ok(())
}

fn run_show(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let project: Project = ctx.store.get(&args.id)?;

    if print_structured(&project, global.format)? {
        return Ok(());
    }
    if global.format == OutputFormat::Id {
        println!("{}", project.id);
        return Ok(());
    }

    let change_orders: Vec<ChangeOrder> = ctx
        .store
        .list::<ChangeOrder>()?
        .into_iter()
        .filter(|c| c.project_id == project.id)
        .collect();
    let estimates: Vec<Estimate> = ctx
        .store
        .list::<Estimate>()?
        .into_iter()
        .filter(|e| e.project_id.as_ref() == Some(&project.id))
        .collect();
    let spent: f64 = ctx
        .store
        .list::<ActualCost>()?
        .iter()
        .filter(|a| a.project_id == project.id)
        .map(|a| a.actual_total_cost)
        .sum();

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&project.id).cyan());
    println!("{}: {}", style("Name").bold(), style(&project.name).yellow());
    if let Some(ref loc) = project.location {
        println!("{}: {}", style("Location").bold(), loc);
    }
    if let Some(budget) = project.budget {
        println!("{}: {}", style("Budget").bold(), money(budget));
        let changes = project.approved_changes(&change_orders);
        if changes != 0.0 {
            println!(
                "{}: {} ({} approved changes)",
                style("Adjusted").bold(),
                money(budget + changes),
                money(changes)
            );
        }
    }
    println!("{}: {}", style("Spent").bold(), money(spent));
    println!("{}", style("─".repeat(60)).dim());
    if let Some(ref desc) = project.description {
        println!();
        println!("{}", desc);
    }

    println!();
    println!("{}", style("Phases:").bold());
    if project.phases.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    for phase in &project.phases {
        let status = match phase.status {
            PhaseStatus::Active => style(phase.status.to_string()).green(),
            PhaseStatus::Complete => style(phase.status.to_string()).dim(),
            PhaseStatus::Planned => style(phase.status.to_string()).yellow(),
        };
        println!(
            "  {:<24} {} → {}  {}",
            phase.name,
            phase.start,
            phase
                .end
                .map(|d| d.to_string())
                .unwrap_or_else(|| "open".to_string()),
            status
        );
    }

    println!();
    println!("{}", style("Estimates:").bold());
    if estimates.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    for est in &estimates {
        println!(
            "  {}  {:<32} {:>16}",
            style(&est.id).cyan(),
            truncate_str(&est.name, 32),
            money(est.total_cost)
        );
    }

    if !change_orders.is_empty() {
        println!();
        println!("{}", style("Change orders:").bold());
        for chg in &change_orders {
            println!(
                "  {}  {:<32} {:>14}  {}",
                style(&chg.id).cyan(),
                truncate_str(&chg.title, 32),
                money(chg.amount),
                chg.status
            );
        }
    }
    Ok(())
}

fn run_add_phase(args: AddPhaseArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut project: Project = ctx.store.get(&args.project)?;

    project
        .add_phase(Phase {
            name: args.name.clone(),
            start: args.start,
            end: args.end,
            status: args.status,
        })
        .map_err(|e| miette::miette!("{}", e))?;
    ctx.store.save(&project)?;

    confirm(
        global,
        format!(
            "Added phase {} to {}",
            style(&args.name).yellow(),
            style(&project.name).cyan()
        ),
    );
    Ok(())
}

fn run_delete(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let id = ctx.store.delete::<Project>(&args.id)?;
    confirm(global, format!("Deleted project {}", style(&id).cyan()));
    Ok(())
}
