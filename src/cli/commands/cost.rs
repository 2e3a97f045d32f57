//! `dce cost` command - Actual costs recorded against projects

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{
    confirm, money, parse_date, print_structured, print_table, truncate_str, Context,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::Store;
use crate::entities::actual_cost::{ActualCost, ActualCostDraft};
use crate::entities::component::Component;
use crate::entities::project::Project;

#[derive(Subcommand, Debug)]
pub enum CostCommands {
    /// Record an incurred cost for a component on a project
    Add(AddArgs),

    /// List recorded costs
    List(ListArgs),

    /// Delete a recorded cost
    Delete(IdArg),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Project ID (or unique prefix)
    pub project: String,

    /// Component ID (or unique prefix)
    pub component: String,

    /// Quantity received or installed
    #[arg(long, short = 'n', allow_negative_numbers = true)]
    pub qty: f64,

    /// Price paid per unit
    #[arg(long, short = 'u', allow_negative_numbers = true)]
    pub unit_cost: f64,

    /// Date the cost was incurred (YYYY-MM-DD, default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    #[arg(long)]
    pub vendor: Option<String>,

    /// Purchase order number
    #[arg(long)]
    pub po: Option<String>,

    #[arg(long)]
    pub invoice: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only costs for this project
    #[arg(long, short = 'p')]
    pub project: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Actual cost ID (or unique prefix)
    pub id: String,
}

pub fn run(cmd: CostCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CostCommands::Add(args) => run_add(args, global),
        CostCommands::List(args) => run_list(args, global),
        CostCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let project: Project = ctx.store.get(&args.project)?;
    let component: Component = ctx.store.get(&args.component)?;

    let today = Local::now().date_naive();
    let cost = ActualCost::record(
        ActualCostDraft {
            project_id: project.id.clone(),
            component_id: component.id.clone(),
            component_name: component.name.clone(),
            actual_quantity: args.qty,
            actual_unit_cost: args.unit_cost,
            cost_date: args.date.unwrap_or(today),
            vendor: args.vendor,
            po_number: args.po,
            invoice_number: args.invoice,
            notes: args.notes,
        },
        today,
        ctx.user(),
    )?;
    let id = ctx.store.save(&cost)?;

    if global.format == OutputFormat::Id {
        println!("{}", id);
        return Ok(());
    }
    confirm(
        global,
        format!(
            "Recorded {} for {} × {} on {}",
            style(money(cost.actual_total_cost)).green(),
            cost.actual_quantity,
            style(&component.name).yellow(),
            style(&project.name).cyan()
        ),
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut costs: Vec<ActualCost> = ctx.store.list()?;

    if let Some(ref project) = args.project {
        let project: Project = ctx.store.get(project)?;
        costs.retain(|c| c.project_id == project.id);
    }
    costs.sort_by(|a, b| a.cost_date.cmp(&b.cost_date));

    if print_structured(&costs, global.format)? {
        return Ok(());
    }

    let rows = costs
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                c.cost_date.to_string(),
                truncate_str(&c.component_name, 32),
                format!("{}", c.actual_quantity),
                money(c.actual_unit_cost),
                money(c.actual_total_cost),
                c.vendor.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(
        &["ID", "DATE", "COMPONENT", "QTY", "UNIT COST", "TOTAL", "VENDOR"],
        rows,
        global.format,
    )?;

    if global.format == OutputFormat::Auto && !global.quiet {
        let total: f64 = costs.iter().map(|c| c.actual_total_cost).sum();
        println!(
            "{} cost(s), {} spent",
            style(costs.len()).cyan(),
            style(money(total)).green()
        );
    }
    Ok(())
}

fn run_delete(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let id = ctx.store.delete::<ActualCost>(&args.id)?;
    confirm(global, format!("Deleted actual cost {}", style(&id).cyan()));
    Ok(())
}
