//! `dce chg` command - Project change orders

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{confirm, money, print_structured, print_table, truncate_str, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::Store;
use crate::entities::change_order::{ChangeOrder, ChangeOrderStatus};
use crate::entities::project::Project;

#[derive(Subcommand, Debug)]
pub enum ChgCommands {
    /// List change orders
    List(ListArgs),

    /// Raise a change order against a project
    New(NewArgs),

    /// Approve a pending change order
    Approve(IdArg),

    /// Reject a pending change order
    Reject(IdArg),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only change orders for this project
    #[arg(long, short = 'p')]
    pub project: Option<String>,

    /// Only pending change orders
    #[arg(long)]
    pub pending: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Project ID (or unique prefix)
    pub project: String,

    /// Short title
    pub title: String,

    /// Amount added to the budget (negative for a credit)
    #[arg(long, short = 'a', allow_negative_numbers = true)]
    pub amount: f64,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Change order ID (or unique prefix)
    pub id: String,
}

pub fn run(cmd: ChgCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ChgCommands::List(args) => run_list(args, global),
        ChgCommands::New(args) => run_new(args, global),
        ChgCommands::Approve(args) => run_decide(args, ChangeOrderStatus::Approved, global),
        ChgCommands::Reject(args) => run_decide(args, ChangeOrderStatus::Rejected, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut orders: Vec<ChangeOrder> = ctx.store.list()?;

    if let Some(ref project) = args.project {
        let project: Project = ctx.store.get(project)?;
        orders.retain(|c| c.project_id == project.id);
    }
    if args.pending {
        orders.retain(|c| c.is_pending());
    }

    if print_structured(&orders, global.format)? {
        return Ok(());
    }

    let rows = orders
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                truncate_str(&c.title, 36),
                money(c.amount),
                c.status.to_string(),
                c.created.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "TITLE", "AMOUNT", "STATUS", "RAISED"], rows, global.format)?;

    if global.format == OutputFormat::Auto && !global.quiet {
        println!("{} change order(s)", style(orders.len()).cyan());
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    if !args.amount.is_finite() {
        return Err(miette::miette!("amount must be a number, got {}", args.amount));
    }

    let ctx = Context::open(global)?;
    let project: Project = ctx.store.get(&args.project)?;

    let mut order = ChangeOrder::new(project.id.clone(), args.title, args.amount, ctx.user());
    order.description = args.description;
    let id = ctx.store.save(&order)?;

    if global.format == OutputFormat::Id {
        println!("{}", id);
        return Ok(());
    }
    confirm(
        global,
        format!(
            "Raised change order {} ({}) on {}",
            style(&id).cyan(),
            money(order.amount),
            style(&project.name).yellow()
        ),
    );
    Ok(())
}

fn run_decide(args: IdArg, decision: ChangeOrderStatus, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut order: ChangeOrder = ctx.store.get(&args.id)?;

    if !order.is_pending() {
        return Err(miette::miette!(
            "change order {} is already {}",
            order.id,
            order.status
        ));
    }
    match decision {
        ChangeOrderStatus::Approved => order.approve(),
        _ => order.reject(),
    }
    ctx.store.save(&order)?;

    confirm(
        global,
        format!("Change order {} {}", style(&order.id).cyan(), order.status),
    );
    Ok(())
}
