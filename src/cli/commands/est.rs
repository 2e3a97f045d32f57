//! `dce est` command - Cost estimates
//!
//! Every edit reopens the saved estimate in an [`EstimateBuilder`], applies
//! the change and rebuilds it, so the stored totals always match the lines.

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{
    confirm, format_short_id, money, print_structured, print_table, truncate_str, Context,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::Store;
use crate::cost::builder::{BuildError, EstimateBuilder, QuantityChange};
use crate::cost::export;
use crate::cost::rollup::{category_breakdown, CostTotals, TierBadge};
use crate::entities::assembly::Assembly;
use crate::entities::component::Component;
use crate::entities::estimate::{ComponentLineItem, Estimate};
use crate::entities::project::Project;

#[derive(Subcommand, Debug)]
pub enum EstCommands {
    /// List estimates
    List(ListArgs),

    /// Create a new, empty estimate
    New(NewArgs),

    /// Show an estimate with its lines and totals
    Show(IdArg),

    /// Add a catalog component as a line (same component and tier adds a unit)
    AddCmp(AddCmpArgs),

    /// Add an assembly, priced from the catalog
    AddAsm(AddAsmArgs),

    /// Change a line's quantity (0 or less removes it)
    SetQty(SetQtyArgs),

    /// Remove a line
    RmItem(LineArgs),

    /// Export an estimate as CSV sheets
    Export(ExportArgs),

    /// Delete an estimate
    Delete(IdArg),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only estimates for this project
    #[arg(long, short = 'p')]
    pub project: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Estimate name
    pub name: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Project this estimate prices (PRJ id or prefix)
    #[arg(long, short = 'p')]
    pub project: Option<String>,

    /// Labor rate in $/hour (default: your configured rate)
    #[arg(long)]
    pub labor_rate: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Estimate ID (or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AddCmpArgs {
    /// Estimate ID (or unique prefix)
    pub estimate: String,

    /// Component ID (or unique prefix)
    pub component: String,

    /// Quality tier id or name (default: the component's first tier)
    #[arg(long, short = 't')]
    pub tier: Option<String>,

    /// Units to add
    #[arg(long, short = 'n', default_value_t = 1.0)]
    pub qty: f64,
}

#[derive(clap::Args, Debug)]
pub struct AddAsmArgs {
    /// Estimate ID (or unique prefix)
    pub estimate: String,

    /// Assembly ID (or unique prefix)
    pub assembly: String,

    /// Number of assemblies
    #[arg(long, short = 'n', default_value_t = 1)]
    pub qty: u32,
}

#[derive(clap::Args, Debug)]
pub struct SetQtyArgs {
    /// Estimate ID (or unique prefix)
    pub estimate: String,

    /// Line id (or unique prefix)
    pub line: String,

    /// New quantity
    #[arg(allow_negative_numbers = true)]
    pub quantity: f64,
}

#[derive(clap::Args, Debug)]
pub struct LineArgs {
    /// Estimate ID (or unique prefix)
    pub estimate: String,

    /// Line id (or unique prefix)
    pub line: String,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Estimate ID (or unique prefix)
    pub id: String,

    /// Output directory (created if missing)
    #[arg(long, short = 'o', default_value = ".")]
    pub out: PathBuf,
}

pub fn run(cmd: EstCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        EstCommands::List(args) => run_list(args, global),
        EstCommands::New(args) => run_new(args, global),
        EstCommands::Show(args) => run_show(args, global),
        EstCommands::AddCmp(args) => run_add_cmp(args, global),
        EstCommands::AddAsm(args) => run_add_asm(args, global),
        EstCommands::SetQty(args) => run_set_qty(args, global),
        EstCommands::RmItem(args) => run_rm_item(args, global),
        EstCommands::Export(args) => run_export(args, global),
        EstCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut estimates: Vec<Estimate> = ctx.store.list()?;

    if let Some(ref project) = args.project {
        let project: Project = ctx.store.get(project)?;
        estimates.retain(|e| e.project_id.as_ref() == Some(&project.id));
    }
    estimates.sort_by(|a, b| b.updated.cmp(&a.updated));

    let summaries: Vec<_> = estimates.iter().map(|e| e.summary()).collect();
    if print_structured(&summaries, global.format)? {
        return Ok(());
    }

    let rows = summaries
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                truncate_str(&s.name, 36),
                s.shape.to_string(),
                s.lines.to_string(),
                money(s.total_cost),
                s.project_id
                    .as_ref()
                    .map(format_short_id)
                    .unwrap_or_else(|| "-".to_string()),
                s.updated.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "NAME", "SHAPE", "LINES", "TOTAL", "PROJECT", "UPDATED"],
        rows,
        global.format,
    )?;

    if global.format == OutputFormat::Auto && !global.quiet {
        let total: f64 = summaries.iter().map(|s| s.total_cost).sum();
        println!(
            "{} estimate(s), {} combined",
            style(summaries.len()).cyan(),
            style(money(total)).green()
        );
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;

    let project_id = match args.project {
        Some(ref p) => Some(ctx.store.get::<Project>(p)?.id),
        None => None,
    };
    let rate = args
        .labor_rate
        .or_else(|| ctx.config.labor_rate_for(ctx.user()));

    let estimate = EstimateBuilder::new(args.name)
        .description(args.description)
        .project(project_id)
        .labor_rate(rate)?
        .build(ctx.user())?;
    let id = ctx.store.save(&estimate)?;

    if global.format == OutputFormat::Id {
        println!("{}", id);
        return Ok(());
    }
    confirm(
        global,
        format!("Created estimate {} {}", style(&id).cyan(), style(&estimate.name).yellow()),
    );
    if !global.quiet {
        match rate {
            Some(r) => println!("   Labor priced at {}/h", money(r)),
            None => println!(
                "   {}",
                style("No labor rate configured; lines carry material cost only").dim()
            ),
        }
    }
    Ok(())
}

fn run_show(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let est: Estimate = ctx.store.get(&args.id)?;

    if print_structured(&est, global.format)? {
        return Ok(());
    }
    if global.format == OutputFormat::Id {
        println!("{}", est.id);
        return Ok(());
    }

    println!("{}", style("─".repeat(72)).dim());
    println!("{}: {}", style("ID").bold(), style(&est.id).cyan());
    println!("{}: {}", style("Name").bold(), style(&est.name).yellow());
    println!("{}: {}", style("Shape").bold(), est.body.shape());
    if let Some(ref p) = est.project_id {
        println!("{}: {}", style("Project").bold(), p);
    }
    if let Some(rate) = est.labor_rate {
        println!("{}: {}/h", style("Labor rate").bold(), money(rate));
    }
    println!("{}", style("─".repeat(72)).dim());
    if let Some(ref desc) = est.description {
        println!();
        println!("{}", desc);
    }

    println!();
    if est.body.line_count() == 0 {
        println!("  {}", style("(no lines yet)").dim());
    }
    for item in est.items() {
        print_line(item, "  ");
    }
    for asm in est.assemblies() {
        println!(
            "  {} {} × {}  {}",
            style(short_line(&asm.id)).dim(),
            asm.quantity,
            style(&asm.assembly_name).bold(),
            style(money(asm.display_total())).green()
        );
        for item in &asm.components {
            print_line(item, "      ");
        }
    }

    let totals = CostTotals::of(&est);
    println!();
    println!("{}", style("Totals:").bold());
    println!("  {:<12} {:>16}", "Material", money(totals.material));
    println!("  {:<12} {:>16}", "Labor", money(totals.labor));
    println!("  {:<12} {:>16}", "Labor hours", totals.labor_hours);
    println!(
        "  {:<12} {}",
        "Total",
        style(format!("{:>16}", money(est.total_cost))).green().bold()
    );

    let breakdown = category_breakdown(&est);
    if breakdown.len() > 1 {
        println!();
        println!("{}", style("By category:").bold());
        for row in breakdown {
            println!("  {:<16} {:>16}", row.category.to_string(), money(row.total));
        }
    }

    println!();
    println!(
        "{}: {} | {}: {}",
        style("Owner").dim(),
        est.owner,
        style("Updated").dim(),
        est.updated.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn print_line(item: &ComponentLineItem, indent: &str) {
    let badge = TierBadge::for_tier(&item.quality_tier);
    println!(
        "{}{} {:>8} {:<4} {:<32} {} {:>14}",
        indent,
        style(short_line(&item.id)).dim(),
        item.quantity,
        item.unit,
        truncate_str(&item.component_name, 32),
        badge.paint(&format!("{:<10}", item.quality_tier.name)),
        money(item.total_cost)
    );
}

/// Line ids are ULIDs; the tail is the part that differs between lines
fn short_line(id: &str) -> &str {
    match id.char_indices().rev().nth(7) {
        Some((start, _)) => &id[start..],
        None => id,
    }
}

/// Find a line by full id, unique prefix or unique suffix (as shown by `show`)
fn resolve_line(builder: &EstimateBuilder, key: &str) -> Result<String> {
    let key = key.trim().to_uppercase();
    let ids = builder
        .items()
        .iter()
        .map(|i| i.id.as_str())
        .chain(builder.assemblies().iter().map(|a| a.id.as_str()));

    let matches: Vec<&str> = ids
        .filter(|id| *id == key || id.starts_with(&key) || id.ends_with(&key))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.to_string()),
        [] => Err(BuildError::NoSuchLine(key).into()),
        _ => Err(miette::miette!(
            "line '{}' matches {} lines; use more characters",
            key,
            matches.len()
        )),
    }
}

fn run_add_cmp(args: AddCmpArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let est: Estimate = ctx.store.get(&args.estimate)?;
    let cmp: Component = ctx.store.get(&args.component)?;

    let mut builder = EstimateBuilder::from_estimate(est);
    let line_id = builder.add_units(&cmp, args.tier.as_deref(), args.qty)?;
    let est = builder.build(ctx.user())?;
    ctx.store.save(&est)?;

    if global.format == OutputFormat::Id {
        println!("{}", line_id);
        return Ok(());
    }
    confirm(
        global,
        format!(
            "Added {} to {} (line {}), estimate total {}",
            style(&cmp.name).yellow(),
            style(&est.name).cyan(),
            short_line(&line_id),
            style(money(est.total_cost)).green()
        ),
    );
    Ok(())
}

fn run_add_asm(args: AddAsmArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let est: Estimate = ctx.store.get(&args.estimate)?;
    let asm: Assembly = ctx.store.get(&args.assembly)?;

    let mut builder = EstimateBuilder::from_estimate(est);
    let addition = builder.add_assembly(&asm, args.qty, &ctx.store)?;
    let est = builder.build(ctx.user())?;
    ctx.store.save(&est)?;

    if global.format == OutputFormat::Id {
        println!("{}", addition.line_id);
        return Ok(());
    }
    confirm(
        global,
        format!(
            "Added {} × {} to {} (line {}), estimate total {}",
            args.qty,
            style(&asm.name).yellow(),
            style(&est.name).cyan(),
            short_line(&addition.line_id),
            style(money(est.total_cost)).green()
        ),
    );
    for id in &addition.skipped {
        eprintln!(
            "{} skipped member {} (missing component or no quality tiers)",
            style("!").yellow(),
            style(id).cyan()
        );
    }
    Ok(())
}

fn run_set_qty(args: SetQtyArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let est: Estimate = ctx.store.get(&args.estimate)?;

    let mut builder = EstimateBuilder::from_estimate(est);
    let line_id = resolve_line(&builder, &args.line)?;
    let change = builder.update_quantity(&line_id, args.quantity)?;
    let est = builder.build(ctx.user())?;
    ctx.store.save(&est)?;

    let what = match change {
        QuantityChange::Updated => format!("Set line {} to {}", short_line(&line_id), args.quantity),
        QuantityChange::Removed => format!("Removed line {}", short_line(&line_id)),
    };
    confirm(
        global,
        format!("{}, estimate total {}", what, style(money(est.total_cost)).green()),
    );
    Ok(())
}

fn run_rm_item(args: LineArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let est: Estimate = ctx.store.get(&args.estimate)?;

    let mut builder = EstimateBuilder::from_estimate(est);
    let line_id = resolve_line(&builder, &args.line)?;
    builder.remove(&line_id);
    let est = builder.build(ctx.user())?;
    ctx.store.save(&est)?;

    confirm(
        global,
        format!(
            "Removed line {}, estimate total {}",
            short_line(&line_id),
            style(money(est.total_cost)).green()
        ),
    );
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let est: Estimate = ctx.store.get(&args.id)?;

    let files = export::write_sheets(&est, &args.out)?;
    if global.quiet {
        return Ok(());
    }
    confirm(
        global,
        format!("Exported {} to {}", style(&est.name).yellow(), style(args.out.display()).cyan()),
    );
    for file in files {
        println!("   {}", file.display());
    }
    Ok(())
}

fn run_delete(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let id = ctx.store.delete::<Estimate>(&args.id)?;
    confirm(global, format!("Deleted estimate {}", style(&id).cyan()));
    Ok(())
}
