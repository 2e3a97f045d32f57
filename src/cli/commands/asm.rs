//! `dce asm` command - Assembly management

use clap::Subcommand;
use console::style;
use miette::Result;
use std::collections::HashMap;

use crate::cli::helpers::{confirm, money, print_structured, print_table, truncate_str, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;
use crate::core::store::{Catalog, Store};
use crate::cost::builder::EstimateBuilder;
use crate::entities::assembly::Assembly;
use crate::entities::component::{Component, ComponentCategory};

#[derive(Subcommand, Debug)]
pub enum AsmCommands {
    /// List assemblies
    List(ListArgs),

    /// Create a new assembly
    New(NewArgs),

    /// Show an assembly and its members
    Show(IdArg),

    /// Add a component to an assembly
    #[command(name = "add")]
    AddComponent(AddComponentArgs),

    /// Remove a component from an assembly
    #[command(name = "rm")]
    RemoveComponent(RemoveComponentArgs),

    /// Price one unit of an assembly from the current catalog
    Cost(IdArg),

    /// Delete an assembly
    Delete(IdArg),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by category
    #[arg(long, short = 'c')]
    pub category: Option<ComponentCategory>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Assembly name
    pub name: String,

    #[arg(long, short = 'c', default_value = "general")]
    pub category: ComponentCategory,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Assembly ID (or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AddComponentArgs {
    /// Assembly ID (or unique prefix)
    pub assembly: String,

    /// Component ID (or unique prefix)
    pub component: String,

    /// Units of the component per assembly
    #[arg(long, short = 'n', default_value_t = 1.0)]
    pub qty: f64,
}

#[derive(clap::Args, Debug)]
pub struct RemoveComponentArgs {
    /// Assembly ID (or unique prefix)
    pub assembly: String,

    /// Component ID (or unique prefix)
    pub component: String,
}

pub fn run(cmd: AsmCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        AsmCommands::List(args) => run_list(args, global),
        AsmCommands::New(args) => run_new(args, global),
        AsmCommands::Show(args) => run_show(args, global),
        AsmCommands::AddComponent(args) => run_add_component(args, global),
        AsmCommands::RemoveComponent(args) => run_remove_component(args, global),
        AsmCommands::Cost(args) => run_cost(args, global),
        AsmCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut assemblies: Vec<Assembly> = ctx.store.list()?;
    if let Some(category) = args.category {
        assemblies.retain(|a| a.category == category);
    }
    assemblies.sort_by(|a, b| a.name.cmp(&b.name));

    if print_structured(&assemblies, global.format)? {
        return Ok(());
    }

    let rows = assemblies
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                truncate_str(&a.name, 40),
                a.category.to_string(),
                a.members.len().to_string(),
                format!("{}", a.total_component_count()),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "CATEGORY", "MEMBERS", "UNITS"], rows, global.format)?;

    if global.format == OutputFormat::Auto && !global.quiet {
        println!("{} assembly(ies)", style(assemblies.len()).cyan());
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut asm = Assembly::new(args.name, args.category, ctx.user());
    asm.description = args.description;
    asm.tags = args.tags;

    let id = ctx.store.save(&asm)?;
    if global.format == OutputFormat::Id {
        println!("{}", id);
        return Ok(());
    }
    confirm(
        global,
        format!("Created assembly {} {}", style(&id).cyan(), style(&asm.name).yellow()),
    );
    if !global.quiet {
        println!(
            "   Add members with {}",
            style(format!("dce asm add {} <CMP> --qty <n>", id)).yellow()
        );
    }
    Ok(())
}

fn run_show(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let asm: Assembly = ctx.store.get(&args.id)?;

    if print_structured(&asm, global.format)? {
        return Ok(());
    }
    if global.format == OutputFormat::Id {
        println!("{}", asm.id);
        return Ok(());
    }

    let resolved = ctx.store.resolve_components(&asm.component_ids())?;

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&asm.id).cyan());
    println!("{}: {}", style("Name").bold(), style(&asm.name).yellow());
    println!("{}: {}", style("Category").bold(), asm.category);
    if !asm.tags.is_empty() {
        println!("{}: {}", style("Tags").bold(), asm.tags.join(", "));
    }
    println!("{}", style("─".repeat(60)).dim());
    if let Some(ref desc) = asm.description {
        println!();
        println!("{}", desc);
    }

    println!();
    println!("{}", style("Members:").bold());
    if asm.members.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    for member in &asm.members {
        println!(
            "  {:>6} × {}  {}",
            member.quantity,
            member_label(&member.component_id, &resolved),
            style(&member.component_id).dim()
        );
    }
    Ok(())
}

fn member_label(id: &EntityId, resolved: &HashMap<EntityId, Component>) -> String {
    match resolved.get(id) {
        Some(c) => c.name.clone(),
        None => style("(missing component)").red().to_string(),
    }
}

fn run_add_component(args: AddComponentArgs, global: &GlobalOpts) -> Result<()> {
    if !(args.qty > 0.0) || !args.qty.is_finite() {
        return Err(miette::miette!(
            "member quantity must be greater than zero, got {}",
            args.qty
        ));
    }

    let ctx = Context::open(global)?;
    let mut asm: Assembly = ctx.store.get(&args.assembly)?;
    let cmp: Component = ctx.store.get(&args.component)?;

    asm.add_member(cmp.id.clone(), args.qty);
    ctx.store.save(&asm)?;

    confirm(
        global,
        format!(
            "Added {} × {} to {}",
            args.qty,
            style(&cmp.name).yellow(),
            style(&asm.name).cyan()
        ),
    );
    Ok(())
}

fn run_remove_component(args: RemoveComponentArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut asm: Assembly = ctx.store.get(&args.assembly)?;

    let target = asm
        .members
        .iter()
        .map(|m| m.component_id.clone())
        .find(|id| id.to_string().starts_with(args.component.trim()))
        .ok_or_else(|| {
            miette::miette!("assembly '{}' has no member '{}'", asm.name, args.component)
        })?;
    asm.remove_member(&target);
    ctx.store.save(&asm)?;

    confirm(
        global,
        format!("Removed {} from {}", style(&target).cyan(), style(&asm.name).yellow()),
    );
    Ok(())
}

fn run_cost(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let asm: Assembly = ctx.store.get(&args.id)?;
    let rate = ctx.config.labor_rate_for(ctx.user());

    let mut preview = EstimateBuilder::new(&asm.name).labor_rate(rate)?;
    let addition = preview.add_assembly(&asm, 1, &ctx.store)?;
    let Some(line) = preview.assemblies().iter().find(|a| a.id == addition.line_id) else {
        return Ok(());
    };

    if print_structured(line, global.format)? {
        return Ok(());
    }

    let rows = line
        .components
        .iter()
        .map(|c| {
            vec![
                c.component_id.to_string(),
                truncate_str(&c.component_name, 32),
                c.quality_tier.name.clone(),
                format!("{}", c.quantity),
                money(c.material_cost()),
                money(c.labor_cost()),
                money(c.total_cost),
            ]
        })
        .collect();
    print_table(
        &["COMPONENT", "NAME", "TIER", "QTY", "MATERIAL", "LABOR", "TOTAL"],
        rows,
        global.format,
    )?;

    if global.format == OutputFormat::Auto {
        println!(
            "{} material {} + labor {} ({} h) = {}",
            style("Per assembly:").bold(),
            money(line.total_material_cost),
            money(line.total_labor_cost),
            line.total_labor_hours,
            style(money(line.display_total())).green().bold()
        );
        for id in &addition.skipped {
            println!(
                "{} skipped {} (missing component or no tiers)",
                style("!").yellow(),
                style(id).cyan()
            );
        }
    }
    Ok(())
}

fn run_delete(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let id = ctx.store.delete::<Assembly>(&args.id)?;
    confirm(global, format!("Deleted assembly {}", style(&id).cyan()));
    Ok(())
}
