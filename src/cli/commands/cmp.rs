//! `dce cmp` command - Catalog component management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{confirm, money, print_structured, print_table, truncate_str, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::Store;
use crate::cost::rollup::TierBadge;
use crate::entities::component::{Component, ComponentCategory, QualityTier};

#[derive(Subcommand, Debug)]
pub enum CmpCommands {
    /// List catalog components
    List(ListArgs),

    /// Create a new component
    New(NewArgs),

    /// Show a component's details and tiers
    Show(ShowArgs),

    /// Add a quality tier to a component
    AddTier(AddTierArgs),

    /// Remove a quality tier from a component
    RmTier(RmTierArgs),

    /// Delete a component
    Delete(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by category
    #[arg(long, short = 'c')]
    pub category: Option<ComponentCategory>,

    /// Search in name, manufacturer and tags
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Component name
    pub name: String,

    /// Trade category
    #[arg(long, short = 'c', default_value = "general")]
    pub category: ComponentCategory,

    /// Unit of measure
    #[arg(long, short = 'u', default_value = "ea")]
    pub unit: String,

    /// Installation labor hours per unit
    #[arg(long)]
    pub labor_hours: Option<f64>,

    #[arg(long)]
    pub manufacturer: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Quality tier as NAME=UNIT_COST (repeatable; the first is the default)
    #[arg(long = "tier", short = 't', value_parser = parse_tier_arg)]
    pub tiers: Vec<(String, f64)>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Component ID (or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AddTierArgs {
    /// Component ID (or unique prefix)
    pub id: String,

    /// Tier name (e.g., Standard)
    pub name: String,

    /// Material cost per unit
    pub unit_cost: f64,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RmTierArgs {
    /// Component ID (or unique prefix)
    pub id: String,

    /// Tier id or name
    pub tier: String,
}

fn parse_tier_arg(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, cost) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=UNIT_COST, got '{}'", s))?;
    let cost: f64 = cost
        .trim()
        .trim_start_matches('$')
        .parse()
        .map_err(|_| format!("invalid unit cost '{}'", cost))?;
    Ok((name.trim().to_string(), cost))
}

pub fn run(cmd: CmpCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CmpCommands::List(args) => run_list(args, global),
        CmpCommands::New(args) => run_new(args, global),
        CmpCommands::Show(args) => run_show(args, global),
        CmpCommands::AddTier(args) => run_add_tier(args, global),
        CmpCommands::RmTier(args) => run_rm_tier(args, global),
        CmpCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut components: Vec<Component> = ctx.store.list()?;

    if let Some(category) = args.category {
        components.retain(|c| c.category == category);
    }
    if let Some(ref needle) = args.search {
        let needle = needle.to_lowercase();
        components.retain(|c| {
            c.name.to_lowercase().contains(&needle)
                || c.manufacturer
                    .as_deref()
                    .is_some_and(|m| m.to_lowercase().contains(&needle))
                || c.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        });
    }
    components.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));

    if print_structured(&components, global.format)? {
        return Ok(());
    }

    let rows = components
        .iter()
        .map(|c| {
            let price = match c.price_range() {
                Some((lo, hi)) if lo == hi => money(lo),
                Some((lo, hi)) => format!("{} - {}", money(lo), money(hi)),
                None => "-".to_string(),
            };
            vec![
                c.id.to_string(),
                truncate_str(&c.name, 40),
                c.category.to_string(),
                c.unit.clone(),
                c.tiers.len().to_string(),
                price,
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "CATEGORY", "UNIT", "TIERS", "UNIT COST"], rows, global.format)?;

    if global.format == OutputFormat::Auto && !global.quiet {
        println!("{} component(s)", style(components.len()).cyan());
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;

    let mut component = Component::new(args.name, args.category, ctx.user());
    component.unit = args.unit;
    component.labor_hours = args.labor_hours;
    component.manufacturer = args.manufacturer;
    component.description = args.description;
    component.tags = args.tags;

    for (name, cost) in args.tiers {
        component.add_tier(QualityTier::new(name, cost, None)?)?;
    }

    let id = ctx.store.save(&component)?;

    if global.format == OutputFormat::Id {
        println!("{}", id);
        return Ok(());
    }
    confirm(
        global,
        format!(
            "Created component {} {}",
            style(&id).cyan(),
            style(&component.name).yellow()
        ),
    );
    if component.tiers.is_empty() && !global.quiet {
        println!(
            "   Add a price with {}",
            style(format!("dce cmp add-tier {} Standard <cost>", id)).yellow()
        );
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let cmp: Component = ctx.store.get(&args.id)?;

    if print_structured(&cmp, global.format)? {
        return Ok(());
    }
    if global.format == OutputFormat::Id {
        println!("{}", cmp.id);
        return Ok(());
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&cmp.id).cyan());
    println!("{}: {}", style("Name").bold(), style(&cmp.name).yellow());
    println!("{}: {}", style("Category").bold(), cmp.category);
    println!("{}: {}", style("Unit").bold(), cmp.unit);
    if let Some(hours) = cmp.labor_hours {
        println!("{}: {} h/{}", style("Labor").bold(), hours, cmp.unit);
    }
    if let Some(ref m) = cmp.manufacturer {
        println!("{}: {}", style("Manufacturer").bold(), m);
    }
    if !cmp.tags.is_empty() {
        println!("{}: {}", style("Tags").bold(), cmp.tags.join(", "));
    }
    println!("{}", style("─".repeat(60)).dim());

    if let Some(ref desc) = cmp.description {
        println!();
        println!("{}", desc);
    }

    println!();
    println!("{}", style("Quality Tiers:").bold());
    if cmp.tiers.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    for (i, tier) in cmp.tiers.iter().enumerate() {
        let badge = TierBadge::for_tier(tier);
        print!(
            "  {} {} {:>14}/{}",
            if i == 0 { "•" } else { " " },
            badge.paint(&format!("{:<12}", tier.name)),
            money(tier.unit_cost),
            cmp.unit
        );
        if let Some(ref d) = tier.description {
            print!("  {}", style(d).dim());
        }
        println!();
    }

    println!();
    println!(
        "{}: {} | {}: {}",
        style("Owner").dim(),
        cmp.owner,
        style("Created").dim(),
        cmp.created.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn run_add_tier(args: AddTierArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut cmp: Component = ctx.store.get(&args.id)?;

    let tier = QualityTier::new(args.name, args.unit_cost, args.description)?;
    let tier_id = cmp.add_tier(tier)?.id.clone();
    ctx.store.save(&cmp)?;

    confirm(
        global,
        format!(
            "Added tier {} to {} at {}",
            style(&tier_id).cyan(),
            style(&cmp.name).yellow(),
            money(args.unit_cost)
        ),
    );
    Ok(())
}

fn run_rm_tier(args: RmTierArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut cmp: Component = ctx.store.get(&args.id)?;

    let tier_id = cmp
        .tier(&args.tier)
        .map(|t| t.id.clone())
        .ok_or_else(|| miette::miette!("component '{}' has no tier '{}'", cmp.name, args.tier))?;
    cmp.tiers.retain(|t| t.id != tier_id);
    ctx.store.save(&cmp)?;

    confirm(
        global,
        format!("Removed tier {} from {}", style(&tier_id).cyan(), style(&cmp.name).yellow()),
    );
    Ok(())
}

fn run_delete(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let id = ctx.store.delete::<Component>(&args.id)?;
    confirm(global, format!("Deleted component {}", style(&id).cyan()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tier_arg() {
        assert_eq!(
            parse_tier_arg("Standard=48500").unwrap(),
            ("Standard".to_string(), 48500.0)
        );
        assert_eq!(
            parse_tier_arg("Tier III = $1250.50").unwrap(),
            ("Tier III".to_string(), 1250.5)
        );
        assert!(parse_tier_arg("Standard").is_err());
        assert!(parse_tier_arg("Standard=abc").is_err());
    }
}
