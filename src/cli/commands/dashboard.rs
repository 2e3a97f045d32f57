//! `dce dashboard` command - Portfolio overview

use console::style;
use miette::Result;

use crate::cli::helpers::{money, print_structured, print_table, truncate_str, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::Store;
use crate::cost::portfolio::Dashboard;
use crate::entities::actual_cost::ActualCost;
use crate::entities::change_order::ChangeOrder;
use crate::entities::estimate::Estimate;
use crate::entities::project::Project;

#[derive(clap::Args, Debug)]
pub struct DashboardArgs {
    /// Skip the per-category breakdown
    #[arg(long)]
    pub no_categories: bool,
}

pub fn run(args: DashboardArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let estimates: Vec<Estimate> = ctx.store.list()?;
    let projects: Vec<Project> = ctx.store.list()?;
    let actuals: Vec<ActualCost> = ctx.store.list()?;
    let change_orders: Vec<ChangeOrder> = ctx.store.list()?;

    let dashboard = Dashboard::compute(&estimates, &projects, &actuals, &change_orders);

    if print_structured(&dashboard, global.format)? {
        return Ok(());
    }

    if global.format == OutputFormat::Auto {
        println!("{}", style("Estimating dashboard").bold().underlined());
        println!();
        println!("  {:<20} {}", "Estimates", style(dashboard.estimate_count).cyan());
        println!("  {:<20} {}", "Total estimated", money(dashboard.total_estimated));
        println!(
            "  {:<20} {}",
            "Average estimate",
            dashboard
                .average_estimate
                .map(money)
                .unwrap_or_else(|| "-".to_string())
        );
        if let Some(ref largest) = dashboard.largest_estimate {
            println!(
                "  {:<20} {} ({})",
                "Largest",
                money(largest.total_cost),
                style(&largest.name).yellow()
            );
        }
        println!("  {:<20} {}", "Actual spend", money(dashboard.total_spent));
        println!();
    }

    if !dashboard.projects.is_empty() {
        let rows = dashboard
            .projects
            .iter()
            .map(|p| {
                let status = if p.critical_lines > 0 {
                    format!("{} critical", p.critical_lines)
                } else if p.over_budget() {
                    "over budget".to_string()
                } else {
                    "on track".to_string()
                };
                vec![
                    p.id.to_string(),
                    truncate_str(&p.name, 28),
                    p.adjusted_budget
                        .map(money)
                        .unwrap_or_else(|| "-".to_string()),
                    money(p.estimated),
                    money(p.spent),
                    p.pending_change_orders.to_string(),
                    status,
                ]
            })
            .collect();
        print_table(
            &["PROJECT", "NAME", "BUDGET", "ESTIMATED", "SPENT", "PENDING CHG", "STATUS"],
            rows,
            global.format,
        )?;
    }

    if !args.no_categories && !dashboard.categories.is_empty() {
        if global.format == OutputFormat::Auto {
            println!();
            println!("{}", style("By category").bold());
        }
        let rows = dashboard
            .categories
            .iter()
            .map(|c| {
                vec![
                    c.category.to_string(),
                    c.lines.to_string(),
                    money(c.material),
                    money(c.labor),
                    money(c.total),
                ]
            })
            .collect();
        print_table(
            &["CATEGORY", "LINES", "MATERIAL", "LABOR", "TOTAL"],
            rows,
            global.format,
        )?;
    }

    if global.format == OutputFormat::Auto && !global.quiet {
        let critical = dashboard.critical_projects();
        if critical > 0 {
            println!();
            println!(
                "{} {} project(s) with critical variances; see {}",
                style("!").red().bold(),
                critical,
                style("dce variance <EST>").yellow()
            );
        }
    }
    Ok(())
}
