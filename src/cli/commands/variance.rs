//! `dce variance` command - Estimated versus actual cost per component

use console::style;
use miette::Result;

use crate::cli::helpers::{money, percent, print_structured, print_table, truncate_str, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::Store;
use crate::cost::variance::{analyze, CRITICAL_VARIANCE_PCT};
use crate::entities::actual_cost::ActualCost;
use crate::entities::estimate::Estimate;
use crate::entities::project::Project;

#[derive(clap::Args, Debug)]
pub struct VarianceArgs {
    /// Estimate ID (or unique prefix)
    pub estimate: String,

    /// Compare against this project's costs instead of the estimate's project
    #[arg(long, short = 'p')]
    pub project: Option<String>,

    /// Only show lines over the critical threshold
    #[arg(long)]
    pub critical: bool,
}

pub fn run(args: VarianceArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let estimate: Estimate = ctx.store.get(&args.estimate)?;

    let project_id = match (&args.project, &estimate.project_id) {
        (Some(p), _) => ctx.store.get::<Project>(p)?.id,
        (None, Some(id)) => id.clone(),
        (None, None) => {
            return Err(miette::miette!(
                help = "Pass --project, or create the estimate with `dce est new --project`.",
                "estimate {} is not linked to a project",
                estimate.id
            ))
        }
    };

    let actuals: Vec<ActualCost> = ctx
        .store
        .list::<ActualCost>()?
        .into_iter()
        .filter(|a| a.project_id == project_id)
        .collect();

    let mut report = analyze(&estimate, &actuals);
    if args.critical {
        report.lines.retain(|l| l.is_critical());
    }

    if print_structured(&report, global.format)? {
        return Ok(());
    }

    let rows = report
        .lines
        .iter()
        .map(|l| {
            vec![
                l.component_id.to_string(),
                truncate_str(&l.component_name, 28),
                format!("{}", l.estimated_quantity),
                money(l.estimated_total),
                format!("{}", l.actual_quantity),
                money(l.actual_total),
                money(l.cost_variance),
                percent(l.cost_variance_percentage),
                if l.is_critical() { "CRITICAL" } else { "" }.to_string(),
            ]
        })
        .collect();
    print_table(
        &[
            "COMPONENT", "NAME", "EST QTY", "ESTIMATED", "ACT QTY", "ACTUAL", "VARIANCE", "%", "",
        ],
        rows,
        global.format,
    )?;

    if global.format != OutputFormat::Auto || global.quiet {
        return Ok(());
    }

    println!();
    println!(
        "{} {}  {} {}  {} {} ({})",
        style("Estimated").bold(),
        money(report.estimated_total),
        style("Actual").bold(),
        money(report.actual_total),
        style("Variance").bold(),
        money(report.cost_variance),
        percent(report.cost_variance_percentage)
    );

    let critical = report.critical_count();
    if critical > 0 {
        println!(
            "{} {} component(s) over budget by more than {}%",
            style("!").red().bold(),
            style(critical).red(),
            CRITICAL_VARIANCE_PCT
        );
    }
    if !report.unmatched_actuals.is_empty() {
        println!(
            "{} {} actual cost(s) for components not in this estimate (counted in the actual total):",
            style("!").yellow(),
            report.unmatched_actuals.len()
        );
        for id in &report.unmatched_actuals {
            println!("    {}", style(id).cyan());
        }
    }
    Ok(())
}
