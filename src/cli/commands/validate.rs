//! `dce validate` command - Validate workspace files against schemas
//!
//! Besides the schema check, estimates are checked for stored totals that
//! no longer match their lines and actual costs for totals that are not
//! quantity × unit cost.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::helpers::open_workspace;
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::core::session::Session;
use crate::core::workspace::{Workspace, RECORD_SUFFIX};
use crate::cost::rollup::{self, round_cents};
use crate::entities::actual_cost::ActualCost;
use crate::entities::estimate::Estimate;
use crate::schema::validator::Validator;
use crate::yaml::parse_yaml;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Paths to validate (default: entire workspace)
    #[arg()]
    pub paths: Vec<PathBuf>,

    /// Strict mode - calculation warnings become errors
    #[arg(long)]
    pub strict: bool,

    /// Only validate one entity type (e.g., est, act)
    #[arg(long, short = 't')]
    pub entity_type: Option<EntityPrefix>,

    /// Continue validation after first error
    #[arg(long)]
    pub keep_going: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,

    /// Rewrite stale stored totals in your own records
    #[arg(long)]
    pub fix: bool,
}

#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
    total_warnings: usize,
    files_fixed: usize,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let validator = Validator::default();

    // Fixing rewrites records, so it needs to know whose records those are
    let fixer = if args.fix {
        Some(Session::current(&workspace)?.user().to_string())
    } else {
        None
    };

    let files = if args.paths.is_empty() {
        all_record_files(&workspace)
    } else {
        expand_paths(&args.paths)
    };

    let mut stats = ValidationStats::default();
    let mut had_error = false;

    if !args.summary {
        println!(
            "{} Validating {} file(s)...\n",
            style("→").blue(),
            files.len()
        );
    }

    for path in &files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let Some(prefix) = EntityPrefix::from_filename(&filename) else {
            if !args.summary {
                println!(
                    "{} {} - unknown entity type (skipped)",
                    style("?").yellow(),
                    path.display()
                );
            }
            continue;
        };
        if args.entity_type.is_some_and(|t| t != prefix) {
            continue;
        }

        stats.files_checked += 1;

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                if !args.summary {
                    println!("{} {} - {}", style("✗").red(), path.display(), e);
                }
                stats.files_failed += 1;
                stats.total_errors += 1;
                had_error = true;
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };

        if let Err(e) = validator.validate(&content, &filename, prefix) {
            stats.files_failed += 1;
            stats.total_errors += e.violation_count();
            had_error = true;

            if !args.summary {
                println!(
                    "{} {} - {} error(s)",
                    style("✗").red(),
                    path.display(),
                    e.violation_count()
                );
                let report = miette::Report::new(e);
                println!("{:?}", report);
            }

            if !args.keep_going {
                break;
            }
            continue;
        }

        let issues = match prefix {
            EntityPrefix::Est => check_estimate(&content, &filename)?,
            EntityPrefix::Act => check_actual_cost(&content, &filename)?,
            _ => Vec::new(),
        };

        if issues.is_empty() {
            stats.files_passed += 1;
            if !args.summary {
                println!("{} {}", style("✓").green(), path.display());
            }
            continue;
        }

        if let Some(ref user) = fixer {
            if fix_totals(path, &content, prefix, user)? {
                stats.files_fixed += 1;
                stats.files_passed += 1;
                if !args.summary {
                    println!("{} {} (fixed)", style("✓").green(), path.display());
                }
                continue;
            }
        }

        stats.total_warnings += issues.len();
        if !args.summary {
            println!(
                "{} {} - {} calculation warning(s)",
                style("!").yellow(),
                path.display(),
                issues.len()
            );
            for issue in &issues {
                println!("    {}", style(issue).yellow());
            }
        }
        if args.strict {
            stats.files_failed += 1;
            had_error = true;
        } else {
            stats.files_passed += 1;
        }
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());
    if stats.total_warnings > 0 {
        println!("  Total warnings: {}", style(stats.total_warnings).yellow());
    }
    if stats.files_fixed > 0 {
        println!("  Files fixed:    {}", style(stats.files_fixed).cyan());
    }
    println!();

    if had_error {
        if stats.files_failed == 1 {
            Err(miette::miette!("Validation failed: 1 file has errors"))
        } else {
            Err(miette::miette!(
                "Validation failed: {} files have errors",
                stats.files_failed
            ))
        }
    } else {
        println!("{} All files passed validation!", style("✓").green().bold());
        Ok(())
    }
}

fn all_record_files(workspace: &Workspace) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = EntityPrefix::all()
        .iter()
        .flat_map(|p| workspace.iter_entity_files(*p))
        .collect();
    files.sort();
    files
}

/// Expand paths - if a directory is given, find all record files in it
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if entry.path().to_string_lossy().ends_with(RECORD_SUFFIX) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        }
    }

    files.sort();
    files
}

/// Stored estimate totals that disagree with the lines
fn check_estimate(content: &str, filename: &str) -> Result<Vec<String>> {
    let estimate: Estimate = parse_yaml(content, filename)?;
    let mut issues = Vec::new();

    if let Some(drift) = rollup::stored_total_drift(&estimate) {
        issues.push(format!(
            "total_cost mismatch: stored {:.2} but lines sum to {:.2} (off by {:+.2})",
            estimate.total_cost,
            round_cents(rollup::grand_total(&estimate)),
            drift
        ));
    }
    let hours = rollup::total_labor_hours(&estimate);
    if (hours - estimate.total_labor_hours).abs() > 1e-6 {
        issues.push(format!(
            "total_labor_hours mismatch: stored {} but lines sum to {}",
            estimate.total_labor_hours, hours
        ));
    }
    Ok(issues)
}

fn check_actual_cost(content: &str, filename: &str) -> Result<Vec<String>> {
    let cost: ActualCost = parse_yaml(content, filename)?;
    if cost.total_is_consistent() {
        return Ok(Vec::new());
    }
    Ok(vec![format!(
        "actual_total_cost mismatch: stored {:.2} but {} × {:.2} = {:.2}",
        cost.actual_total_cost,
        cost.actual_quantity,
        cost.actual_unit_cost,
        round_cents(cost.actual_quantity * cost.actual_unit_cost)
    )])
}

/// Rewrite derived totals in place; returns false for records of other owners
fn fix_totals(path: &Path, content: &str, prefix: EntityPrefix, user: &str) -> Result<bool> {
    let mut value: serde_yml::Value = serde_yml::from_str(content)
        .map_err(|e| miette::miette!("Failed to re-parse YAML: {}", e))?;

    if value.get("owner").and_then(|o| o.as_str()) != Some(user) {
        return Ok(false);
    }

    let updates: Vec<(&str, f64)> = match prefix {
        EntityPrefix::Est => {
            let estimate: Estimate = parse_yaml(content, &path.display().to_string())?;
            vec![
                ("total_cost", round_cents(rollup::grand_total(&estimate))),
                ("total_labor_hours", rollup::total_labor_hours(&estimate)),
            ]
        }
        EntityPrefix::Act => {
            let cost: ActualCost = parse_yaml(content, &path.display().to_string())?;
            vec![(
                "actual_total_cost",
                cost.actual_quantity * cost.actual_unit_cost,
            )]
        }
        _ => return Ok(false),
    };

    let Some(map) = value.as_mapping_mut() else {
        return Ok(false);
    };
    for (key, amount) in updates {
        map.insert(serde_yml::Value::from(key), serde_yml::Value::from(amount));
    }

    let updated = serde_yml::to_string(&value).into_diagnostic()?;
    std::fs::write(path, updated).into_diagnostic()?;
    tracing::info!(path = %path.display(), "rewrote stored totals");
    Ok(true)
}
