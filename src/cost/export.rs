//! Spreadsheet export - one CSV file per sheet
//!
//! The four sheets are `summary.csv` (headline numbers), `categories.csv`
//! (per-category totals), `components.csv` (every priced component line,
//! with the owning assembly for hierarchical estimates) and
//! `assemblies.csv` (one row per assembly line, empty for flat estimates).

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cost::rollup::{category_breakdown, round_cents, CostTotals};
use crate::entities::estimate::{AssemblyEstimateItem, ComponentLineItem, Estimate};

pub const SUMMARY_SHEET: &str = "summary.csv";
pub const CATEGORIES_SHEET: &str = "categories.csv";
pub const COMPONENTS_SHEET: &str = "components.csv";
pub const ASSEMBLIES_SHEET: &str = "assemblies.csv";

#[derive(Debug, Error, miette::Diagnostic)]
pub enum ExportError {
    #[error("failed to create export directory {path}: {message}")]
    #[diagnostic(code(dce::export::dir))]
    Directory { path: PathBuf, message: String },

    #[error("failed to write {path}: {message}")]
    #[diagnostic(code(dce::export::write))]
    Write { path: PathBuf, message: String },
}

/// Write all four sheets for an estimate into `dir`, returning the file paths
pub fn write_sheets(estimate: &Estimate, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::Directory {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let sheets: [(&str, Vec<Vec<String>>); 4] = [
        (SUMMARY_SHEET, summary_rows(estimate)),
        (CATEGORIES_SHEET, category_rows(estimate)),
        (COMPONENTS_SHEET, component_rows(estimate)),
        (ASSEMBLIES_SHEET, assembly_rows(estimate)),
    ];

    let mut written = Vec::with_capacity(sheets.len());
    for (name, rows) in sheets {
        let path = dir.join(name);
        write_csv(&path, &rows).map_err(|e| ExportError::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "wrote sheet");
        written.push(path);
    }
    Ok(written)
}

fn write_csv(path: &Path, rows: &[Vec<String>]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn amount(value: f64) -> String {
    format!("{:.2}", round_cents(value))
}

fn summary_rows(estimate: &Estimate) -> Vec<Vec<String>> {
    let totals = CostTotals::of(estimate);
    let pairs: Vec<(&str, String)> = vec![
        ("id", estimate.id.to_string()),
        ("name", estimate.name.clone()),
        ("shape", estimate.body.shape().to_string()),
        (
            "project_id",
            estimate
                .project_id
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_default(),
        ),
        (
            "labor_rate",
            estimate.labor_rate.map(amount).unwrap_or_default(),
        ),
        ("lines", estimate.body.line_count().to_string()),
        ("material_cost", amount(totals.material)),
        ("labor_cost", amount(totals.labor)),
        ("labor_hours", format!("{}", totals.labor_hours)),
        ("total_cost", amount(estimate.total_cost)),
        ("owner", estimate.owner.clone()),
        ("created", estimate.created.to_rfc3339()),
        ("updated", estimate.updated.to_rfc3339()),
    ];

    let mut rows = vec![vec!["field".to_string(), "value".to_string()]];
    rows.extend(pairs.into_iter().map(|(k, v)| vec![k.to_string(), v]));
    rows
}

fn category_rows(estimate: &Estimate) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![["category", "lines", "material", "labor", "total"]
        .iter()
        .map(|s| s.to_string())
        .collect()];
    for row in category_breakdown(estimate) {
        rows.push(vec![
            row.category.to_string(),
            row.lines.to_string(),
            amount(row.material),
            amount(row.labor),
            amount(row.total),
        ]);
    }
    rows
}

fn component_rows(estimate: &Estimate) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![[
        "assembly_line",
        "line",
        "component_id",
        "component",
        "category",
        "tier",
        "quantity",
        "unit",
        "unit_cost",
        "labor_hours",
        "labor_rate",
        "material",
        "labor",
        "total",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()];

    for item in estimate.items() {
        rows.push(component_row("", item));
    }
    for asm in estimate.assemblies() {
        for item in &asm.components {
            rows.push(component_row(&asm.id, item));
        }
    }
    rows
}

fn component_row(assembly_line: &str, item: &ComponentLineItem) -> Vec<String> {
    vec![
        assembly_line.to_string(),
        item.id.clone(),
        item.component_id.to_string(),
        item.component_name.clone(),
        item.category.to_string(),
        item.quality_tier.name.clone(),
        format!("{}", item.quantity),
        item.unit.clone(),
        amount(item.quality_tier.unit_cost),
        item.labor_hours.map(|h| format!("{}", h)).unwrap_or_default(),
        item.labor_rate.map(amount).unwrap_or_default(),
        amount(item.material_cost()),
        amount(item.labor_cost()),
        amount(item.total_cost),
    ]
}

fn assembly_rows(estimate: &Estimate) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![[
        "line",
        "assembly_id",
        "assembly",
        "category",
        "quantity",
        "material_each",
        "labor_each",
        "labor_hours_each",
        "total",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()];
    rows.extend(estimate.assemblies().iter().map(assembly_row));
    rows
}

fn assembly_row(asm: &AssemblyEstimateItem) -> Vec<String> {
    vec![
        asm.id.clone(),
        asm.assembly_id.to_string(),
        asm.assembly_name.clone(),
        asm.category.to_string(),
        asm.quantity.to_string(),
        amount(asm.total_material_cost),
        amount(asm.total_labor_cost),
        format!("{}", asm.total_labor_hours),
        amount(asm.display_total()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::builder::EstimateBuilder;
    use crate::entities::assembly::Assembly;
    use crate::entities::component::{Component, ComponentCategory, QualityTier};
    use tempfile::tempdir;

    fn priced(name: &str, cost: f64, hours: Option<f64>) -> Component {
        let mut c = Component::new(name, ComponentCategory::Power, "alice");
        c.labor_hours = hours;
        c.add_tier(QualityTier::new("Standard", cost, None).unwrap())
            .unwrap();
        c
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        rdr.records()
            .map(|r| r.unwrap().iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_flat_estimate_sheets() {
        let pdu = priced("PDU, 3-phase", 100.0, Some(1.0));
        let mut builder = EstimateBuilder::new("Hall A")
            .labor_rate(Some(85.0))
            .unwrap();
        let line_id = builder.add_component(&pdu, None).unwrap().id.clone();
        builder.update_quantity(&line_id, 3.0).unwrap();
        let estimate = builder.build("alice").unwrap();

        let tmp = tempdir().unwrap();
        let files = write_sheets(&estimate, tmp.path()).unwrap();
        assert_eq!(files.len(), 4);

        let summary = read_rows(&tmp.path().join(SUMMARY_SHEET));
        assert!(summary.contains(&vec!["total_cost".to_string(), "555.00".to_string()]));
        assert!(summary.contains(&vec!["shape".to_string(), "flat".to_string()]));

        let components = read_rows(&tmp.path().join(COMPONENTS_SHEET));
        assert_eq!(components.len(), 2);
        // Name with a comma survives quoting
        assert_eq!(components[1][3], "PDU, 3-phase");
        assert_eq!(components[1][13], "555.00");

        let assemblies = read_rows(&tmp.path().join(ASSEMBLIES_SHEET));
        assert_eq!(assemblies.len(), 1);

        let categories = read_rows(&tmp.path().join(CATEGORIES_SHEET));
        assert_eq!(categories[1][0], "power");
        assert_eq!(categories[1][4], "555.00");
    }

    #[test]
    fn test_hierarchical_estimate_sheets() {
        let ups = priced("UPS", 100.0, Some(1.0));
        let mut asm = Assembly::new("Power Train", ComponentCategory::Power, "alice");
        asm.add_member(ups.id.clone(), 3.0);
        let catalog = vec![ups];

        let mut builder = EstimateBuilder::new("Hall B")
            .labor_rate(Some(85.0))
            .unwrap();
        builder.add_assembly(&asm, 2, &catalog).unwrap();
        let estimate = builder.build("alice").unwrap();

        let tmp = tempdir().unwrap();
        write_sheets(&estimate, &tmp.path().join("out")).unwrap();

        let assemblies = read_rows(&tmp.path().join("out").join(ASSEMBLIES_SHEET));
        assert_eq!(assemblies.len(), 2);
        assert_eq!(assemblies[1][4], "2");
        assert_eq!(assemblies[1][5], "300.00");
        assert_eq!(assemblies[1][6], "255.00");
        assert_eq!(assemblies[1][8], "1110.00");

        let components = read_rows(&tmp.path().join("out").join(COMPONENTS_SHEET));
        assert_eq!(components.len(), 2);
        assert_eq!(components[1][0], assemblies[1][0]);
    }
}
