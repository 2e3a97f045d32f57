//! Integration tests for the DCE CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a dce command
fn dce() -> Command {
    Command::cargo_bin("dce").unwrap()
}

/// Helper to create a workspace in a temp directory
fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    dce().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Helper to create a workspace with an active session
fn setup_logged_in(user: &str) -> TempDir {
    let tmp = setup_workspace();
    dce()
        .current_dir(tmp.path())
        .args(["login", user])
        .assert()
        .success();
    tmp
}

/// Run a command with `-f id` and return the single id it prints
fn run_for_id(tmp: &TempDir, args: &[&str]) -> String {
    let output = dce()
        .current_dir(tmp.path())
        .args(args)
        .args(["-f", "id"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// UPS module at $100 with one labor hour per unit
fn create_ups(tmp: &TempDir) -> String {
    run_for_id(
        tmp,
        &[
            "cmp",
            "new",
            "UPS Module",
            "--category",
            "power",
            "--tier",
            "Standard=100",
            "--labor-hours",
            "1",
        ],
    )
}

fn create_estimate(tmp: &TempDir, name: &str) -> String {
    run_for_id(tmp, &["est", "new", name, "--labor-rate", "85"])
}

fn estimate_json(tmp: &TempDir, id: &str) -> serde_json::Value {
    let output = dce()
        .current_dir(tmp.path())
        .args(["est", "show", id, "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_help_displays() {
    dce()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("construction cost estimates"))
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_displays() {
    dce()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dce"));
}

#[test]
fn test_unknown_command_fails() {
    dce()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ============================================================================
// Init and Session Tests
// ============================================================================

#[test]
fn test_init_creates_workspace_structure() {
    let tmp = TempDir::new().unwrap();

    dce()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized DCE workspace"));

    assert!(tmp.path().join(".dce").is_dir());
    assert!(tmp.path().join("catalog/components").is_dir());
    assert!(tmp.path().join("catalog/assemblies").is_dir());
    assert!(tmp.path().join("estimates").is_dir());
    assert!(tmp.path().join("projects").is_dir());
    assert!(tmp.path().join("costs/actuals").is_dir());
}

#[test]
fn test_init_warns_if_workspace_exists() {
    let tmp = setup_workspace();

    dce()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_not_in_workspace_fails() {
    let tmp = TempDir::new().unwrap();

    dce()
        .current_dir(tmp.path())
        .args(["est", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_whoami_without_session_fails() {
    let tmp = setup_workspace();

    dce()
        .current_dir(tmp.path())
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("log in"));
}

#[test]
fn test_login_then_whoami() {
    let tmp = setup_logged_in("alice");

    dce()
        .current_dir(tmp.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"));
}

#[test]
fn test_logout_ends_session() {
    let tmp = setup_logged_in("alice");

    dce()
        .current_dir(tmp.path())
        .arg("logout")
        .assert()
        .success();

    dce()
        .current_dir(tmp.path())
        .args(["cmp", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("log in"));
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_cmp_new_creates_file() {
    let tmp = setup_logged_in("alice");
    let id = create_ups(&tmp);

    assert!(id.starts_with("CMP-"));
    let path = tmp
        .path()
        .join("catalog/components")
        .join(format!("{}.dce.yaml", id));
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("UPS Module"));
    assert!(content.contains("owner: alice"));
}

#[test]
fn test_cmp_new_rejects_bad_tier() {
    let tmp = setup_logged_in("alice");

    dce()
        .current_dir(tmp.path())
        .args(["cmp", "new", "Busway", "--tier", "Standard"])
        .assert()
        .failure();
}

#[test]
fn test_cmp_list_shows_components() {
    let tmp = setup_logged_in("alice");
    create_ups(&tmp);

    dce()
        .current_dir(tmp.path())
        .args(["cmp", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UPS Module"));
}

#[test]
fn test_cmp_list_is_scoped_to_owner() {
    let tmp = setup_logged_in("alice");
    create_ups(&tmp);

    dce()
        .current_dir(tmp.path())
        .args(["login", "bob"])
        .assert()
        .success();

    dce()
        .current_dir(tmp.path())
        .args(["cmp", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UPS Module").not());
}

#[test]
fn test_cmp_show_by_prefix() {
    let tmp = setup_logged_in("alice");
    let id = create_ups(&tmp);

    dce()
        .current_dir(tmp.path())
        .args(["cmp", "show", &id[..12]])
        .assert()
        .success()
        .stdout(predicate::str::contains("Standard"));
}

// ============================================================================
// Estimate Tests
// ============================================================================

#[test]
fn test_est_flat_line_totals() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let est = create_estimate(&tmp, "Hall A");

    let line = run_for_id(&tmp, &["est", "add-cmp", &est, &cmp]);
    assert!(!line.is_empty());

    dce()
        .current_dir(tmp.path())
        .args(["est", "set-qty", &est, &line, "3"])
        .assert()
        .success();

    // 3 × $100 material + 3 h × $85 labor
    let json = estimate_json(&tmp, &est);
    assert_eq!(json["total_cost"].as_f64(), Some(555.0));
    assert_eq!(json["total_labor_hours"].as_f64(), Some(3.0));
}

#[test]
fn test_est_set_qty_zero_removes_line() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let est = create_estimate(&tmp, "Hall A");
    let line = run_for_id(&tmp, &["est", "add-cmp", &est, &cmp]);

    dce()
        .current_dir(tmp.path())
        .args(["est", "set-qty", &est, &line, "0"])
        .assert()
        .success();

    let json = estimate_json(&tmp, &est);
    assert_eq!(json["total_cost"].as_f64(), Some(0.0));
}

#[test]
fn test_est_add_cmp_with_quantity() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let est = create_estimate(&tmp, "Hall A");

    dce()
        .current_dir(tmp.path())
        .args(["est", "add-cmp", &est, &cmp, "--qty", "3", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let json = estimate_json(&tmp, &est);
    assert_eq!(json["total_cost"].as_f64(), Some(555.0));
}

#[test]
fn test_est_add_cmp_rejects_bad_quantity() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let est = create_estimate(&tmp, "Hall A");

    for qty in ["0", "NaN", "inf"] {
        dce()
            .current_dir(tmp.path())
            .args(["est", "add-cmp", &est, &cmp, "--qty", qty])
            .assert()
            .failure()
            .stderr(predicate::str::contains("finite number greater than zero"));
    }

    let json = estimate_json(&tmp, &est);
    assert_eq!(json["total_cost"].as_f64(), Some(0.0));
}

#[test]
fn test_est_set_qty_rejects_nan() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let est = create_estimate(&tmp, "Hall A");
    let line = run_for_id(&tmp, &["est", "add-cmp", &est, &cmp]);

    dce()
        .current_dir(tmp.path())
        .args(["est", "set-qty", &est, &line, "NaN"])
        .assert()
        .failure();

    let json = estimate_json(&tmp, &est);
    assert_eq!(json["total_cost"].as_f64(), Some(185.0));
}

#[test]
fn test_est_assembly_totals() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let asm = run_for_id(&tmp, &["asm", "new", "Power Skid", "--category", "power"]);

    dce()
        .current_dir(tmp.path())
        .args(["asm", "add", &asm, &cmp, "--qty", "3"])
        .assert()
        .success();

    let est = create_estimate(&tmp, "Hall B");
    dce()
        .current_dir(tmp.path())
        .args(["est", "add-asm", &est, &asm, "--qty", "2"])
        .assert()
        .success();

    // 2 skids × 3 modules × ($100 + 1 h × $85)
    let json = estimate_json(&tmp, &est);
    assert_eq!(json["total_cost"].as_f64(), Some(1110.0));
}

#[test]
fn test_est_rejects_mixed_shapes() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let asm = run_for_id(&tmp, &["asm", "new", "Power Skid"]);
    dce()
        .current_dir(tmp.path())
        .args(["asm", "add", &asm, &cmp])
        .assert()
        .success();

    let est = create_estimate(&tmp, "Hall C");
    dce()
        .current_dir(tmp.path())
        .args(["est", "add-cmp", &est, &cmp])
        .assert()
        .success();

    dce()
        .current_dir(tmp.path())
        .args(["est", "add-asm", &est, &asm])
        .assert()
        .failure();
}

#[test]
fn test_est_export_writes_sheets() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let est = create_estimate(&tmp, "Hall A");
    run_for_id(&tmp, &["est", "add-cmp", &est, &cmp]);

    let out = tmp.path().join("export");
    dce()
        .current_dir(tmp.path())
        .args(["est", "export", &est, "--out"])
        .arg(&out)
        .assert()
        .success();

    for sheet in ["summary.csv", "categories.csv", "components.csv", "assemblies.csv"] {
        assert!(out.join(sheet).is_file(), "missing {}", sheet);
    }
    let components = fs::read_to_string(out.join("components.csv")).unwrap();
    assert!(components.contains("UPS Module"));
    assert!(components.contains("185.00"));
}

#[test]
fn test_est_show_not_found() {
    let tmp = setup_logged_in("alice");

    dce()
        .current_dir(tmp.path())
        .args(["est", "show", "EST-NOPE"])
        .assert()
        .failure();
}

// ============================================================================
// Project, Cost and Variance Tests
// ============================================================================

#[test]
fn test_cost_add_future_date_fails() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let proj = run_for_id(&tmp, &["proj", "new", "Phoenix DC1", "--budget", "1000000"]);

    dce()
        .current_dir(tmp.path())
        .args([
            "cost",
            "add",
            &proj,
            &cmp,
            "--qty",
            "1",
            "--unit-cost",
            "100",
            "--date",
            "2999-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("in the future"));
}

#[test]
fn test_variance_flags_critical_line() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let proj = run_for_id(&tmp, &["proj", "new", "Phoenix DC1"]);
    let est = run_for_id(
        &tmp,
        &["est", "new", "Hall A", "--labor-rate", "85", "--project", &proj],
    );
    run_for_id(&tmp, &["est", "add-cmp", &est, &cmp]);

    // Estimated $185, actual $300
    dce()
        .current_dir(tmp.path())
        .args([
            "cost",
            "add",
            &proj,
            &cmp,
            "--qty",
            "1",
            "--unit-cost",
            "300",
            "--date",
            "2024-01-15",
        ])
        .assert()
        .success();

    dce()
        .current_dir(tmp.path())
        .args(["variance", &est])
        .assert()
        .success()
        .stdout(predicate::str::contains("CRITICAL"));
}

#[test]
fn test_chg_approve_twice_fails() {
    let tmp = setup_logged_in("alice");
    let proj = run_for_id(&tmp, &["proj", "new", "Phoenix DC1"]);
    let chg = run_for_id(
        &tmp,
        &["chg", "new", &proj, "Generator upsize", "--amount", "25000"],
    );

    dce()
        .current_dir(tmp.path())
        .args(["chg", "approve", &chg])
        .assert()
        .success();

    dce()
        .current_dir(tmp.path())
        .args(["chg", "approve", &chg])
        .assert()
        .failure();
}

#[test]
fn test_dashboard_empty_workspace() {
    let tmp = setup_logged_in("alice");

    dce()
        .current_dir(tmp.path())
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("Estimates"));
}

// ============================================================================
// Validation and Security Tests
// ============================================================================

#[test]
fn test_validate_empty_workspace() {
    let tmp = setup_workspace();

    dce()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("All files passed"));
}

#[test]
fn test_validate_records_pass() {
    let tmp = setup_logged_in("alice");
    let cmp = create_ups(&tmp);
    let est = create_estimate(&tmp, "Hall A");
    run_for_id(&tmp, &["est", "add-cmp", &est, &cmp]);

    dce()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .success();
}

#[test]
fn test_validate_invalid_yaml_syntax() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("catalog/components/CMP-01HQ5V2KRMJ0B9XYZ1234ABCD.dce.yaml"),
        "id: [unclosed\nname: broken\n",
    )
    .unwrap();

    dce()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .failure();
}

#[test]
fn test_security_log_records_login() {
    let tmp = setup_logged_in("alice");

    dce()
        .current_dir(tmp.path())
        .args(["security", "log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("alice"));
}

#[test]
fn test_security_log_records_failures() {
    let tmp = setup_logged_in("alice");

    dce()
        .current_dir(tmp.path())
        .args(["est", "show", "EST-NOPE"])
        .assert()
        .failure();

    dce()
        .current_dir(tmp.path())
        .args(["security", "log", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"error\""));
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn test_completions_bash() {
    dce()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dce"));
}
