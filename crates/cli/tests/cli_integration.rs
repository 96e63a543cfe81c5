//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `attrmig` binary and verify exit codes,
//! stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative
//! paths to `fixtures/` resolve correctly. Outputs go to a `TempDir`.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `attrmig` binary, rooted at workspace.
fn attrmig() -> Command {
    let mut cmd = cargo_bin_cmd!("attrmig");
    cmd.current_dir(workspace_root());
    cmd
}

fn path_str(p: &Path) -> &str {
    p.to_str().expect("utf-8 temp path")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    attrmig()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Attribute migration between simulation schemas",
        ));
}

#[test]
fn version_exits_0() {
    attrmig()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("attrmig"));
}

#[test]
fn migrate_without_arguments_is_a_usage_error() {
    attrmig()
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ATTRIBUTE_FILE"));
}

// ──────────────────────────────────────────────
// 2. Migrate subcommand
// ──────────────────────────────────────────────

#[test]
fn migrate_writes_output_and_prints_log() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out.json");
    attrmig()
        .args([
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&out),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "WARNING: skipped 2 attribute(s) of type 'Obsolete'",
        ))
        .stdout(predicate::str::contains("INFO: Migrated 3 of 5 attributes"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let attrs = written["attributes"].as_array().unwrap();
    let att1 = attrs.iter().find(|a| a["name"] == "att1").unwrap();
    assert_eq!(att1["id"], 5);
    assert_eq!(att1["type"], "Material");
    assert_eq!(att1["items"][0]["values"][0], 0.001002);
    assert_eq!(att1["items"][1]["values"][0]["discrete"], 2);
    let inlet = attrs.iter().find(|a| a["name"] == "inlet").unwrap();
    assert_eq!(inlet["items"][0]["values"][0]["expression"], "f1");
    assert!(attrs.iter().all(|a| a["type"] != "Obsolete"));
    assert!(written["next_id"].as_u64().unwrap() > 5);
}

#[test]
fn migrate_with_log_file_prints_only_the_summary() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out.json");
    let log = tmp.path().join("migration.log");
    attrmig()
        .args([
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&out),
            path_str(&log),
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("Migrated 3 of 5 attributes\n"));

    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("INFO: migrated attribute 'f1'"));
    assert!(text.ends_with("INFO: Migrated 3 of 5 attributes\n"));
}

#[test]
fn migrate_json_output_reports_counts() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out.json");
    let assert = attrmig()
        .args([
            "--output",
            "json",
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&out),
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["migrated"], 3);
    assert_eq!(json["total"], 5);
    assert_eq!(json["skipped"], 2);
    assert_eq!(json["skipped_types"][0]["type"], "Obsolete");
    assert_eq!(json["summary"], "Migrated 3 of 5 attributes");
}

#[test]
fn migrate_is_idempotent_on_its_own_output() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("first.json");
    let second = tmp.path().join("second.json");
    attrmig()
        .args([
            "--quiet",
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&first),
        ])
        .assert()
        .success();
    attrmig()
        .args([
            "--quiet",
            "migrate",
            "fixtures/source.json",
            path_str(&first),
            path_str(&second),
        ])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        fs::read_to_string(&second).unwrap()
    );
}

#[test]
fn missing_attribute_file_still_copies_the_template() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out.json");
    attrmig()
        .args([
            "migrate",
            "fixtures/does-not-exist.json",
            "fixtures/template.json",
            path_str(&out),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("WARNING: no attributes loaded"))
        .stdout(predicate::str::contains("Migrated 0 of 0 attributes"));
    assert!(out.exists());
}

#[test]
fn migrate_accepts_a_config_file() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out.json");
    attrmig()
        .args([
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&out),
            "--config",
            "fixtures/reject-discrete.toml",
        ])
        .assert()
        .success();
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let att1 = written["attributes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "att1")
        .unwrap()
        .clone();
    // copy_associations = false
    assert!(att1.get("associations").is_none());
}

#[test]
fn rust_log_enables_stage_events() {
    for filter in ["info", "attrmig_migrate=info"] {
        let tmp = TempDir::new().unwrap();
        attrmig()
            .env("RUST_LOG", filter)
            .args([
                "--quiet",
                "migrate",
                "fixtures/source.json",
                "fixtures/template.json",
                path_str(&tmp.path().join("out.json")),
            ])
            .assert()
            .success()
            .stderr(predicate::str::contains("stage=load source"));
    }
}

#[test]
fn stage_events_are_hidden_by_default() {
    let tmp = TempDir::new().unwrap();
    attrmig()
        .env_remove("RUST_LOG")
        .args([
            "--quiet",
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&tmp.path().join("out.json")),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("stage=").not());
}

// ──────────────────────────────────────────────
// 3. Exit codes
// ──────────────────────────────────────────────

#[cfg(unix)]
#[test]
fn broken_config_exits_minus_1() {
    let tmp = TempDir::new().unwrap();
    attrmig()
        .args([
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&tmp.path().join("out.json")),
            "--config",
            "fixtures/broken.toml",
        ])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("invalid config"));
}

#[cfg(unix)]
#[test]
fn unreadable_template_exits_minus_2() {
    let tmp = TempDir::new().unwrap();
    attrmig()
        .args([
            "migrate",
            "fixtures/source.json",
            "fixtures/no-template.json",
            path_str(&tmp.path().join("out.json")),
        ])
        .assert()
        .code(254)
        .stderr(predicate::str::contains("could not load template"));
}

#[cfg(unix)]
#[test]
fn unwritable_output_exits_minus_3() {
    let tmp = TempDir::new().unwrap();
    attrmig()
        .args([
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&tmp.path().join("missing/dir/out.json")),
        ])
        .assert()
        .code(253)
        .stderr(predicate::str::contains("could not write output"));
}

#[cfg(unix)]
#[test]
fn unwritable_log_exits_minus_4() {
    let tmp = TempDir::new().unwrap();
    attrmig()
        .args([
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&tmp.path().join("out.json")),
            path_str(&tmp.path().join("missing/dir/migration.log")),
        ])
        .assert()
        .code(252)
        .stderr(predicate::str::contains("could not write log"));
}

#[cfg(unix)]
#[test]
fn json_errors_are_reported_as_objects() {
    let tmp = TempDir::new().unwrap();
    attrmig()
        .args([
            "--output",
            "json",
            "migrate",
            "fixtures/source.json",
            "fixtures/no-template.json",
            path_str(&tmp.path().join("out.json")),
        ])
        .assert()
        .code(254)
        .stderr(predicate::str::starts_with("{\"error\":"));
}

// ──────────────────────────────────────────────
// 4. Definitions subcommand
// ──────────────────────────────────────────────

#[test]
fn definitions_lists_types_and_items() {
    attrmig()
        .args(["definitions", "fixtures/template.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SimExpression (abstract)"))
        .stdout(predicate::str::contains("PolyLinearFunction : SimExpression"))
        .stdout(predicate::str::contains(
            "units (string) {Minutes, Hours, Seconds}",
        ));
}

#[test]
fn definitions_can_be_limited_to_a_subtree() {
    let assert = attrmig()
        .args([
            "--output",
            "json",
            "definitions",
            "fixtures/source.json",
            "--type",
            "SimExpression",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let types: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["SimExpression", "PolyLinearFunction"]);
    assert_eq!(json[1]["attributes"], 1);
}

#[test]
fn definitions_of_unknown_type_fails() {
    attrmig()
        .args(["definitions", "fixtures/template.json", "--type", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown type 'Nope'"));
}

// ──────────────────────────────────────────────
// 5. Validate subcommand
// ──────────────────────────────────────────────

#[test]
fn validate_accepts_fixtures() {
    for file in ["fixtures/source.json", "fixtures/template.json"] {
        attrmig()
            .args(["validate", file])
            .assert()
            .success()
            .stdout(predicate::str::contains("valid"));
    }
}

#[test]
fn validate_accepts_migration_output() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out.json");
    attrmig()
        .args([
            "--quiet",
            "migrate",
            "fixtures/source.json",
            "fixtures/template.json",
            path_str(&out),
        ])
        .assert()
        .success();
    attrmig()
        .args(["validate", path_str(&out)])
        .assert()
        .success();
}

#[test]
fn validate_rejects_unknown_item_kind() {
    attrmig()
        .args(["validate", "fixtures/not-a-resource.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn validate_json_lists_errors() {
    attrmig()
        .args([
            "--output",
            "json",
            "validate",
            "fixtures/not-a-resource.json",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"valid\": false"));
}
