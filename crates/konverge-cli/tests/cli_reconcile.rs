use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PROJECT: &str = r#"
[toolchain]
canonical = "17"

[[module]]
name = ":app"
modules = [":core"]
attributes = { namespace = "com.example.app" }
[module.dependencies]
"org.example:libX" = "1.0"

[[module]]
name = ":core"
[module.dependencies]
"org.example:libX" = "1.2"

[[override]]
dependency = "org.example:libX"
version = "1.2"
"#;

fn konverge_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("konverge").unwrap();
    cmd.env("KONVERGE_HOME", home.path()).env_remove("RUST_LOG");
    cmd
}

fn project(manifest: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Konverge.toml"), manifest).unwrap();
    tmp
}

#[test]
fn test_reconcile_writes_output() {
    let home = TempDir::new().unwrap();
    let tmp = project(PROJECT);

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));

    let text = fs::read_to_string(tmp.path().join("Konverge.resolved.toml")).unwrap();
    assert!(text.contains("canonical-toolchain = \"17\""));
    assert!(text.contains("com.example.app"));
}

#[test]
fn test_reconcile_twice_is_fresh_and_identical() {
    let home = TempDir::new().unwrap();
    let tmp = project(PROJECT);
    let output = tmp.path().join("Konverge.resolved.toml");

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile"])
        .assert()
        .success();
    let first = fs::read(&output).unwrap();

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Fresh"));

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile", "--force", "--jobs", "4"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));
    assert_eq!(fs::read(&output).unwrap(), first);
}

#[test]
fn test_reconcile_json_output_path() {
    let home = TempDir::new().unwrap();
    let tmp = project(PROJECT);

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile", "--format", "json", "-o", "build/resolved.json"])
        .assert()
        .success();

    let text = fs::read_to_string(tmp.path().join("build/resolved.json")).unwrap();
    assert!(text.contains("\"input-hash\""));
}

#[test]
fn test_reconcile_conflict_fails_with_report() {
    let home = TempDir::new().unwrap();
    let tmp = project(&PROJECT.replace(
        "[[override]]\ndependency = \"org.example:libX\"\nversion = \"1.2\"\n",
        "",
    ));

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("VersionConflict"))
        .stderr(predicate::str::contains(":app requires 1.0"));

    assert!(!tmp.path().join("Konverge.resolved.toml").exists());
}

#[test]
fn test_reconcile_json_diagnostics() {
    let home = TempDir::new().unwrap();
    let tmp = project(&PROJECT.replace("version = \"1.2\"\n", "version = \"1.2\"\nmodule = \":app\"\n[[override]]\ndependency = \"org.example:libX\"\nversion = \"1.0\"\nmodule = \":app\"\n"));

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile", "--message-format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("\"kind\": \"ConflictingOverrides\""));
}

#[test]
fn test_reconcile_without_manifest_fails() {
    let home = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Konverge.toml"));
}

#[test]
fn test_global_config_sets_format() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("config.toml"),
        "[reconcile]\nformat = \"json\"\n",
    )
    .unwrap();
    let tmp = project(PROJECT);

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["reconcile"])
        .assert()
        .success();

    assert!(tmp.path().join("Konverge.resolved.json").is_file());
}
