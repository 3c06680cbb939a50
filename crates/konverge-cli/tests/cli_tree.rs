use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PROJECT: &str = r#"
[toolchain]
canonical = "17"

[[module]]
name = ":app"
modules = [":feature:login"]

[[module]]
name = ":feature:login"
modules = [":core"]

[[module]]
name = ":core"
[module.dependencies]
"org.example:libX" = "[1.0,2.0)"
"#;

fn konverge_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("konverge").unwrap();
    cmd.env("KONVERGE_HOME", home.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_tree_prints_modules() {
    let home = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Konverge.toml"), PROJECT).unwrap();

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["tree"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(":app (toolchain 17)"))
        .stdout(predicate::str::contains("    └── :core (toolchain 17)"));
}

#[test]
fn test_tree_why() {
    let home = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Konverge.toml"), PROJECT).unwrap();

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["tree", "--why", ":core"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Path to :core:\n:app\n  :feature:login\n    :core\n",
        ));
}

#[test]
fn test_tree_with_manifest_path() {
    let home = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("config");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("Konverge.toml"), PROJECT).unwrap();

    konverge_cmd(&home)
        .current_dir(tmp.path())
        .args(["tree", "--manifest-path", "config/Konverge.toml", "-d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[org.example:libX:1.0]"));
}
