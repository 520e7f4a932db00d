#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// `upwatch` pointed at a temp daemon home. Callbacks go to a closed port and
/// height checks are skipped so nothing leaves the machine.
fn upwatch(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("upwatch").unwrap();
    cmd.env_clear()
        .env("DAEMON_HOME", home.path())
        .env("DAEMON_NAME", "appd")
        .env("DAEMON_POLL_INTERVAL", "20ms")
        .env("UPWATCH_SKIP_HEIGHT_CHECK", "true")
        .env("CALLBACK_API", "http://127.0.0.1:1")
        .env("NODE_ID", "node")
        .env("DEPLOYMENT_ID", "dep")
        .timeout(Duration::from_secs(30));
    cmd
}

fn daemon_home() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    dir
}

fn write_plan(home: &TempDir, body: &str) -> PathBuf {
    let path = home.path().join("data/upgrade-info.json");
    std::fs::write(&path, body).unwrap();
    path
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

#[test]
fn help_lists_environment_variables() {
    let home = daemon_home();
    upwatch(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("DAEMON_HOME"))
        .stdout(predicate::str::contains("DAEMON_NAME"))
        .stdout(predicate::str::contains("CALLBACK_API"))
        .stdout(predicate::str::contains(
            "https://docs.cosmos.network/main/tooling/cosmovisor",
        ));
}

// ---------------------------------------------------------------------------
// parse-url
// ---------------------------------------------------------------------------

#[test]
fn parse_url_extracts_repo_and_version() {
    let home = daemon_home();
    upwatch(&home)
        .args([
            "parse-url",
            "https://github.com/org/repo/releases/download/v1.2.3/bin",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("repo:    https://github.com/org/repo"))
        .stdout(predicate::str::contains("version: v1.2.3"));
}

#[test]
fn parse_url_json_without_github() {
    let home = daemon_home();
    let out = upwatch(&home)
        .args(["--json", "parse-url", "https://dl.example.com/v0.9.0/appd"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["repo"], "");
    assert_eq!(v["version"], "v0.9.0");
}

// ---------------------------------------------------------------------------
// show-plan
// ---------------------------------------------------------------------------

#[test]
fn show_plan_recases_name() {
    let home = daemon_home();
    write_plan(&home, r#"{"name":"Upgrade-X","height":42}"#);
    upwatch(&home)
        .arg("show-plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("name:   upgrade-x"))
        .stdout(predicate::str::contains("height: 42"));
}

#[test]
fn show_plan_respects_disable_recase() {
    let home = daemon_home();
    write_plan(&home, r#"{"name":"Upgrade-X","height":42}"#);
    upwatch(&home)
        .env("COSMOVISOR_DISABLE_RECASE", "true")
        .arg("show-plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("name:   Upgrade-X"));
}

#[test]
fn show_plan_file_honours_config_disable_recase() {
    let home = daemon_home();
    let plan = home.path().join("elsewhere.json");
    std::fs::write(&plan, r#"{"name":"Upgrade-X","height":42}"#).unwrap();
    let config = home.path().join("upwatch.yaml");
    std::fs::write(
        &config,
        format!(
            "home: {}\nname: appd\ndisable_recase: true\n",
            home.path().display()
        ),
    )
    .unwrap();

    upwatch(&home)
        .arg("--config")
        .arg(&config)
        .arg("show-plan")
        .arg("--file")
        .arg(&plan)
        .assert()
        .success()
        .stdout(predicate::str::contains("name:   Upgrade-X"));
}

#[test]
fn show_plan_missing_file_fails() {
    let home = daemon_home();
    upwatch(&home)
        .arg("show-plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_without_plan_is_not_ready() {
    let home = daemon_home();
    upwatch(&home)
        .args(["check", "--current", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not ready"));
}

#[test]
fn check_reports_pending_upgrade() {
    let home = daemon_home();
    write_plan(&home, r#"{"name":"v2","height":100,"info":""}"#);
    upwatch(&home)
        .args(["check", "--current", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ready: upgrade 'v2' at height 100"));
}

#[test]
fn check_same_running_upgrade_is_not_ready() {
    let home = daemon_home();
    write_plan(&home, r#"{"name":"V2","height":100}"#);
    let out = upwatch(&home)
        .args(["--json", "check", "--current", "v2"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ready"], false);
    assert_eq!(v["state"]["initialized"], true);
    assert_eq!(v["state"]["current_info"]["name"], "v2");
}

#[test]
fn check_reads_running_upgrade_marker() {
    let home = daemon_home();
    write_plan(&home, r#"{"name":"v2","height":100}"#);
    let marker = home.path().join("cosmovisor/current/upgrade-info.json");
    std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
    std::fs::write(&marker, r#"{"name":"v2","height":100}"#).unwrap();

    upwatch(&home)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("not ready"));
}

#[test]
fn malformed_plan_propagates_when_requested() {
    let home = daemon_home();
    write_plan(&home, "{\"name\":");
    upwatch(&home)
        .args(["--propagate-errors", "check", "--current", "v1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn malformed_plan_aborts_by_default() {
    let home = daemon_home();
    write_plan(&home, "{\"name\":");
    upwatch(&home)
        .args(["check", "--current", "v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse upgrade info file"));
}

#[test]
fn missing_home_is_reported() {
    let home = daemon_home();
    upwatch(&home)
        .env_remove("DAEMON_HOME")
        .args(["check", "--current", "v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DAEMON_HOME"));
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

#[test]
fn watch_exits_once_upgrade_is_pending() {
    let home = daemon_home();
    write_plan(&home, r#"{"name":"v2","height":100,"info":""}"#);
    let out = upwatch(&home)
        .args(["--json", "watch", "--current", "v1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["name"], "v2");
    assert_eq!(v["height"], 100);
}
