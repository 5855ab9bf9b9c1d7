use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help_lists_commands() {
    let mut cmd = Command::cargo_bin("cli").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("client"));
}

#[test]
fn test_cli_client_help_lists_kinds() {
    let mut cmd = Command::cargo_bin("cli").unwrap();
    cmd.args(["client", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tags"))
        .stdout(predicate::str::contains("groups"));
}

#[test]
fn test_cli_missing_subcommand() {
    let mut cmd = Command::cargo_bin("cli").unwrap();
    cmd.assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_rejects_non_numeric_id() {
    let mut cmd = Command::cargo_bin("cli").unwrap();
    cmd.args(["client", "tags", "get", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_cli_update_root_conflicts_with_parent() {
    let mut cmd = Command::cargo_bin("cli").unwrap();
    cmd.args(["client", "tags", "update", "1", "--root", "--parent-id", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_cli_reports_unreachable_server() {
    let mut cmd = Command::cargo_bin("cli").unwrap();
    cmd.args(["client", "--url", "http://127.0.0.1:9", "tags", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network error"));
}
