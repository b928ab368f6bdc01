//! CLI surface tests via assert_cmd. Only paths that fail before any
//! external call are exercised here; the happy paths need `gh`/`curl` and
//! live behind the mocked backend tests instead.

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::tempdir;

fn cmd() -> Command {
    Command::cargo_bin("pr-screenshots").expect("binary exists")
}

#[test]
fn upload_of_a_missing_file_fails_before_any_external_call() {
    cmd()
        .args(["upload", "/no/such/file.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn update_pr_requires_at_least_one_entry() {
    cmd()
        .args(["update-pr", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--entry"));
}

#[test]
fn entry_flag_requires_both_label_and_url() {
    cmd()
        .args(["update-pr", "42", "--entry", "only-a-label"])
        .assert()
        .failure();
}

#[test]
fn configure_with_no_flags_is_an_error() {
    cmd()
        .arg("configure")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to save"));
}

#[test]
#[serial]
fn configure_writes_credentials_to_the_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");

    cmd()
        .env("PR_SCREENSHOTS_CONFIG", &config_path)
        .args(["configure", "--imgbb-api-key", "abc123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Credentials saved"));

    let saved = std::fs::read_to_string(&config_path).unwrap();
    assert!(saved.contains("abc123"));
}

#[test]
fn help_lists_the_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("upload")
                .and(predicate::str::contains("update-pr"))
                .and(predicate::str::contains("setup"))
                .and(predicate::str::contains("configure")),
        );
}
