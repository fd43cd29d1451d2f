use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn repost_check(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("repost-check").expect("binary");
    cmd.env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("HOME", dir.path().join("home"));
    cmd
}

fn assert_saved_to_explicit_file(args: &[&str], dir: &tempfile::TempDir) {
    let explicit = dir.path().join("explicit.yaml");
    repost_check(dir)
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains(explicit.display().to_string()));

    let saved = fs::read_to_string(&explicit).expect("explicit config written");
    assert!(saved.contains("http://10.1.1.1:5000"), "saved: {saved}");
    assert!(!dir.path().join("xdg").join("repost-check").exists());
}

#[test]
fn set_api_url_honours_config_given_after_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let explicit = dir.path().join("explicit.yaml");
    let explicit = explicit.to_str().expect("utf8 path");
    assert_saved_to_explicit_file(
        &["--set-api-url", "http://10.1.1.1:5000", "--config", explicit],
        &dir,
    );
}

#[test]
fn set_api_url_honours_config_given_before_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let explicit = dir.path().join("explicit.yaml");
    let explicit = explicit.to_str().expect("utf8 path");
    assert_saved_to_explicit_file(
        &["--config", explicit, "--set-api-url", "http://10.1.1.1:5000"],
        &dir,
    );
}

#[test]
fn set_api_url_rejects_non_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let explicit = dir.path().join("explicit.yaml");
    repost_check(&dir)
        .arg("--config")
        .arg(&explicit)
        .args(["--set-api-url", "not a url"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not a URL"));
    assert!(!explicit.exists());
}
