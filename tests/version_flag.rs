use std::process::Command;

#[test]
fn prints_version() {
    let exe = env!("CARGO_BIN_EXE_repost-check");
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .expect("run repost-check --version");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "stdout was: {}",
        stdout.trim()
    );
}

#[test]
fn prints_help() {
    let exe = env!("CARGO_BIN_EXE_repost-check");
    let output = Command::new(exe)
        .arg("--help")
        .output()
        .expect("run repost-check --help");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(stdout.contains("repost-check"));
    assert!(stdout.contains("--subreddit"));
    assert!(stdout.contains("--version"));
}

#[test]
fn unknown_flag_exits_with_usage_error() {
    let exe = env!("CARGO_BIN_EXE_repost-check");
    let output = Command::new(exe)
        .arg("--frobnicate")
        .output()
        .expect("run repost-check --frobnicate");
    assert_eq!(output.status.code(), Some(2));
}
