use std::process::Command;

use tempfile::tempdir;

fn run_driftql(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_driftql"))
        .args(args)
        .output()
        .unwrap_or_else(|error| panic!("failed to run driftql: {error}"))
}

#[test]
fn help_lists_every_subcommand() {
    let output = run_driftql(&["--help"]);
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["diff", "push", "pull", "lint", "format"] {
        assert!(help.contains(subcommand), "missing `{subcommand}` in help");
    }
}

#[test]
fn unknown_subcommands_are_usage_errors() {
    let output = run_driftql(&["frobnicate"]);
    assert!(!output.status.success());
}

#[test]
fn a_directory_without_schema_dirs_is_a_fatal_error() {
    let dir = tempdir().expect("tempdir");
    let output = run_driftql(&["diff", "--dir", dir.path().to_str().expect("utf8 path")]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no schema directories"));
}

#[test]
fn conflicting_host_and_socket_are_a_config_error() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join(".skeema"), "host=db.example.com\nschema=app\n")
        .expect("write option file");
    let output = run_driftql(&[
        "diff",
        "--dir",
        dir.path().to_str().expect("utf8 path"),
        "--socket",
        "/tmp/mysql.sock",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("conflict"));
}
