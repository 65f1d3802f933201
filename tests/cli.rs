//! Command-line behavior of the binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("build-pyoptsparse").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("CONDA_PREFIX")
        .env_remove("VIRTUAL_ENV")
        .env_remove("PYOPTSPARSE_PREFIX")
        .env_remove("PYOPTSPARSE_JOBS");
    cmd
}

#[test]
fn test_help_lists_flags() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--linear-solver"))
        .stdout(predicate::str::contains("--hsl-tar-file"))
        .stdout(predicate::str::contains("--no-ipopt"))
        .stdout(predicate::str::contains("--uninstall"));
}

#[test]
fn test_hsl_without_archive_exits_2() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("prefix");
    cmd(&dir)
        .args(["-l", "hsl", "-p"])
        .arg(&prefix)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--hsl-tar-file"));
    assert!(!prefix.exists());
}

#[test]
fn test_unknown_linear_solver_is_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["-l", "superlu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("superlu"));
}

#[test]
fn test_uninstall_of_empty_prefix_succeeds() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("nothing-here");
    cmd(&dir)
        .arg("-u")
        .arg("-p")
        .arg(&prefix)
        .assert()
        .success();
    assert!(!prefix.exists());
}

#[test]
fn test_prefix_from_environment() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("from-env");
    cmd(&dir)
        .env("PYOPTSPARSE_PREFIX", &prefix)
        .args(["-u"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env"));
}
