//! Integration tests for the `mirror-sync` binary.
//!
//! These tests run the compiled binary with assert_cmd and check its output
//! and exit codes. Configuration files are written with assert_fs.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const VALID: &str = r#"
[identity]
name = "Mirror Sync"
email = "mirror-sync@example.com"

[[job]]
name = "docs"
origin = "git@github.com:team/docs.git"
mirror = "git@gitlab.com:team/docs.git"
workspace = "/tmp/mirror-sync-cli-test/docs"
origin_accept = ["main$", "release/"]
mirror_accept = ["main$"]

[[job]]
name = "site"
origin = "git@github.com:team/site.git"
mirror = "git@gitlab.com:team/site.git"
workspace = "/tmp/mirror-sync-cli-test/site"
direction = "origin-to-mirror"
origin_accept = ["main$"]
"#;

fn mirror_sync() -> Command {
    let mut cmd = Command::cargo_bin("mirror-sync").unwrap();
    cmd.env_remove("MIRROR_SYNC_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    mirror_sync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn run_help_documents_exit_codes() {
    mirror_sync()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXIT CODES"))
        .stdout(predicate::str::contains("-101"));
}

#[test]
fn config_check_lists_jobs() {
    let dir = TempDir::new().unwrap();
    let config = dir.child("config.toml");
    config.write_str(VALID).unwrap();

    mirror_sync()
        .arg("--config")
        .arg(config.path())
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docs: git@github.com:team/docs.git"))
        .stdout(predicate::str::contains("(origin-to-mirror)"));
}

#[test]
fn config_path_honors_environment() {
    let dir = TempDir::new().unwrap();
    let config = dir.child("from-env.toml");
    config.write_str(VALID).unwrap();

    mirror_sync()
        .env("MIRROR_SYNC_CONFIG", config.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env.toml"));
}

#[cfg(unix)]
#[test]
fn invalid_config_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let config = dir.child("config.toml");
    config
        .write_str(
            r#"
[[job]]
name = "docs"
origin = "a"
mirror = "b"
workspace = "/tmp/ws"
origin_accept = ["(unclosed"]
"#,
        )
        .unwrap();

    mirror_sync()
        .arg("--config")
        .arg(config.path())
        .arg("run")
        .assert()
        // A negative exit status reaches the parent modulo 256.
        .code(-18i32 & 0xff)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn unknown_job_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.child("config.toml");
    config.write_str(VALID).unwrap();

    mirror_sync()
        .arg("--config")
        .arg(config.path())
        .args(["plan", "--job", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no job named 'nope'"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();

    mirror_sync()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn completion_generates_script() {
    mirror_sync()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mirror-sync"));
}
