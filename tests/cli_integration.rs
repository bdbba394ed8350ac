//! Integration tests for the Guardian CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.  The
//! master key comes from `GUARDIAN_MASTER_KEY` or `--no-prompt` stdin so
//! nothing ever waits on a terminal.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Helper: a Command pointing at the guardian binary, isolated from the
/// user's config and vault, with cheap Argon2 settings.
fn guardian(tmp: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("guardian").expect("binary should exist");
    cmd.env("HOME", tmp.path())
        .env("GUARDIAN_CONFIG", tmp.path().join("no-such-config.toml"))
        .env_remove("GUARDIAN_MASTER_KEY")
        .env_remove("GUARDIAN_NEW_MASTER_KEY")
        .env_remove("GUARDIAN_SECRETS")
        .args([
            "--argon-time",
            "1",
            "--argon-memory",
            "1024",
            "--argon-threads",
            "1",
            "--salt-size",
            "16",
        ]);
    cmd
}

fn with_key(tmp: &TempDir, key: &str) -> Command {
    let mut cmd = guardian(tmp);
    cmd.env("GUARDIAN_MASTER_KEY", key);
    cmd
}

#[test]
fn help_flag_shows_usage() {
    let tmp = TempDir::new().unwrap();
    guardian(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted secret vault"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("del"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("mount"))
        .stdout(predicate::str::contains("password"))
        .stdout(predicate::str::contains("rotate-key"));
}

#[test]
fn version_flag_shows_version() {
    let tmp = TempDir::new().unwrap();
    guardian(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("guardian"));
}

#[test]
fn no_args_shows_usage() {
    let tmp = TempDir::new().unwrap();
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("guardian").unwrap();
    cmd.env("HOME", tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn init_set_get_list_del_flow() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("vault.json");
    let vault_arg = vault.path().to_str().unwrap();

    with_key(&tmp, "master")
        .args(["--secrets", vault_arg, "init"])
        .assert()
        .success();
    vault.assert(predicate::path::is_file());

    with_key(&tmp, "master")
        .args(["--secrets", vault_arg, "set", "github.com", "alice:s3cr3t"])
        .assert()
        .success();

    with_key(&tmp, "master")
        .args(["--secrets", vault_arg, "set", "aws"])
        .write_stdin("AKIA-piped\n")
        .assert()
        .success();

    with_key(&tmp, "master")
        .args(["--secrets", vault_arg, "get", "github.com"])
        .assert()
        .success()
        .stdout("alice:s3cr3t\n");

    with_key(&tmp, "master")
        .args(["--secrets", vault_arg, "get", "aws"])
        .assert()
        .success()
        .stdout("AKIA-piped\n");

    with_key(&tmp, "master")
        .args(["--secrets", vault_arg, "list", "--plain"])
        .assert()
        .success()
        .stdout("aws\ngithub.com\n");

    with_key(&tmp, "master")
        .args(["--secrets", vault_arg, "del", "aws"])
        .assert()
        .success();

    with_key(&tmp, "master")
        .args(["--secrets", vault_arg, "get", "aws"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("aws"));
}

#[test]
fn wrong_key_gives_generic_failure() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("vault.json");
    let vault_arg = vault.path().to_str().unwrap();

    with_key(&tmp, "right")
        .args(["--secrets", vault_arg, "set", "id", "value"])
        .assert()
        .success();

    with_key(&tmp, "wrong")
        .args(["--secrets", vault_arg, "get", "id"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to decrypt"))
        .stdout(predicate::str::contains("value").not());
}

#[test]
fn init_refuses_existing_vault_without_force() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("vault.json");
    let vault_arg = vault.path().to_str().unwrap();

    with_key(&tmp, "k")
        .args(["--secrets", vault_arg, "set", "id", "value"])
        .assert()
        .success();

    with_key(&tmp, "k")
        .args(["--secrets", vault_arg, "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    with_key(&tmp, "k")
        .args(["--secrets", vault_arg, "init", "--force"])
        .assert()
        .success();

    with_key(&tmp, "k")
        .args(["--secrets", vault_arg, "list", "--plain"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn no_prompt_reads_key_from_stdin() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("vault.json");
    let vault_arg = vault.path().to_str().unwrap();

    guardian(&tmp)
        .args(["--secrets", vault_arg, "--no-prompt", "set", "id"])
        .write_stdin("stdin-key\npiped value\n")
        .assert()
        .success();

    with_key(&tmp, "stdin-key")
        .args(["--secrets", vault_arg, "get", "id"])
        .assert()
        .success()
        .stdout("piped value\n");
}

#[test]
fn rotate_key_reencrypts_under_new_key() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("vault.json");
    let vault_arg = vault.path().to_str().unwrap();

    with_key(&tmp, "old")
        .args(["--secrets", vault_arg, "set", "id", "value"])
        .assert()
        .success();

    with_key(&tmp, "old")
        .env("GUARDIAN_NEW_MASTER_KEY", "new")
        .args(["--secrets", vault_arg, "rotate-key"])
        .assert()
        .success();

    with_key(&tmp, "old")
        .args(["--secrets", vault_arg, "get", "id"])
        .assert()
        .failure();

    with_key(&tmp, "new")
        .args(["--secrets", vault_arg, "get", "id"])
        .assert()
        .success()
        .stdout("value\n");
}

#[test]
fn keyfile_is_required_once_used() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("vault.json");
    let keyfile = tmp.child("guardian.key");
    let vault_arg = vault.path().to_str().unwrap();
    let keyfile_arg = keyfile.path().to_str().unwrap();

    guardian(&tmp)
        .args(["keyfile", keyfile_arg])
        .assert()
        .success();
    keyfile.assert(predicate::path::is_file());

    with_key(&tmp, "k")
        .args(["--secrets", vault_arg, "--keyfile", keyfile_arg])
        .args(["set", "id", "value"])
        .assert()
        .success();

    with_key(&tmp, "k")
        .args(["--secrets", vault_arg, "get", "id"])
        .assert()
        .failure();

    with_key(&tmp, "k")
        .args(["--secrets", vault_arg, "--keyfile", keyfile_arg])
        .args(["get", "id"])
        .assert()
        .success()
        .stdout("value\n");
}

#[test]
fn config_file_supplies_vault_path() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("from-config.json");
    let config = tmp.child("guardian.toml");
    config
        .write_str(&format!(
            "secrets = {:?}\nargon_time = 1\nargon_memory_kib = 1024\nargon_threads = 1\n",
            vault.path().to_str().unwrap()
        ))
        .unwrap();

    with_key(&tmp, "k")
        .env("GUARDIAN_CONFIG", config.path())
        .args(["set", "id", "value"])
        .assert()
        .success();

    vault.assert(predicate::path::is_file());
}

#[test]
fn password_prints_requested_length() {
    let tmp = TempDir::new().unwrap();
    guardian(&tmp)
        .args(["password", "--length", "24"])
        .assert()
        .success()
        .stdout(predicate::function(|out: &str| out.trim_end_matches('\n').len() == 24));

    guardian(&tmp)
        .args(["password", "--hex", "--length", "8"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{16}\n$").unwrap());
}

#[test]
fn completions_for_bash() {
    let tmp = TempDir::new().unwrap();
    guardian(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("guardian"));
}

#[test]
fn mount_requires_existing_directory() {
    let tmp = TempDir::new().unwrap();
    with_key(&tmp, "k")
        .args(["mount", tmp.path().join("missing").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}
