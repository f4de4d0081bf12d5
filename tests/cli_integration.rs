//! Integration tests for the Lockbox CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Passwords are supplied through `LOCKBOX_PASSWORD` and
//! `LOCKBOX_NEW_PASSWORD` so nothing prompts, and every test writes a
//! `lockbox.toml` with the minimum KDF cost to keep Argon2id fast.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const PASSWORD: &str = "correct-horse";

/// Helper: get a Command pointing at the lockbox binary.
fn lockbox() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("lockbox").expect("binary should exist");
    cmd.env_remove("LOCKBOX_PASSWORD")
        .env_remove("LOCKBOX_NEW_PASSWORD")
        .env_remove("LOCKBOX_VAULTS_DIR");
    cmd
}

/// Helper: a temp dir with a fast `lockbox.toml` in its vaults dir.
fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child("vaults/lockbox.toml")
        .write_str("kdf_memory_kib = 8192\nkdf_iterations = 1\nkdf_parallelism = 1\n")
        .unwrap();
    tmp
}

/// Helper: a lockbox command run inside `tmp` with the master password set.
fn unlocked(tmp: &TempDir) -> Command {
    let mut cmd = lockbox();
    cmd.current_dir(tmp.path()).env("LOCKBOX_PASSWORD", PASSWORD);
    cmd
}

#[test]
fn help_flag_shows_usage() {
    lockbox()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Local multi-vault encrypted credential store",
        ))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("vaults"))
        .stdout(predicate::str::contains("rename"))
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("passwd"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn version_flag_shows_version() {
    lockbox()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lockbox"));
}

#[test]
fn no_args_shows_help() {
    lockbox()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn create_add_get_roundtrip() {
    let tmp = workspace();

    unlocked(&tmp)
        .args(["create", "P"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created vault 'P'"));

    unlocked(&tmp)
        .args(["add", "P", "Gmail", "-u", "a@b.com", "-p", "x1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1"));

    unlocked(&tmp)
        .args(["list", "P"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gmail"))
        .stdout(predicate::str::contains("a@b.com"))
        .stdout(predicate::str::contains("x1").not());

    unlocked(&tmp)
        .args(["get", "P", "1", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("x1"));
}

#[test]
fn wrong_password_gives_generic_message() {
    let tmp = workspace();
    unlocked(&tmp).args(["create", "P"]).assert().success();

    lockbox()
        .current_dir(tmp.path())
        .env("LOCKBOX_PASSWORD", "not-the-password")
        .args(["list", "P"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Incorrect password or corrupted vault",
        ));
}

#[test]
fn short_master_password_is_refused() {
    let tmp = workspace();
    lockbox()
        .current_dir(tmp.path())
        .env("LOCKBOX_PASSWORD", "short")
        .args(["create", "P"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 characters"));
}

#[test]
fn duplicate_vault_name_fails() {
    let tmp = workspace();
    unlocked(&tmp).args(["create", "Work"]).assert().success();
    unlocked(&tmp)
        .args(["create", "Work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already registered"));
}

#[test]
fn rename_and_list_vaults() {
    let tmp = workspace();
    unlocked(&tmp).args(["create", "Personal"]).assert().success();
    unlocked(&tmp).args(["create", "Work"]).assert().success();

    lockbox()
        .current_dir(tmp.path())
        .args(["rename", "Personal", "Home"])
        .assert()
        .success();

    lockbox()
        .current_dir(tmp.path())
        .arg("vaults")
        .assert()
        .success()
        .stdout(predicate::str::contains("Home"))
        .stdout(predicate::str::contains("Work"))
        .stdout(predicate::str::contains("Personal").not());
}

#[test]
fn passwd_switches_the_master_password() {
    let tmp = workspace();
    unlocked(&tmp).args(["create", "P"]).assert().success();
    unlocked(&tmp)
        .args(["add", "P", "Bank", "-p", "p1"])
        .assert()
        .success();

    unlocked(&tmp)
        .env("LOCKBOX_NEW_PASSWORD", "battery-staple")
        .args(["passwd", "P"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries re-encrypted"));

    unlocked(&tmp).args(["list", "P"]).assert().failure();

    lockbox()
        .current_dir(tmp.path())
        .env("LOCKBOX_PASSWORD", "battery-staple")
        .args(["list", "P"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bank"));
}

#[test]
fn export_then_import_into_another_vault() {
    let tmp = workspace();
    unlocked(&tmp).args(["create", "A"]).assert().success();
    unlocked(&tmp).args(["create", "B"]).assert().success();
    unlocked(&tmp)
        .args(["add", "A", "Gmail", "-u", "a@b.com", "-p", "x1"])
        .assert()
        .success();

    let export = tmp.child("a.json");
    unlocked(&tmp)
        .args(["export", "A", "-o", export.path().to_str().unwrap()])
        .assert()
        .success();
    export.assert(predicate::str::contains("\"password\": \"x1\""));

    unlocked(&tmp)
        .args(["import", "B", export.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 created"));

    unlocked(&tmp)
        .args(["import", "B", export.path().to_str().unwrap(), "--policy", "skip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 skipped"));

    unlocked(&tmp)
        .args(["import", "B", export.path().to_str().unwrap(), "--policy", "merge"])
        .assert()
        .failure();

    // A second export never clobbers the first.
    unlocked(&tmp)
        .args(["export", "B", "-o", export.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    export.assert(predicate::str::contains("\"password\": \"x1\""));
}

#[test]
fn backup_restore_and_remove() {
    let tmp = workspace();
    unlocked(&tmp).args(["create", "Work"]).assert().success();

    let backup = tmp.child("work.bak");
    lockbox()
        .current_dir(tmp.path())
        .args(["backup", "Work", backup.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("SHA-256"));
    backup.assert(predicate::path::exists());

    lockbox()
        .current_dir(tmp.path())
        .args(["remove", "Work", "--force"])
        .assert()
        .success();

    lockbox()
        .current_dir(tmp.path())
        .args(["restore", backup.path().to_str().unwrap(), "Work"])
        .assert()
        .success();

    unlocked(&tmp).args(["stats", "Work"]).assert().success();
}

#[test]
fn generate_respects_length() {
    let tmp = workspace();
    let out = lockbox()
        .current_dir(tmp.path())
        .args(["generate", "--length", "16", "--no-symbols"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let password = String::from_utf8(out).unwrap();
    assert_eq!(password.trim_end().len(), 16);
    assert!(password.trim_end().chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn unknown_vault_fails_without_prompting() {
    let tmp = workspace();
    lockbox()
        .current_dir(tmp.path())
        .args(["list", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No vault named 'ghost'"));
}

#[test]
fn completions_generate_script() {
    lockbox()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lockbox"));
}
