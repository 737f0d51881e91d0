use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn stockroom() -> Command {
    Command::cargo_bin("stockroom").expect("binary")
}

#[test]
fn init_creates_database_and_prints_token() {
    let dir = TempDir::new().unwrap();

    stockroom()
        .args(["admin", "init", "--data-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("stockroom_"));

    assert!(dir.path().join("stockroom.db").exists());

    let token = std::fs::read_to_string(dir.path().join(".api_token")).unwrap();
    assert!(token.trim().starts_with("stockroom_"));
}

#[test]
fn double_init_fails() {
    let dir = TempDir::new().unwrap();

    stockroom()
        .args(["admin", "init", "--data-dir"])
        .arg(dir.path())
        .assert()
        .success();

    stockroom()
        .args(["admin", "init", "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn token_command_rotates_credentials() {
    let dir = TempDir::new().unwrap();

    stockroom()
        .args(["admin", "init", "--data-dir"])
        .arg(dir.path())
        .assert()
        .success();

    stockroom()
        .args(["admin", "token", "--email", "test@example.com", "--data-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Revoked 1 existing token(s)."))
        .stdout(predicate::str::contains("stockroom_"));
}

#[test]
fn token_command_rejects_unknown_email() {
    let dir = TempDir::new().unwrap();

    stockroom()
        .args(["admin", "init", "--data-dir"])
        .arg(dir.path())
        .assert()
        .success();

    stockroom()
        .args(["admin", "token", "--email", "nobody@example.com", "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No user with email"));
}

#[test]
fn serve_refuses_to_start_uninitialized() {
    let dir = TempDir::new().unwrap();

    stockroom()
        .args(["serve", "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
