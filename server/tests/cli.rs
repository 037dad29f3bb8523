use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_environment_overrides() {
    Command::cargo_bin("api_server")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("UPLOAD_DIR"))
        .stdout(predicate::str::contains("MAX_FILE_SIZE"))
        .stdout(predicate::str::contains("PORT"));
}

#[test]
fn rejects_invalid_port() {
    Command::cargo_bin("api_server")
        .unwrap()
        .args(["--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--port"));
}

#[test]
fn rejects_invalid_size_from_environment() {
    Command::cargo_bin("api_server")
        .unwrap()
        .env("MAX_FILE_SIZE", "lots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max-file-size"));
}
