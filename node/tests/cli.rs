use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_required_flags() {
    let mut cmd = Command::cargo_bin("indexer-node").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--eth-rpc-url"))
        .stdout(predicate::str::contains("--database-url"));
}

#[test]
fn missing_required_flags_fails() {
    let mut cmd = Command::cargo_bin("indexer-node").unwrap();
    cmd.env_clear();
    cmd.assert().failure();
}
