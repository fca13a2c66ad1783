use assert_cmd::Command;
use predicates::prelude::*;

/// Helper to get a Command for the governant binary.
#[allow(deprecated)]
fn governant_cmd() -> Command {
    Command::cargo_bin("governant").unwrap()
}

#[test]
fn help_works() {
    governant_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("decision"))
        .stdout(predicate::str::contains("--strict-exit"));
}

#[test]
fn subcommand_help_works() {
    for sub in ["allow", "violations", "decision", "evaluate", "event", "schema", "version"] {
        governant_cmd().args([sub, "--help"]).assert().success();
    }
}

#[test]
fn unknown_flag_is_invalid_input() {
    governant_cmd()
        .args(["decision", "--no-such-flag"])
        .assert()
        .code(4)
        .stdout(predicate::str::is_empty());
}
