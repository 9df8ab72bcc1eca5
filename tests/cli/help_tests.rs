use predicates::prelude::*;

use crate::support::stepper;

#[test]
fn help_lists_subcommands() {
    stepper()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("interactive"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn run_help_describes_breakpoint_specs() {
    stepper()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--breakpoint"))
        .stdout(predicate::str::contains("--actions"))
        .stdout(predicate::str::contains("--stop-on-entry"));
}

#[test]
fn version_flag() {
    stepper()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("wasm-stepper"));
}
