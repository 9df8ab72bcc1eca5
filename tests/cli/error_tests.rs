use predicates::prelude::*;

use crate::support::{fixture, stepper};

#[test]
fn missing_module_file() {
    stepper()
        .args(["run", "does-not-exist.wasm", "--invoke", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read WASM file"));
}

#[test]
fn invalid_module_bytes() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("broken.wasm");
    std::fs::write(&path, b"\0asm\x01\0\0\0\x01").unwrap();

    stepper()
        .arg("inspect")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load module"));
}

#[test]
fn unknown_export() {
    let (_dir, module) = fixture();
    stepper()
        .arg("run")
        .arg(&module)
        .args(["--invoke", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown export: nope"));
}

#[test]
fn wrong_argument_count() {
    let (_dir, module) = fixture();
    stepper()
        .arg("run")
        .arg(&module)
        .args(["--invoke", "fact", "--args", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 1 argument(s), got 2"));
}

#[test]
fn relative_breakpoint_without_function() {
    let (_dir, module) = fixture();
    stepper()
        .arg("run")
        .arg(&module)
        .args(["--invoke", "main", "-b", "+15"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a function"));
}

#[test]
fn unknown_step_action() {
    let (_dir, module) = fixture();
    stepper()
        .arg("run")
        .arg(&module)
        .args(["--invoke", "main", "--args", "[1]", "--actions", "sideways"])
        .assert()
        .failure();
}
