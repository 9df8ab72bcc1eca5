use predicates::prelude::*;

use crate::support::{fixture, stepper};

#[test]
fn runs_to_completion_without_breakpoints() {
    let (_dir, module) = fixture();
    stepper()
        .arg("run")
        .arg(&module)
        .args(["--invoke", "fact", "--args", "[4]"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Result: 24: i32"))
        .stdout(predicate::str::contains("Paused").not());
}

#[test]
fn breakpoint_resolves_forward_and_steps_over_the_loop() {
    let (_dir, module) = fixture();
    let output = stepper()
        .arg("run")
        .arg(&module)
        .args(["--invoke", "main", "--args", "[4]", "-b", "main:+15"])
        .args(["--actions", "over,resume,over,over,resume,over"])
        .args(["--actions", "over,over,over,over,over,over,over,over,over,over,resume"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Breakpoint #1"), "{}", stdout);
    let pauses: Vec<&str> = stdout.lines().filter(|l| l.starts_with("Paused at")).collect();
    assert_eq!(pauses.len(), 17, "{}", stdout);
    assert!(pauses.iter().all(|l| l.contains("wasm://wasm/") && l.contains("wasm_B")));
    assert!(pauses[0].contains("(wasm_B, breakpoint) [breakpoint 1]"));
    assert!(pauses[14].contains("(wasm_B, step) [breakpoint 1]"));
    assert!(stdout.contains("Result: ()"));
}

#[test]
fn stop_on_entry_pauses_at_the_first_instruction() {
    let (_dir, module) = fixture();
    stepper()
        .arg("run")
        .arg(&module)
        .args(["--invoke", "fact", "--args", "[3]", "--stop-on-entry"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(fact, pause)"))
        .stdout(predicate::str::contains("Result: 6: i32"));
}

#[test]
fn quiet_run_hides_breakpoint_confirmation() {
    let (_dir, module) = fixture();
    stepper()
        .arg("--quiet")
        .arg("run")
        .arg(&module)
        .args(["--invoke", "fact", "--args", "[2]", "-b", "fact:+9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Breakpoint #").not())
        .stdout(predicate::str::contains("(fact, breakpoint)"));
}

#[test]
fn config_file_is_honoured() {
    let (dir, module) = fixture();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[execution]\nmax_call_depth = 2\n").unwrap();

    stepper()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&module)
        .args(["--invoke", "fact", "--args", "[5]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("call stack exhausted"));
}
