use predicates::prelude::*;

use crate::support::{fixture, stepper};

#[test]
fn inspect_lists_functions_and_breakable_offsets() {
    let (_dir, module) = fixture();
    stepper()
        .arg("inspect")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("Module: wasm://wasm/"))
        .stdout(predicate::str::contains("Functions: 3"))
        .stdout(predicate::str::contains("wasm_B(i32) -> [] body"))
        .stdout(predicate::str::contains("(exported as main)"))
        .stdout(predicate::str::contains("breakable: +0 +2 +4 +6 +8 +10 +11 +13 +16 +18 +22"));
}

#[test]
fn inspect_instructions_marks_breakable_ones() {
    let (_dir, module) = fixture();
    stepper()
        .arg("inspect")
        .arg(&module)
        .arg("--instructions")
        .assert()
        .success()
        .stdout(predicate::str::contains("i32.const 1024"))
        .stdout(predicate::str::contains("call 0"));
}
