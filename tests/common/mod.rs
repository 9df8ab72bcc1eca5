//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use wasm_stepper::runtime::builder::{i32_const, op, ModuleBuilder};
use wasm_stepper::runtime::{FunctionId, Module, Signature, WasmType};

pub const WASM_A: FunctionId = FunctionId(0);
pub const WASM_B: FunctionId = FunctionId(1);
pub const FACT: FunctionId = FunctionId(2);

/// `wasm_A(i32)` does nothing, `wasm_B(n)` (exported as `main`) calls it
/// `n` times in a loop, `fact(n)` recurses.
///
/// Body layout of `wasm_B`, relative to its body offset:
/// loop 0, local.get 2, if 4, local.get 6, i32.const 8, i32.sub 10,
/// local.set 11, i32.const 1024 13, call 16, br 18, end 20, end 21, end 22.
///
/// Body layout of `fact`: local.get 0, if 2, local.get 4, i32.const 6,
/// i32.sub 8, call 9, local.get 11, i32.mul 13, else 14, i32.const 15,
/// end 17, end 18.
pub fn stepping_module_bytes() -> Vec<u8> {
    let mut builder = ModuleBuilder::new();
    builder
        .add_function("wasm_A", Signature::new([WasmType::I32], []))
        .body(&[op::NOP, op::NOP]);

    let mut wasm_b = vec![
        op::LOOP, op::VOID,
        op::LOCAL_GET, 0,
        op::IF, op::VOID,
        op::LOCAL_GET, 0,
        op::I32_CONST, 1,
        op::I32_SUB,
        op::LOCAL_SET, 0,
    ];
    wasm_b.extend(i32_const(1024));
    wasm_b.extend([op::CALL, WASM_A.0 as u8, op::BR, 1, op::END, op::END]);
    builder
        .add_function("wasm_B", Signature::new([WasmType::I32], []))
        .body(&wasm_b)
        .export_as("main");

    let fact = [
        op::LOCAL_GET, 0,
        op::IF, op::TYPE_I32,
        op::LOCAL_GET, 0,
        op::I32_CONST, 1,
        op::I32_SUB,
        op::CALL, FACT.0 as u8,
        op::LOCAL_GET, 0,
        op::I32_MUL,
        op::ELSE,
        op::I32_CONST, 1,
        op::END,
    ];
    builder
        .add_function("fact", Signature::new([WasmType::I32], [WasmType::I32]))
        .locals(1, WasmType::I32)
        .body(&fact)
        .export_as("fact");

    builder.build()
}

pub fn stepping_module() -> Module {
    wasm_stepper::load_module(&stepping_module_bytes()).expect("fixture module loads")
}

pub fn body_offset(module: &Module, function: FunctionId) -> u32 {
    module.function(function).expect("fixture function").body_offset()
}

/// Write the fixture module into `dir` and return its path.
pub fn write_stepping_module(dir: &Path) -> PathBuf {
    let path = dir.join("stepping.wasm");
    std::fs::write(&path, stepping_module_bytes()).expect("write fixture module");
    path
}

/// Offsets of the `main(4)` walk, relative to `wasm_B`'s body offset.
pub const MAIN_PAUSE_OFFSETS: [u32; 17] =
    [16, 18, 16, 18, 2, 16, 18, 2, 4, 6, 8, 10, 11, 13, 16, 18, 2];
