#![no_main]

use libfuzzer_sys::fuzz_target;
use wasm_stepper::debugger::breakpoint::resolve;
use wasm_stepper::load_module;

fuzz_target!(|data: &[u8]| {
    let Ok(module) = load_module(data) else {
        return;
    };
    for function in module.functions() {
        for offset in function.body_offset()..=function.body_end() {
            if let Ok(resolved) = resolve(&module, function.id(), offset) {
                assert!(resolved >= offset);
                assert!(function.is_breakable_offset(resolved));
            }
        }
    }
});
