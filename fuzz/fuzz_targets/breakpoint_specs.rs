#![no_main]

use libfuzzer_sys::fuzz_target;
use wasm_stepper::cli::repl::ReplCommand;
use wasm_stepper::cli::BreakpointSpec;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(spec) = text.parse::<BreakpointSpec>() {
            // Display output parses back to the same spec.
            assert_eq!(spec.to_string().parse::<BreakpointSpec>(), Ok(spec));
        }
        let _ = ReplCommand::parse(text);
    }
});
