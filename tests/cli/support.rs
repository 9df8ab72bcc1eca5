use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

use crate::common::write_stepping_module;

/// The binary with colours and ambient configuration switched off.
pub fn stepper() -> Command {
    let mut cmd = Command::cargo_bin("wasm-stepper").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("WASM_STEPPER_CONFIG");
    cmd
}

/// A temp dir holding `stepping.wasm`; keep the dir alive while the path is used.
pub fn fixture() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = write_stepping_module(dir.path());
    (dir, path)
}
