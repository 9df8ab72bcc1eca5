//! Configuration file support.
//!
//! Settings are read from `wasm-stepper.toml` in the working directory, or
//! from the file given with `--config`. Every section is optional.
//!
//! ```toml
//! [breakable]
//! loop-head = true
//! end = "final-only"
//!
//! [execution]
//! fuel_slice = 10000
//! max_call_depth = 10000
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DebuggerError;
use crate::runtime::executor::DEFAULT_MAX_CALL_DEPTH;
use crate::runtime::instruction::BreakablePolicy;
use crate::Result;

pub const DEFAULT_CONFIG_FILE: &str = "wasm-stepper.toml";

/// Instructions a debug session executes before looking for new commands.
pub const DEFAULT_SESSION_FUEL_SLICE: u64 = 1_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub breakable: BreakablePolicy,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Instructions per uninterrupted run slice; unset runs to the next stop.
    pub fuel_slice: Option<u64>,
    pub max_call_depth: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fuel_slice: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter used when neither `RUST_LOG` nor a verbosity flag applies.
    pub level: Option<String>,
    pub json: bool,
}

impl Config {
    /// Load `path`, or `wasm-stepper.toml` when present, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    debug!("No {} found; using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, DebuggerError> {
        let config: Config =
            toml::from_str(text).map_err(|e| DebuggerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), DebuggerError> {
        if self.execution.fuel_slice == Some(0) {
            return Err(DebuggerError::Config(
                "execution.fuel_slice must be greater than zero".to_string(),
            ));
        }
        if self.execution.max_call_depth == 0 {
            return Err(DebuggerError::Config(
                "execution.max_call_depth must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
