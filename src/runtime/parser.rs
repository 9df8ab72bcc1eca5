//! Invocation argument parsing and type-aware normalisation.
//!
//! Accepts raw JSON from the CLI or the protocol and converts it into
//! [`Value`]s typed by the parameters of the invoked function.
//!
//! # Accepted shapes
//! - A JSON array of numbers: `[4]`, `[1, -2]`.
//! - Typed-annotation envelopes, `{"type": "i64", "value": 5}`, anywhere a
//!   number is accepted.
//! - A bare number when the function takes exactly one parameter.

use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::{DebugResult, DebuggerError};
use crate::runtime::module::{Module, Signature, WasmType};
use crate::runtime::value::Value;

/// Parse a raw JSON argument string for the export `export`.
pub fn parse_args(module: &Module, export: &str, args_json: &str) -> DebugResult<Vec<Value>> {
    let function = module
        .export(export)
        .and_then(|id| module.function(id))
        .ok_or_else(|| DebuggerError::UnknownExport(export.to_string()))?;

    let raw: JsonValue = serde_json::from_str(args_json).map_err(|e| {
        warn!("Failed to parse arguments: {}", e);
        DebuggerError::InvalidArguments(format!("Invalid JSON in --args: {}", e))
    })?;

    let raw = match raw {
        JsonValue::Array(items) => items,
        single @ (JsonValue::Number(_) | JsonValue::Object(_)) => vec![single],
        other => {
            return Err(DebuggerError::InvalidArguments(format!(
                "expected an array of arguments, got {}",
                json_type_name(&other)
            )))
        }
    };

    coerce_args(function.signature(), &raw)
}

/// Convert JSON values into arguments matching `signature`.
pub fn coerce_args(signature: &Signature, raw: &[JsonValue]) -> DebugResult<Vec<Value>> {
    if raw.len() != signature.params.len() {
        return Err(DebuggerError::InvalidArguments(format!(
            "expected {} argument(s), got {}",
            signature.params.len(),
            raw.len()
        )));
    }

    raw.iter()
        .zip(signature.params.iter())
        .enumerate()
        .map(|(index, (arg, ty))| coerce(index, arg, *ty))
        .collect()
}

/// Check already-typed arguments against `signature`.
pub fn check_args(signature: &Signature, args: &[Value]) -> DebugResult<()> {
    if args.len() != signature.params.len() {
        return Err(DebuggerError::InvalidArguments(format!(
            "expected {} argument(s), got {}",
            signature.params.len(),
            args.len()
        )));
    }
    for (index, (arg, ty)) in args.iter().zip(signature.params.iter()).enumerate() {
        if arg.ty() != *ty {
            return Err(DebuggerError::InvalidArguments(format!(
                "argument {} expects {}, got {}",
                index,
                ty,
                arg.ty()
            )));
        }
    }
    Ok(())
}

fn coerce(index: usize, arg: &JsonValue, ty: WasmType) -> DebugResult<Value> {
    if is_typed_annotation(arg) {
        let value: Value = serde_json::from_value(arg.clone()).map_err(|e| {
            DebuggerError::InvalidArguments(format!("argument {}: {}", index, e))
        })?;
        if value.ty() != ty {
            return Err(DebuggerError::InvalidArguments(format!(
                "argument {} expects {}, got {}",
                index,
                ty,
                value.ty()
            )));
        }
        return Ok(value);
    }

    let JsonValue::Number(number) = arg else {
        return Err(DebuggerError::InvalidArguments(format!(
            "argument {} expects {}, got {}",
            index,
            ty,
            json_type_name(arg)
        )));
    };
    let Some(n) = number.as_i64() else {
        return Err(DebuggerError::InvalidArguments(format!(
            "argument {} is not an integer: {}",
            index, number
        )));
    };

    match ty {
        WasmType::I32 => i32::try_from(n).map(Value::I32).map_err(|_| {
            DebuggerError::InvalidArguments(format!("argument {} out of i32 range: {}", index, n))
        }),
        WasmType::I64 => Ok(Value::I64(n)),
        other => Err(DebuggerError::InvalidArguments(format!(
            "argument {} has unsupported type {}",
            index, other
        ))),
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn is_typed_annotation(value: &JsonValue) -> bool {
    matches!(
        value,
        JsonValue::Object(obj) if obj.get("type").is_some() && obj.get("value").is_some()
    )
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
