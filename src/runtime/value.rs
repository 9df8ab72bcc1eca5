use serde::{Deserialize, Serialize};
use std::fmt;

use crate::runtime::module::WasmType;

/// A runtime value of the integer subset executed by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    I32(i32),
    I64(i64),
}

impl Value {
    pub fn ty(&self) -> WasmType {
        match self {
            Value::I32(_) => WasmType::I32,
            Value::I64(_) => WasmType::I64,
        }
    }

    /// Zero value used for declared locals.
    pub fn default_for(ty: WasmType) -> Option<Self> {
        match ty {
            WasmType::I32 => Some(Value::I32(0)),
            WasmType::I64 => Some(Value::I64(0)),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            Value::I64(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            Value::I32(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{}: i32", v),
            Value::I64(v) => write!(f, "{}: i64", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&Value::I32(24)).unwrap();
        assert_eq!(json, r#"{"type":"i32","value":24}"#);
    }

    #[test]
    fn defaults_only_for_integer_types() {
        assert_eq!(Value::default_for(WasmType::I64), Some(Value::I64(0)));
        assert_eq!(Value::default_for(WasmType::F32), None);
    }
}
