//! Export resolution for a debugged call.
//!
//! Turns an export name plus already-typed arguments into an [`Invocation`]
//! the debugger can enter. Argument checking happens here so a bad call is
//! rejected before any run state changes.

use tracing::info;

use crate::error::{DebugResult, DebuggerError};
use crate::runtime::module::{FunctionId, Module};
use crate::runtime::parser::check_args;
use crate::runtime::value::Value;

/// A resolved call into the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub export: String,
    pub function: FunctionId,
    pub args: Vec<Value>,
}

/// Resolve `export` and type-check `args` against its signature.
#[tracing::instrument(skip_all, fields(export = export))]
pub fn prepare_invocation(module: &Module, export: &str, args: Vec<Value>) -> DebugResult<Invocation> {
    let function = module
        .export(export)
        .ok_or_else(|| DebuggerError::UnknownExport(export.to_string()))?;
    let signature = module
        .function(function)
        .map(|f| f.signature())
        .ok_or(DebuggerError::UnknownFunction(function))?;
    check_args(signature, &args)?;

    info!("Invoking export {} ({})", export, function);
    Ok(Invocation {
        export: export.to_string(),
        function,
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builder::{op, ModuleBuilder};
    use crate::runtime::load_module;
    use crate::runtime::module::{Signature, WasmType};

    fn module() -> Module {
        let mut builder = ModuleBuilder::new();
        builder
            .add_function("id", Signature::new([WasmType::I32], [WasmType::I32]))
            .body(&[op::LOCAL_GET, 0])
            .export_as("id");
        load_module(&builder.build()).unwrap()
    }

    #[test]
    fn resolves_exports() {
        let invocation = prepare_invocation(&module(), "id", vec![Value::I32(3)]).unwrap();
        assert_eq!(invocation.function, FunctionId(0));
        assert_eq!(invocation.export, "id");
    }

    #[test]
    fn rejects_unknown_exports_and_bad_args() {
        assert_eq!(
            prepare_invocation(&module(), "nope", vec![]).unwrap_err(),
            DebuggerError::UnknownExport("nope".into())
        );
        assert!(matches!(
            prepare_invocation(&module(), "id", vec![Value::I64(3)]),
            Err(DebuggerError::InvalidArguments(_))
        ));
    }
}
