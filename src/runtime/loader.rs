//! WASM module loading.
//!
//! This module is responsible for:
//! - Validating the binary with [`wasmparser::Validator`].
//! - Collecting signatures, exports and function names.
//! - Decoding every function body into the bytecode model under the
//!   configured [`BreakablePolicy`].
//!
//! It has no knowledge of execution or debugging state, so it can be tested
//! with modules produced by [`crate::runtime::builder::ModuleBuilder`].

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use wasmparser::{ExternalKind, Name, NameSectionReader, Parser, Payload, TypeRef, Validator};

use crate::error::{DebugResult, DebuggerError};
use crate::runtime::instruction::{BreakablePolicy, InstructionParser};
use crate::runtime::module::{Export, Function, FunctionId, Module, Signature, WasmType};
use crate::Result;

/// Load a module from raw bytes with the default breakability policy.
pub fn load_module(wasm: &[u8]) -> Result<Module> {
    Ok(parse_module(wasm, &BreakablePolicy::default())?)
}

/// Read and load a `.wasm` file.
pub fn load_module_file(path: &Path, policy: &BreakablePolicy) -> Result<Module> {
    let wasm = std::fs::read(path)
        .with_context(|| format!("Failed to read WASM file: {}", path.display()))?;
    parse_module(&wasm, policy)
        .with_context(|| format!("Failed to load module from {}", path.display()))
}

/// Validate `wasm` and decode it into a [`Module`].
#[tracing::instrument(skip_all, fields(bytes = wasm.len()))]
pub fn parse_module(wasm: &[u8], policy: &BreakablePolicy) -> DebugResult<Module> {
    Validator::new().validate_all(wasm).map_err(load_error)?;

    let parser = InstructionParser::new(policy);
    let mut types: Vec<Signature> = Vec::new();
    let mut function_types: Vec<u32> = Vec::new();
    let mut exports: Vec<Export> = Vec::new();
    let mut names: HashMap<u32, String> = HashMap::new();
    let mut functions: Vec<Function> = Vec::new();

    for payload in Parser::new(0).parse_all(wasm) {
        match payload.map_err(load_error)? {
            Payload::TypeSection(reader) => {
                for ty in reader.into_iter_err_on_gc_types() {
                    types.push(Signature::from(&ty.map_err(load_error)?));
                }
            }
            Payload::ImportSection(reader) => {
                for import in reader {
                    let import = import.map_err(load_error)?;
                    if matches!(import.ty, TypeRef::Func(_)) {
                        return Err(DebuggerError::ModuleLoad(format!(
                            "imported function {}::{} is not supported",
                            import.module, import.name
                        )));
                    }
                }
            }
            Payload::FunctionSection(reader) => {
                for type_index in reader {
                    function_types.push(type_index.map_err(load_error)?);
                }
            }
            Payload::ExportSection(reader) => {
                for export in reader {
                    let export = export.map_err(load_error)?;
                    if export.kind == ExternalKind::Func {
                        exports.push(Export {
                            name: export.name.to_string(),
                            function: FunctionId(export.index),
                        });
                    }
                }
            }
            Payload::CodeSectionEntry(body) => {
                let index = functions.len() as u32;
                let signature = function_types
                    .get(index as usize)
                    .and_then(|t| types.get(*t as usize))
                    .cloned()
                    .ok_or_else(|| {
                        DebuggerError::ModuleLoad(format!("function {} has no type", index))
                    })?;

                let mut locals = Vec::new();
                for local in body.get_locals_reader().map_err(load_error)? {
                    let (count, ty) = local.map_err(load_error)?;
                    locals.extend(std::iter::repeat(WasmType::from(ty)).take(count as usize));
                }

                let reader = body.get_operators_reader().map_err(load_error)?;
                let body_offset = reader.original_position() as u32;
                let decoded = parser.parse(reader)?;
                debug!(
                    function = index,
                    body_offset,
                    instructions = decoded.instructions.len(),
                    "Decoded function body"
                );

                functions.push(Function {
                    id: FunctionId(index),
                    name: String::new(),
                    signature,
                    locals,
                    body_offset,
                    body_end: body.range().end as u32,
                    instructions: decoded.instructions,
                    spans: decoded.spans,
                });
            }
            Payload::CustomSection(reader) if reader.name() == "name" => {
                if let Err(e) = read_function_names(reader.data(), reader.data_offset(), &mut names)
                {
                    warn!("Ignoring malformed name section: {}", e);
                }
            }
            _ => {}
        }
    }

    for function in &mut functions {
        function.name = names
            .remove(&function.id.0)
            .or_else(|| {
                exports
                    .iter()
                    .find(|e| e.function == function.id)
                    .map(|e| e.name.clone())
            })
            .unwrap_or_else(|| format!("$func{}", function.id));
    }

    let url = module_url(wasm);
    info!(%url, functions = functions.len(), "Module loaded");

    Ok(Module {
        url,
        types,
        functions,
        exports,
    })
}

fn read_function_names(
    data: &[u8],
    offset: usize,
    names: &mut HashMap<u32, String>,
) -> std::result::Result<(), wasmparser::BinaryReaderError> {
    for name in NameSectionReader::new(data, offset) {
        if let Name::Function(map) = name? {
            for naming in map {
                let naming = naming?;
                names.insert(naming.index, naming.name.to_string());
            }
        }
    }
    Ok(())
}

/// Stable script URL derived from the module bytes.
pub fn module_url(wasm: &[u8]) -> String {
    let digest = Sha256::digest(wasm);
    format!("wasm://wasm/{}", &hex::encode(digest)[..8])
}

fn load_error(err: wasmparser::BinaryReaderError) -> DebuggerError {
    DebuggerError::ModuleLoad(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builder::{i32_const, op, ModuleBuilder};
    use crate::runtime::instruction::{EndPolicy, Opcode};

    fn looping_module() -> Vec<u8> {
        let mut builder = ModuleBuilder::new();
        let callee = builder
            .add_function("callee", Signature::new([WasmType::I32], []))
            .body(&[op::NOP, op::NOP])
            .index();
        let mut body = vec![op::LOOP, op::VOID, op::LOCAL_GET, 0, op::IF, op::VOID];
        body.extend(i32_const(1024));
        body.extend([op::CALL, callee as u8, op::BR, 1, op::END, op::END]);
        builder
            .add_function("looper", Signature::new([WasmType::I32], []))
            .body(&body)
            .export_as("main");
        builder.build()
    }

    #[test]
    fn decodes_boundaries_and_names() {
        let module = load_module(&looping_module()).unwrap();
        assert_eq!(module.functions().len(), 2);
        assert_eq!(module.export("main"), Some(FunctionId(1)));

        let looper = module.function(FunctionId(1)).unwrap();
        assert_eq!(looper.name(), "looper");
        let base = looper.body_offset();
        let offsets: Vec<u32> = looper.instructions().iter().map(|i| i.offset - base).collect();
        assert_eq!(offsets, vec![0, 2, 4, 6, 9, 11, 13, 14, 15]);
        assert_eq!(looper.instructions()[3].opcode, Opcode::I32Const(1024));
        assert_eq!(looper.instructions()[3].len, 3);
        assert_eq!(looper.body_end(), base + 16);
    }

    #[test]
    fn structured_markers_follow_the_policy() {
        let module = load_module(&looping_module()).unwrap();
        let looper = module.function(FunctionId(1)).unwrap();
        let base = looper.body_offset();
        let breakable: Vec<u32> = looper.breakable_offsets().map(|o| o - base).collect();
        // loop, local.get, if, i32.const, call, br, final end
        assert_eq!(breakable, vec![0, 2, 4, 6, 9, 11, 15]);

        let strict = BreakablePolicy {
            loop_head: false,
            end: EndPolicy::Never,
            ..BreakablePolicy::default()
        };
        let module = parse_module(&looping_module(), &strict).unwrap();
        let looper = module.function(FunctionId(1)).unwrap();
        let breakable: Vec<u32> = looper.breakable_offsets().map(|o| o - base).collect();
        assert_eq!(breakable, vec![2, 4, 6, 9, 11]);
    }

    #[test]
    fn block_spans_pair_openers_with_their_end() {
        let module = load_module(&looping_module()).unwrap();
        let looper = module.function(FunctionId(1)).unwrap();
        assert_eq!(looper.span(0).map(|s| s.end_index), Some(7));
        assert_eq!(looper.span(2).map(|s| s.end_index), Some(6));
        assert_eq!(looper.span(1), None);
    }

    #[test]
    fn rejects_invalid_binaries() {
        let err = parse_module(b"\0asm\x01\0\0\0\x01", &BreakablePolicy::default()).unwrap_err();
        assert!(matches!(err, DebuggerError::ModuleLoad(_)));
    }

    #[test]
    fn url_is_stable_per_content() {
        let bytes = looping_module();
        assert_eq!(module_url(&bytes), module_url(&bytes));
        assert!(module_url(&bytes).starts_with("wasm://wasm/"));
        assert_eq!(module_url(&bytes).len(), "wasm://wasm/".len() + 8);
    }
}
