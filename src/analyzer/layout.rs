use serde::{Deserialize, Serialize};
use std::fmt;

use crate::runtime::module::{FunctionId, Module, Signature};

/// One decoded instruction, as listed by `inspect --instructions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionEntry {
    pub offset: u32,
    pub len: u32,
    pub text: String,
    pub breakable: bool,
}

/// Byte layout of one function body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionLayout {
    pub id: FunctionId,
    pub name: String,
    pub signature: Signature,
    pub exported_as: Vec<String>,
    pub body_offset: u32,
    pub body_end: u32,
    pub breakable_offsets: Vec<u32>,
    pub instructions: Vec<InstructionEntry>,
}

impl fmt::Display for FunctionLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}{} body {}..{}",
            self.id, self.name, self.signature, self.body_offset, self.body_end
        )?;
        if !self.exported_as.is_empty() {
            write!(f, " (exported as {})", self.exported_as.join(", "))?;
        }
        Ok(())
    }
}

/// Layout report for a whole module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub url: String,
    pub functions: Vec<FunctionLayout>,
}

impl fmt::Display for ModuleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Module: {}", self.url)?;
        writeln!(f, "Functions: {}", self.functions.len())?;
        for function in &self.functions {
            writeln!(f, "  {}", function)?;
            let relative: Vec<String> = function
                .breakable_offsets
                .iter()
                .map(|o| format!("+{}", o - function.body_offset))
                .collect();
            writeln!(f, "    breakable: {}", relative.join(" "))?;
        }
        Ok(())
    }
}

pub struct LayoutAnalyzer;

impl LayoutAnalyzer {
    /// Describe every function body of `module`
    pub fn analyze(module: &Module) -> ModuleReport {
        let functions = module
            .functions()
            .iter()
            .map(|function| FunctionLayout {
                id: function.id(),
                name: function.name().to_string(),
                signature: function.signature().clone(),
                exported_as: module
                    .exports()
                    .iter()
                    .filter(|e| e.function == function.id())
                    .map(|e| e.name.clone())
                    .collect(),
                body_offset: function.body_offset(),
                body_end: function.body_end(),
                breakable_offsets: function.breakable_offsets().collect(),
                instructions: function
                    .instructions()
                    .iter()
                    .map(|i| InstructionEntry {
                        offset: i.offset,
                        len: i.len,
                        text: i.opcode.to_string(),
                        breakable: i.breakable,
                    })
                    .collect(),
            })
            .collect();

        ModuleReport {
            url: module.url().to_string(),
            functions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builder::{i32_const, op, ModuleBuilder};
    use crate::runtime::load_module;
    use crate::runtime::module::WasmType;

    fn report() -> ModuleReport {
        let mut builder = ModuleBuilder::new();
        let mut body = i32_const(1024);
        body.extend([op::DROP, op::BLOCK, op::VOID, op::END]);
        builder
            .add_function("wasm_A", Signature::new([WasmType::I32], []))
            .body(&body)
            .export_as("main");
        LayoutAnalyzer::analyze(&load_module(&builder.build()).unwrap())
    }

    #[test]
    fn lists_breakable_offsets_per_function() {
        let report = report();
        let function = &report.functions[0];
        let base = function.body_offset;

        assert_eq!(function.exported_as, vec!["main".to_string()]);
        assert_eq!(function.breakable_offsets, vec![base, base + 3, base + 7]);
        assert_eq!(function.instructions.len(), 5);
        assert_eq!(function.instructions[0].text, "i32.const 1024");
        assert_eq!(function.instructions[0].len, 3);
    }

    #[test]
    fn text_report_uses_relative_offsets() {
        let text = report().to_string();
        assert!(text.contains("[0] wasm_A(i32) -> [] body"));
        assert!(text.contains("(exported as main)"));
        assert!(text.contains("breakable: +0 +3 +7"));
    }
}
