//! Static analysis of loaded modules.

pub mod layout;

pub use layout::{FunctionLayout, LayoutAnalyzer, ModuleReport};
