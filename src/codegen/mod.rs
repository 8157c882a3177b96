pub mod asm;
pub mod codegen_error;
pub mod generator;
pub mod translator;

pub use codegen_error::CodegenError;
pub use generator::{CodeGen, GenContext};
pub use translator::{Block, TranslateError, Translator, TranslatorConfig};
