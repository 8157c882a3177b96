use serde::{Deserialize, Serialize};

use super::module::Module;

/// A parsed multi-module program.
///
/// This is what `--emit-ir` writes: a compact `postcard` encoding of every
/// module's instructions, in translation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramIr {
    pub modules: Vec<Module>,
}

impl ProgramIr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, module: Module) {
        self.modules.push(module);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    pub fn instruction_count(&self) -> usize {
        self.modules.iter().map(|m| m.instructions.len()).sum()
    }
}
