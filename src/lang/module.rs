use serde::{Deserialize, Serialize};

use super::instruction::{Instruction, Kind};
use crate::frontend::parser::Parser;

/// One translation unit: a `.vm` file.
///
/// The name namespaces the module's static variables, so two modules can
/// both use `static 0` without sharing a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl Module {
    /// Parse a whole source text into an owned module.
    pub fn parse(name: impl Into<String>, source: &str) -> Self {
        Self {
            name: name.into(),
            instructions: Parser::from_source(source).collect(),
        }
    }

    /// Function names declared in this module, in source order.
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().filter_map(|i| match &i.kind {
            Kind::Function { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Lines that did not parse into a known instruction.
    pub fn unrecognized(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions
            .iter()
            .filter(|i| matches!(i.kind, Kind::Unrecognized { .. }))
    }
}
