//! Translator from the stack-VM language to Hack assembly.
//!
//! `frontend` turns source lines into [`lang`] instructions, `codegen`
//! turns instructions into assembly text, and `runtime` is a Hack machine
//! that can execute the result.

pub mod codegen;
pub mod frontend;
pub mod lang;
pub mod runtime;
