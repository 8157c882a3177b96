//! # VM Intermediate Representation
//!
//! This module defines the parsed form of the stack-VM language. The parser
//! produces it and the Hack code generator consumes it.
//!
//! ## Conventions
//!
//! - Stack effects are written as `( before -- after )`.
//! - Booleans on the VM stack are `-1` (true) and `0` (false).

pub mod instruction;
pub mod module;
pub mod program;
