pub mod hack;
pub mod runtime_error;
