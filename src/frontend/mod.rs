pub mod ir_dumper;
pub mod parser;
pub mod source;
