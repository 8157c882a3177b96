//! Shared Hack assembly templates.
//!
//! Every generated sequence is built from these pieces. The machine has one
//! data register (`D`), one address register (`A`) and the memory cell `A`
//! points at (`M`); the VM stack lives in RAM and `SP` holds the address of
//! the next free slot.

pub const SP: &str = "SP";
pub const LCL: &str = "LCL";
pub const ARG: &str = "ARG";
pub const THIS: &str = "THIS";
pub const THAT: &str = "THAT";

/// Scratch cells. `R13` holds computed addresses and loop counters,
/// `R14` the return address during `return`.
pub const R13: &str = "R13";
pub const R14: &str = "R14";

/// First RAM cell of the `temp` segment.
pub const TEMP_BASE: u16 = 5;

/// Number of cells a call frame occupies below the callee's `LCL`.
pub const FRAME_SIZE: u16 = 5;

/// Convert a fixed template into owned lines.
pub fn lines(template: &[&str]) -> Vec<String> {
    template.iter().map(|s| s.to_string()).collect()
}

pub fn at(target: impl std::fmt::Display) -> String {
    format!("@{}", target)
}

pub fn label(name: &str) -> String {
    format!("({})", name)
}

/// ( -- D ) store `D` on top of the stack and advance `SP`.
pub fn push_d() -> Vec<String> {
    lines(&["@SP", "A=M", "M=D", "@SP", "M=M+1"])
}

/// ( x -- ) move `SP` down and load the old top into `D`.
pub fn pop_d() -> Vec<String> {
    lines(&["@SP", "M=M-1", "A=M", "D=M"])
}

/// Move `SP` down and leave `A` on the slot it now references.
fn address_top() -> Vec<String> {
    lines(&["@SP", "M=M-1", "A=M"])
}

/// Write `D` to the slot `A` points at and advance `SP`.
fn store_and_advance() -> Vec<String> {
    lines(&["M=D", "@SP", "M=M+1"])
}

/// ( x y -- r ) `y` in `D`, `x` in `M`, `ops` leaves `r` in `D`.
pub fn binary(ops: &[String]) -> Vec<String> {
    let mut out = pop_d();
    out.extend(address_top());
    out.extend(ops.iter().cloned());
    out.extend(store_and_advance());
    out
}

/// ( x -- r ) `x` in `M`, `op` leaves `r` in `D`.
pub fn unary(op: &str) -> Vec<String> {
    let mut out = address_top();
    out.push(op.to_string());
    out.extend(store_and_advance());
    out
}

/// ( -- *cell ) push the value held in a named cell.
pub fn push_cell(cell: &str) -> Vec<String> {
    let mut out = vec![at(cell), "D=M".to_string()];
    out.extend(push_d());
    out
}

/// Store the address in `D` to `R13`.
pub fn stash_address() -> Vec<String> {
    vec!["D=A".to_string(), at(R13), "M=D".to_string()]
}

/// ( x -- ) pop into the address previously stashed in `R13`.
pub fn pop_to_stashed() -> Vec<String> {
    let mut out = pop_d();
    out.extend(lines(&["@R13", "A=M", "M=D"]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_wraps_op_between_pops_and_push() {
        let code = binary(&["D=D+M".to_string()]);
        assert_eq!(
            code,
            lines(&[
                "@SP", "M=M-1", "A=M", "D=M", "@SP", "M=M-1", "A=M", "D=D+M", "M=D", "@SP",
                "M=M+1",
            ])
        );
    }

    #[test]
    fn test_unary_works_in_place() {
        let code = unary("D=-M");
        assert_eq!(
            code,
            lines(&["@SP", "M=M-1", "A=M", "D=-M", "M=D", "@SP", "M=M+1"])
        );
    }

    #[test]
    fn test_push_cell() {
        assert_eq!(
            push_cell(LCL),
            lines(&["@LCL", "D=M", "@SP", "A=M", "M=D", "@SP", "M=M+1"])
        );
    }
}
