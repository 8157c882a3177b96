/// Where a Hack program failed: while assembling its text, or while the
/// machine was running it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// 1-based source line of the assembly text.
    Assemble { line: usize },
    /// ROM address of the instruction being executed.
    Execute { pc: usize },
}

#[derive(Debug)]
pub struct RuntimeError {
    pub fault: Fault,
    pub message: String,
    /// Outermost last, e.g. `["simulating output"]`.
    pub context: Vec<String>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fault {
            Fault::Assemble { line } => write!(f, "assembly line {}: {}", line, self.message)?,
            Fault::Execute { pc } => write!(f, "machine fault at pc={}: {}", pc, self.message)?,
        }
        for context in self.context.iter().rev() {
            write!(f, " (while {})", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn new(fault: Fault, message: String) -> Self {
        RuntimeError {
            fault,
            message,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context.push(context.to_string());
        self
    }
}

pub fn bad_instruction(line: usize, text: &str, reason: &str) -> RuntimeError {
    RuntimeError::new(
        Fault::Assemble { line },
        format!("cannot assemble '{}': {}", text, reason),
    )
}

pub fn address_out_of_range(address: i16, pc: usize) -> RuntimeError {
    RuntimeError::new(
        Fault::Execute { pc },
        format!("memory access at {} is outside RAM", address as u16),
    )
}

pub fn step_limit(max: usize, pc: usize) -> RuntimeError {
    RuntimeError::new(
        Fault::Execute { pc },
        format!("execution step limit exceeded ({})", max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_fault_and_context() {
        let err = step_limit(10, 7)
            .with_context("running Main.vm")
            .with_context("simulating output");
        assert_eq!(
            err.to_string(),
            "machine fault at pc=7: execution step limit exceeded (10) \
             (while simulating output) (while running Main.vm)"
        );
    }

    #[test]
    fn test_assembly_fault_names_line() {
        let err = bad_instruction(2, "40000", "constant out of range");
        assert_eq!(err.fault, Fault::Assemble { line: 2 });
        assert_eq!(
            err.to_string(),
            "assembly line 2: cannot assemble '40000': constant out of range"
        );
    }
}
