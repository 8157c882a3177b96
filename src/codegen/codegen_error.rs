use crate::lang::instruction::Kind;

#[derive(Debug, Clone, PartialEq)]
pub enum CodegenError {
    /// A line the parser could not classify
    Unrecognized { reason: String },
    /// An instruction that parses but has no Hack translation
    Untranslatable {
        instruction: String,
        reason: String,
        hint: Option<String>,
    },
}

impl CodegenError {
    pub fn unrecognized(reason: impl Into<String>) -> Self {
        CodegenError::Unrecognized {
            reason: reason.into(),
        }
    }

    /// `pop constant n` has nowhere to store the value.
    pub fn pop_constant(kind: &Kind) -> Self {
        CodegenError::Untranslatable {
            instruction: kind.to_string(),
            reason: "the constant segment is read-only".to_string(),
            hint: Some("pop into temp or a pointer segment to discard a value".to_string()),
        }
    }
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenError::Unrecognized { reason } => {
                write!(f, "unrecognized instruction: {}", reason)
            }
            CodegenError::Untranslatable {
                instruction,
                reason,
                hint,
            } => {
                write!(f, "cannot translate '{}': {}", instruction, reason)?;
                if let Some(h) = hint {
                    write!(f, "\n  hint: {}", h)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CodegenError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::instruction::{Direction, Segment};

    #[test]
    fn test_unrecognized_display() {
        let err = CodegenError::unrecognized("unknown command 'mul'");
        let msg = err.to_string();
        assert!(msg.contains("unrecognized"));
        assert!(msg.contains("mul"));
    }

    #[test]
    fn test_pop_constant_display() {
        let kind = Kind::PushPop {
            direction: Direction::Pop,
            segment: Segment::Constant,
            offset: 3,
        };
        let msg = CodegenError::pop_constant(&kind).to_string();
        assert!(msg.contains("pop constant 3"));
        assert!(msg.contains("read-only"));
        assert!(msg.contains("hint"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = CodegenError::unrecognized("x");
        let _: &dyn std::error::Error = &err;
    }
}
