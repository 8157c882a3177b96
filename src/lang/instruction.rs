use serde::{Deserialize, Serialize};

/// Largest value an A-instruction can load (15 bits).
pub const MAX_IMMEDIATE: u16 = 0x7FFF;

/// One parsed VM source line.
///
/// `index` counts retained lines only (blank and comment lines are skipped)
/// and is 0-based within a module. `line` is the 1-based physical line in
/// the source file and is only used for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Trimmed source text, echoed as a comment above the generated code.
    pub text: String,
    pub line: usize,
    pub index: usize,
    pub kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Kind {
    // ( x y -- x op y ) or ( x -- op x )
    Arithmetic(ArithOp),

    PushPop {
        direction: Direction,
        segment: Segment,
        offset: u16,
    },

    // Control flow
    Label(String),
    Goto(String),
    IfGoto(String),

    // Functions
    Function { name: String, locals: u16 },
    Call { name: String, args: u16 },
    Return,

    /// A line that matches none of the known shapes.
    ///
    /// It still occupies an instruction index and still gets its echo
    /// comment, but produces no code.
    Unrecognized { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "add" => ArithOp::Add,
            "sub" => ArithOp::Sub,
            "neg" => ArithOp::Neg,
            "eq" => ArithOp::Eq,
            "gt" => ArithOp::Gt,
            "lt" => ArithOp::Lt,
            "and" => ArithOp::And,
            "or" => ArithOp::Or,
            "not" => ArithOp::Not,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Neg => "neg",
            ArithOp::Eq => "eq",
            ArithOp::Gt => "gt",
            ArithOp::Lt => "lt",
            ArithOp::And => "and",
            ArithOp::Or => "or",
            ArithOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Push,
    Pop,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Push => "push",
            Direction::Pop => "pop",
        }
    }
}

/// VM memory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Static,
    Temp,
    Pointer,
}

impl Segment {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "constant" => Segment::Constant,
            "local" => Segment::Local,
            "argument" => Segment::Argument,
            "this" => Segment::This,
            "that" => Segment::That,
            "static" => Segment::Static,
            "temp" => Segment::Temp,
            "pointer" => Segment::Pointer,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Static => "static",
            Segment::Temp => "temp",
            Segment::Pointer => "pointer",
        }
    }

    /// Base-pointer cell for the segments addressed through one.
    pub fn base_pointer(self) -> Option<&'static str> {
        match self {
            Segment::Local => Some("LCL"),
            Segment::Argument => Some("ARG"),
            Segment::This => Some("THIS"),
            Segment::That => Some("THAT"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Kind {
    /// Format a kind using VM surface syntax.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Arithmetic(op) => write!(f, "{}", op.name()),
            Kind::PushPop {
                direction,
                segment,
                offset,
            } => write!(f, "{} {} {}", direction.name(), segment.name(), offset),
            Kind::Label(name) => write!(f, "label {}", name),
            Kind::Goto(name) => write!(f, "goto {}", name),
            Kind::IfGoto(name) => write!(f, "if-goto {}", name),
            Kind::Function { name, locals } => write!(f, "function {} {}", name, locals),
            Kind::Call { name, args } => write!(f, "call {} {}", name, args),
            Kind::Return => write!(f, "return"),
            Kind::Unrecognized { reason } => write!(f, "<unrecognized: {}>", reason),
        }
    }
}
