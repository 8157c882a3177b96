use crate::lang::instruction::{Instruction, Kind};
use crate::lang::module::Module;

/// Prints parsed instructions, one per line, for `--dump`.
pub struct IrDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the instruction in VM syntax
}

impl Default for IrDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: false,
        }
    }
}

impl IrDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const RED: &'static str = "\x1b[31m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn debug(mut self) -> Self {
        self.show_debug_repr = true;
        self
    }

    pub fn dump(&self, module: &Module) {
        print!("{}", self.render(module));
    }

    pub fn render(&self, module: &Module) -> String {
        let mut out = format!(
            "{}== {} ({} instructions){}\n",
            self.paint(Self::DIM),
            module.name,
            module.instructions.len(),
            self.paint(Self::RESET)
        );
        for instr in &module.instructions {
            out.push_str(&self.render_one(instr));
        }
        out
    }

    fn render_one(&self, instr: &Instruction) -> String {
        let kind = self.kind(&instr.kind);
        let colr = self.paint(self.color_of(&instr.kind));
        let reset = self.paint(Self::RESET);

        if self.show_debug_repr {
            format!(
                "[{:03}:{:03}] {}{:<8} {:?}{}\n",
                instr.line, instr.index, colr, kind, instr.kind, reset
            )
        } else {
            format!(
                "[{:03}:{:03}] {}{:<8} {}{}\n",
                instr.line, instr.index, colr, kind, instr.kind, reset
            )
        }
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.color { code } else { "" }
    }

    fn kind(&self, k: &Kind) -> &'static str {
        match k {
            Kind::Arithmetic(_) => "ALU",
            Kind::PushPop { .. } => "MEMORY",
            Kind::Label(_) | Kind::Goto(_) | Kind::IfGoto(_) => "BRANCH",
            Kind::Function { .. } | Kind::Call { .. } | Kind::Return => "FUNCTION",
            Kind::Unrecognized { .. } => "INVALID",
        }
    }

    fn color_of(&self, k: &Kind) -> &'static str {
        match k {
            Kind::Arithmetic(_) => Self::MAG,
            Kind::PushPop { .. } => Self::CYN,
            Kind::Label(_) | Kind::Goto(_) | Kind::IfGoto(_) => Self::YEL,
            Kind::Function { .. } | Kind::Call { .. } | Kind::Return => Self::GRN,
            Kind::Unrecognized { .. } => Self::RED,
        }
    }
}
