use std::collections::HashMap;

use crate::lang::instruction::MAX_IMMEDIATE;
use crate::runtime::runtime_error::{
    RuntimeError, address_out_of_range, bad_instruction, step_limit,
};

pub const RAM_SIZE: usize = 32768;

/// First RAM cell handed out to user variables (static cells).
const FIRST_VARIABLE: u16 = 16;

// =============================================================================
// Instructions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    D,
    A,
    M,
}

/// ALU computation of a C-instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comp {
    Zero,
    One,
    MinusOne,
    Reg(Reg),
    Not(Reg),
    Neg(Reg),
    Inc(Reg),
    Dec(Reg),
    /// D+A / D+M
    DPlus(Reg),
    /// D-A / D-M
    DMinus(Reg),
    /// A-D / M-D
    MinusD(Reg),
    DAnd(Reg),
    DOr(Reg),
}

impl Comp {
    fn parse(text: &str) -> Option<Comp> {
        use Reg::*;
        Some(match text {
            "0" => Comp::Zero,
            "1" => Comp::One,
            "-1" => Comp::MinusOne,
            "D" => Comp::Reg(D),
            "A" => Comp::Reg(A),
            "M" => Comp::Reg(M),
            "!D" => Comp::Not(D),
            "!A" => Comp::Not(A),
            "!M" => Comp::Not(M),
            "-D" => Comp::Neg(D),
            "-A" => Comp::Neg(A),
            "-M" => Comp::Neg(M),
            "D+1" => Comp::Inc(D),
            "A+1" => Comp::Inc(A),
            "M+1" => Comp::Inc(M),
            "D-1" => Comp::Dec(D),
            "A-1" => Comp::Dec(A),
            "M-1" => Comp::Dec(M),
            "D+A" | "A+D" => Comp::DPlus(A),
            "D+M" | "M+D" => Comp::DPlus(M),
            "D-A" => Comp::DMinus(A),
            "D-M" => Comp::DMinus(M),
            "A-D" => Comp::MinusD(A),
            "M-D" => Comp::MinusD(M),
            "D&A" | "A&D" => Comp::DAnd(A),
            "D&M" | "M&D" => Comp::DAnd(M),
            "D|A" | "A|D" => Comp::DOr(A),
            "D|M" | "M|D" => Comp::DOr(M),
            _ => return None,
        })
    }

    fn reads_memory(self) -> bool {
        match self {
            Comp::Zero | Comp::One | Comp::MinusOne => false,
            Comp::Reg(r)
            | Comp::Not(r)
            | Comp::Neg(r)
            | Comp::Inc(r)
            | Comp::Dec(r)
            | Comp::DPlus(r)
            | Comp::DMinus(r)
            | Comp::MinusD(r)
            | Comp::DAnd(r)
            | Comp::DOr(r) => r == Reg::M,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Never,
    Gt,
    Eq,
    Ge,
    Lt,
    Ne,
    Le,
    Always,
}

impl Jump {
    fn parse(text: &str) -> Option<Jump> {
        Some(match text {
            "JGT" => Jump::Gt,
            "JEQ" => Jump::Eq,
            "JGE" => Jump::Ge,
            "JLT" => Jump::Lt,
            "JNE" => Jump::Ne,
            "JLE" => Jump::Le,
            "JMP" => Jump::Always,
            _ => return None,
        })
    }

    fn taken(self, value: i16) -> bool {
        match self {
            Jump::Never => false,
            Jump::Gt => value > 0,
            Jump::Eq => value == 0,
            Jump::Ge => value >= 0,
            Jump::Lt => value < 0,
            Jump::Ne => value != 0,
            Jump::Le => value <= 0,
            Jump::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dest {
    pub a: bool,
    pub d: bool,
    pub m: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// `@value`, symbols already resolved
    A(u16),
    C { dest: Dest, comp: Comp, jump: Jump },
}

// =============================================================================
// Assembler
// =============================================================================

/// Assembled program plus the symbol table used to build it.
#[derive(Debug, Clone)]
pub struct Rom {
    pub instrs: Vec<Instr>,
    symbols: HashMap<String, u16>,
}

enum Line<'a> {
    Label(&'a str),
    Address(&'a str),
    Compute(&'a str),
}

impl Rom {
    /// Two-pass assembly: collect label addresses, then resolve `@symbol`
    /// operands, allocating unknown symbols as variables from RAM 16 up.
    pub fn assemble(source: &str) -> Result<Rom, RuntimeError> {
        let mut symbols = predefined_symbols();
        let mut lines = Vec::new();
        let mut rom_address: u16 = 0;

        for (number, raw) in source.lines().enumerate() {
            let text = match raw.find("//") {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if text.is_empty() {
                continue;
            }

            if let Some(name) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
                if symbols.insert(name.to_string(), rom_address).is_some() {
                    return Err(bad_instruction(number + 1, text, "label defined twice"));
                }
                lines.push((number + 1, Line::Label(name)));
            } else if let Some(operand) = text.strip_prefix('@') {
                lines.push((number + 1, Line::Address(operand)));
                rom_address += 1;
            } else {
                lines.push((number + 1, Line::Compute(text)));
                rom_address += 1;
            }
        }

        let mut next_variable = FIRST_VARIABLE;
        let mut instrs = Vec::with_capacity(lines.len());

        for (number, line) in lines {
            match line {
                Line::Label(_) => {}
                Line::Address(operand) => {
                    let value = if operand.chars().all(|c| c.is_ascii_digit()) {
                        match operand.parse::<u16>() {
                            Ok(v) if v <= MAX_IMMEDIATE => v,
                            _ => {
                                return Err(bad_instruction(
                                    number,
                                    operand,
                                    "constant out of range",
                                ));
                            }
                        }
                    } else if let Some(address) = symbols.get(operand) {
                        *address
                    } else {
                        let address = next_variable;
                        symbols.insert(operand.to_string(), address);
                        next_variable += 1;
                        address
                    };
                    instrs.push(Instr::A(value));
                }
                Line::Compute(text) => instrs.push(parse_compute(number, text)?),
            }
        }

        Ok(Rom { instrs, symbols })
    }

    /// Address a label or variable resolved to.
    pub fn symbol(&self, name: &str) -> Option<u16> {
        self.symbols.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

fn parse_compute(number: usize, text: &str) -> Result<Instr, RuntimeError> {
    let (dest_text, rest) = match text.split_once('=') {
        Some((dest, rest)) => (dest.trim(), rest.trim()),
        None => ("", text),
    };
    let (comp_text, jump_text) = match rest.split_once(';') {
        Some((comp, jump)) => (comp.trim(), Some(jump.trim())),
        None => (rest, None),
    };

    let mut dest = Dest::default();
    for c in dest_text.chars() {
        match c {
            'A' => dest.a = true,
            'D' => dest.d = true,
            'M' => dest.m = true,
            _ => return Err(bad_instruction(number, text, "bad destination")),
        }
    }

    let comp = Comp::parse(comp_text)
        .ok_or_else(|| bad_instruction(number, text, "unknown computation"))?;
    let jump = match jump_text {
        Some(j) => Jump::parse(j).ok_or_else(|| bad_instruction(number, text, "unknown jump"))?,
        None => Jump::Never,
    };

    Ok(Instr::C { dest, comp, jump })
}

fn predefined_symbols() -> HashMap<String, u16> {
    let mut symbols = HashMap::new();
    for (name, address) in [
        ("SP", 0),
        ("LCL", 1),
        ("ARG", 2),
        ("THIS", 3),
        ("THAT", 4),
        ("SCREEN", 16384),
        ("KBD", 24576),
    ] {
        symbols.insert(name.to_string(), address);
    }
    for r in 0..16u16 {
        symbols.insert(format!("R{}", r), r);
    }
    symbols
}

// =============================================================================
// Machine
// =============================================================================

#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub max_steps: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            max_steps: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The program counter ran past the last instruction.
    EndOfProgram,
    /// `(L) @L 0;JMP`, the conventional "stop here" loop.
    SelfLoop,
}

/// Hack CPU with its own RAM.
pub struct Machine {
    rom: Rom,
    ram: Vec<i16>,
    a: i16,
    d: i16,
    pc: usize,
    steps: usize,
    config: MachineConfig,
}

impl Machine {
    pub fn new(rom: Rom) -> Self {
        Self::with_config(rom, MachineConfig::default())
    }

    pub fn with_config(rom: Rom, config: MachineConfig) -> Self {
        Self {
            rom,
            ram: vec![0; RAM_SIZE],
            a: 0,
            d: 0,
            pc: 0,
            steps: 0,
            config,
        }
    }

    pub fn load(source: &str) -> Result<Self, RuntimeError> {
        Ok(Self::new(Rom::assemble(source)?))
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// RAM cell at `address`, `None` past the end of RAM.
    pub fn peek(&self, address: u16) -> Option<i16> {
        self.ram.get(address as usize).copied()
    }

    pub fn poke(&mut self, address: u16, value: i16) -> Result<(), RuntimeError> {
        self.write(address as i16, value)
    }

    pub fn sp(&self) -> u16 {
        self.ram[0] as u16
    }

    /// The VM stack's top value. `None` when the stack is empty or `SP`
    /// points outside RAM.
    pub fn stack_top(&self) -> Option<i16> {
        self.sp().checked_sub(1).and_then(|top| self.peek(top))
    }

    pub fn run(&mut self) -> Result<Halt, RuntimeError> {
        loop {
            if let Some(halt) = self.step()? {
                return Ok(halt);
            }
        }
    }

    /// Execute one instruction. `Some` once the program has stopped.
    pub fn step(&mut self) -> Result<Option<Halt>, RuntimeError> {
        let Some(instr) = self.rom.instrs.get(self.pc).copied() else {
            return Ok(Some(Halt::EndOfProgram));
        };

        self.steps += 1;
        if self.steps > self.config.max_steps {
            return Err(step_limit(self.config.max_steps, self.pc));
        }

        match instr {
            Instr::A(value) => {
                self.a = value as i16;
                self.pc += 1;
            }
            Instr::C { dest, comp, jump } => {
                let address = self.a;
                let m = if comp.reads_memory() {
                    self.read(address)?
                } else {
                    0
                };
                let value = self.compute(comp, m);

                if dest.m {
                    self.write(address, value)?;
                }
                if dest.a {
                    self.a = value;
                }
                if dest.d {
                    self.d = value;
                }

                if jump.taken(value) {
                    let target = address as u16 as usize;
                    if jump == Jump::Always
                        && target + 1 == self.pc
                        && self.rom.instrs.get(target) == Some(&Instr::A(target as u16))
                    {
                        return Ok(Some(Halt::SelfLoop));
                    }
                    self.pc = target;
                } else {
                    self.pc += 1;
                }
            }
        }

        Ok(None)
    }

    fn compute(&self, comp: Comp, m: i16) -> i16 {
        let reg = |r: Reg| match r {
            Reg::D => self.d,
            Reg::A => self.a,
            Reg::M => m,
        };
        match comp {
            Comp::Zero => 0,
            Comp::One => 1,
            Comp::MinusOne => -1,
            Comp::Reg(r) => reg(r),
            Comp::Not(r) => !reg(r),
            Comp::Neg(r) => reg(r).wrapping_neg(),
            Comp::Inc(r) => reg(r).wrapping_add(1),
            Comp::Dec(r) => reg(r).wrapping_sub(1),
            Comp::DPlus(r) => self.d.wrapping_add(reg(r)),
            Comp::DMinus(r) => self.d.wrapping_sub(reg(r)),
            Comp::MinusD(r) => reg(r).wrapping_sub(self.d),
            Comp::DAnd(r) => self.d & reg(r),
            Comp::DOr(r) => self.d | reg(r),
        }
    }

    fn read(&self, address: i16) -> Result<i16, RuntimeError> {
        self.ram
            .get(address as u16 as usize)
            .copied()
            .ok_or_else(|| address_out_of_range(address, self.pc))
    }

    fn write(&mut self, address: i16, value: i16) -> Result<(), RuntimeError> {
        let pc = self.pc;
        match self.ram.get_mut(address as u16 as usize) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(address_out_of_range(address, pc)),
        }
    }
}
