use crate::codegen::asm::{self, ARG, FRAME_SIZE, LCL, R13, SP, TEMP_BASE, THAT, THIS, at, label};
use crate::codegen::codegen_error::CodegenError;
use crate::lang::instruction::{ArithOp, Direction, Instruction, Kind, Segment};

/// Per-module translation state.
///
/// Passed explicitly to every [`CodeGen::translate`] call; nothing is
/// shared between modules, so each module gets a fresh context.
#[derive(Debug, Clone)]
pub struct GenContext {
    module_name: String,
    /// Most recently opened function. Labels are scoped under it.
    current_function: Option<String>,
    /// Last call-site number handed out; starts at -1.
    call_site: i64,
}

impl GenContext {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            current_function: None,
            call_site: -1,
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn current_function(&self) -> Option<&str> {
        self.current_function.as_deref()
    }

    fn next_call_site(&mut self) -> i64 {
        self.call_site += 1;
        self.call_site
    }

    /// `Fn$LABEL` inside a function, the bare label before the first one.
    fn scoped_label(&self, name: &str) -> String {
        match &self.current_function {
            Some(function) => format!("{}${}", function, name),
            None => name.to_string(),
        }
    }

    fn static_cell(&self, offset: u16) -> String {
        format!("{}.{}", self.module_name, offset)
    }
}

/// Hack code generator.
///
/// Holds only immutable options; all mutable state lives in [`GenContext`].
#[derive(Debug, Clone)]
pub struct CodeGen {
    entry_point: String,
    stack_base: u16,
}

impl Default for CodeGen {
    fn default() -> Self {
        CodeGen {
            entry_point: "Sys.init".to_string(),
            stack_base: 256,
        }
    }
}

impl CodeGen {
    pub fn new(entry_point: impl Into<String>, stack_base: u16) -> Self {
        Self {
            entry_point: entry_point.into(),
            stack_base,
        }
    }

    /// Program start-up: set `SP`, lay down a dummy 5-slot frame, point
    /// `ARG` and `LCL` at it the way a call would, and jump to the entry
    /// point. The entry point never returns, so the frame's contents are
    /// never read.
    pub fn bootstrap(&self) -> Vec<String> {
        let mut out = vec![
            at(self.stack_base),
            "D=A".to_string(),
            at(SP),
            "M=D".to_string(),
        ];
        // return-address slot, then the four saved pointers
        out.extend(asm::push_cell(LCL));
        for cell in [LCL, ARG, THIS, THAT] {
            out.extend(asm::push_cell(cell));
        }
        out.extend(self.reposition_frame(0));
        out.push(at(&self.entry_point));
        out.push("0;JMP".to_string());
        out
    }

    pub fn translate(
        &self,
        ctx: &mut GenContext,
        instr: &Instruction,
    ) -> Result<Vec<String>, CodegenError> {
        match &instr.kind {
            Kind::Arithmetic(op) => Ok(self.arithmetic(*op, instr.index)),

            Kind::PushPop {
                direction: Direction::Push,
                segment,
                offset,
            } => Ok(self.push(ctx, *segment, *offset)),
            Kind::PushPop {
                direction: Direction::Pop,
                segment,
                offset,
            } => self
                .pop(ctx, *segment, *offset)
                .ok_or_else(|| CodegenError::pop_constant(&instr.kind)),

            Kind::Label(name) => Ok(vec![label(&ctx.scoped_label(name))]),
            Kind::Goto(name) => Ok(vec![at(ctx.scoped_label(name)), "0;JMP".to_string()]),
            Kind::IfGoto(name) => Ok(self.if_goto(&ctx.scoped_label(name))),

            Kind::Function { name, locals } => {
                ctx.current_function = Some(name.clone());
                Ok(self.function(name, *locals))
            }
            Kind::Call { name, args } => {
                let scope = match ctx.current_function() {
                    Some(function) => function.to_string(),
                    None => ctx.module_name().to_string(),
                };
                let return_label = format!("{}.{}.retAddr", scope, ctx.next_call_site());
                Ok(self.call(name, *args, &return_label))
            }
            Kind::Return => Ok(self.ret()),

            Kind::Unrecognized { reason } => Err(CodegenError::unrecognized(reason.clone())),
        }
    }

    // =========================================================================
    // Arithmetic / logical
    // =========================================================================

    fn arithmetic(&self, op: ArithOp, index: usize) -> Vec<String> {
        match op {
            ArithOp::Add => asm::binary(&["D=D+M".to_string()]),
            ArithOp::Sub => asm::binary(&["D=M-D".to_string()]),
            ArithOp::And => asm::binary(&["D=D&M".to_string()]),
            ArithOp::Or => asm::binary(&["D=D|M".to_string()]),
            ArithOp::Neg => asm::unary("D=-M"),
            ArithOp::Not => asm::unary("D=!M"),
            ArithOp::Eq => asm::binary(&self.comparison(op, "JEQ", index)),
            ArithOp::Gt => asm::binary(&self.comparison(op, "JGT", index)),
            ArithOp::Lt => asm::binary(&self.comparison(op, "JLT", index)),
        }
    }

    /// `x - y` then branch to a block that loads -1 or 0.
    ///
    /// Labels carry the instruction index so every comparison in a module
    /// gets its own pair.
    fn comparison(&self, op: ArithOp, jump: &str, index: usize) -> Vec<String> {
        let prefix = format!("{}.{}", op.name(), index);
        let true_label = format!("{}.TRUE", prefix);
        let end_label = format!("{}.END", prefix);

        vec![
            "D=M-D".to_string(),
            at(&true_label),
            format!("D;{}", jump),
            at(&end_label),
            "D=0;JMP".to_string(),
            label(&true_label),
            "D=-1".to_string(),
            label(&end_label),
            // the jumps clobbered A; point it back at the result slot
            "@SP".to_string(),
            "A=M".to_string(),
        ]
    }

    // =========================================================================
    // Memory access
    // =========================================================================

    fn push(&self, ctx: &GenContext, segment: Segment, offset: u16) -> Vec<String> {
        let mut out = match segment {
            Segment::Constant => vec![at(offset), "D=A".to_string()],
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let mut out = self.segment_address(segment, offset);
                out.push("D=M".to_string());
                out
            }
            Segment::Temp => {
                let mut out = self.temp_address(offset);
                out.push("D=M".to_string());
                out
            }
            Segment::Pointer => vec![at(pointer_cell(offset)), "D=M".to_string()],
            Segment::Static => vec![at(ctx.static_cell(offset)), "D=M".to_string()],
        };
        out.extend(asm::push_d());
        out
    }

    /// `None` for the constant segment, which cannot be written.
    fn pop(&self, ctx: &GenContext, segment: Segment, offset: u16) -> Option<Vec<String>> {
        Some(match segment {
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let mut out = self.segment_address(segment, offset);
                out.extend(asm::stash_address());
                out.extend(asm::pop_to_stashed());
                out
            }
            Segment::Temp => {
                let mut out = self.temp_address(offset);
                out.extend(asm::stash_address());
                out.extend(asm::pop_to_stashed());
                out
            }
            Segment::Pointer => {
                let mut out = asm::pop_d();
                out.push(at(pointer_cell(offset)));
                out.push("M=D".to_string());
                out
            }
            Segment::Static => {
                let mut out = asm::pop_d();
                out.push(at(ctx.static_cell(offset)));
                out.push("M=D".to_string());
                out
            }
            Segment::Constant => return None,
        })
    }

    /// Leaves `A` at `*base + offset`.
    fn segment_address(&self, segment: Segment, offset: u16) -> Vec<String> {
        let base = segment.base_pointer().unwrap_or(LCL);
        vec![
            at(offset),
            "D=A".to_string(),
            at(base),
            "A=M".to_string(),
            "A=D+A".to_string(),
        ]
    }

    /// Leaves `A` at `5 + offset`; temp has no pointer cell.
    fn temp_address(&self, offset: u16) -> Vec<String> {
        vec![
            at(TEMP_BASE),
            "D=A".to_string(),
            at(offset),
            "A=D+A".to_string(),
        ]
    }

    // =========================================================================
    // Branching
    // =========================================================================

    /// ( cond -- ) jump when `cond` is exactly true (-1).
    fn if_goto(&self, target: &str) -> Vec<String> {
        let mut out = asm::pop_d();
        out.extend([
            at(R13),
            "M=-1".to_string(),
            "D=D-M".to_string(),
            at(target),
            "D;JEQ".to_string(),
        ]);
        out
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Entry label, then a loop pushing `locals` zeros with the count in R13.
    fn function(&self, name: &str, locals: u16) -> Vec<String> {
        let loop_label = format!("{}.initLCL", name);
        let end_label = format!("{}.end", loop_label);

        vec![
            label(name),
            at(locals),
            "D=A".to_string(),
            at(R13),
            "M=D".to_string(),
            label(&loop_label),
            at(R13),
            "D=M".to_string(),
            at(&end_label),
            "D;JEQ".to_string(),
            "@SP".to_string(),
            "A=M".to_string(),
            "M=0".to_string(),
            "@SP".to_string(),
            "M=M+1".to_string(),
            at(R13),
            "M=M-1".to_string(),
            at(&loop_label),
            "0;JMP".to_string(),
            label(&end_label),
        ]
    }

    /// Push the frame, reposition ARG and LCL, jump, and land on
    /// `return_label`.
    fn call(&self, name: &str, args: u16, return_label: &str) -> Vec<String> {
        let mut out = vec![at(return_label), "D=A".to_string()];
        out.extend(asm::push_d());
        for cell in [LCL, ARG, THIS, THAT] {
            out.extend(asm::push_cell(cell));
        }
        out.extend(self.reposition_frame(args));
        out.extend([at(name), "0;JMP".to_string(), label(return_label)]);
        out
    }

    /// `ARG = SP - 5 - args`, `LCL = SP`.
    fn reposition_frame(&self, args: u16) -> Vec<String> {
        vec![
            "@SP".to_string(),
            "D=M".to_string(),
            at(FRAME_SIZE),
            "D=D-A".to_string(),
            at(args),
            "D=D-A".to_string(),
            at(ARG),
            "M=D".to_string(),
            "@SP".to_string(),
            "D=M".to_string(),
            at(LCL),
            "M=D".to_string(),
        ]
    }

    /// Restore the caller's frame from below `LCL` and jump back.
    ///
    /// The return address is read before `*ARG` is overwritten: with zero
    /// arguments both are the same cell.
    fn ret(&self) -> Vec<String> {
        let mut out = asm::lines(&[
            // R13 = frame = LCL
            "@LCL", "D=M", "@R13", "M=D",
            // R14 = *(frame - 5)
            "@5", "A=D-A", "D=M", "@R14", "M=D",
            // *ARG = pop()
            "@SP", "M=M-1", "A=M", "D=M", "@ARG", "A=M", "M=D",
            // SP = ARG + 1
            "@ARG", "A=M", "D=A+1", "@SP", "M=D",
        ]);
        for (distance, cell) in [(1, THAT), (2, THIS), (3, ARG), (4, LCL)] {
            out.extend([
                at(R13),
                "D=M".to_string(),
                at(distance),
                "A=D-A".to_string(),
                "D=M".to_string(),
                at(cell),
                "M=D".to_string(),
            ]);
        }
        out.extend(asm::lines(&["@R14", "A=M", "0;JMP"]));
        out
    }
}

/// `pointer 0` is THIS, any other offset is THAT.
fn pointer_cell(offset: u16) -> &'static str {
    if offset == 0 { THIS } else { THAT }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::Parser;

    /// Translate every line of `source` with one context.
    fn gen_all(module: &str, source: &str) -> Vec<Vec<String>> {
        let codegen = CodeGen::default();
        let mut ctx = GenContext::new(module);
        Parser::from_source(source)
            .map(|i| codegen.translate(&mut ctx, &i).unwrap_or_default())
            .collect()
    }

    fn gen_one(source: &str) -> Vec<String> {
        gen_all("Test", source).remove(0)
    }

    fn labels_defined(code: &[String]) -> Vec<String> {
        code.iter()
            .filter(|l| l.starts_with('('))
            .map(|l| l.trim_matches(|c| c == '(' || c == ')').to_string())
            .collect()
    }

    #[test]
    fn test_push_constant() {
        assert_eq!(
            gen_one("push constant 17"),
            asm::lines(&["@17", "D=A", "@SP", "A=M", "M=D", "@SP", "M=M+1"])
        );
    }

    #[test]
    fn test_push_local_goes_through_pointer() {
        assert_eq!(
            gen_one("push local 2"),
            asm::lines(&[
                "@2", "D=A", "@LCL", "A=M", "A=D+A", "D=M", "@SP", "A=M", "M=D", "@SP",
                "M=M+1",
            ])
        );
    }

    #[test]
    fn test_pop_argument_stashes_address() {
        assert_eq!(
            gen_one("pop argument 1"),
            asm::lines(&[
                "@1", "D=A", "@ARG", "A=M", "A=D+A", "D=A", "@R13", "M=D", "@SP", "M=M-1",
                "A=M", "D=M", "@R13", "A=M", "M=D",
            ])
        );
    }

    #[test]
    fn test_temp_has_no_indirection() {
        assert_eq!(
            gen_one("push temp 3"),
            asm::lines(&["@5", "D=A", "@3", "A=D+A", "D=M", "@SP", "A=M", "M=D", "@SP", "M=M+1"])
        );
    }

    #[test]
    fn test_pointer_selects_this_or_that() {
        assert_eq!(gen_one("push pointer 0")[0], "@THIS");
        assert_eq!(gen_one("push pointer 1")[0], "@THAT");

        let pop = gen_one("pop pointer 1");
        assert_eq!(&pop[4..], &["@THAT".to_string(), "M=D".to_string()]);
    }

    #[test]
    fn test_static_is_module_namespaced() {
        let a = gen_all("Foo", "push static 0").remove(0);
        let b = gen_all("Bar", "push static 0").remove(0);
        assert_eq!(a[0], "@Foo.0");
        assert_eq!(b[0], "@Bar.0");

        let pop = gen_all("Foo", "pop static 3").remove(0);
        assert_eq!(pop[4], "@Foo.3");
    }

    #[test]
    fn test_pop_constant_is_an_error() {
        let codegen = CodeGen::default();
        let mut ctx = GenContext::new("Test");
        let instr = Parser::from_source("pop constant 1").next().unwrap();
        assert!(matches!(
            codegen.translate(&mut ctx, &instr),
            Err(CodegenError::Untranslatable { .. })
        ));
    }

    #[test]
    fn test_unrecognized_is_an_error() {
        let codegen = CodeGen::default();
        let mut ctx = GenContext::new("Test");
        let instr = Parser::from_source("push heap 1").next().unwrap();
        assert!(matches!(
            codegen.translate(&mut ctx, &instr),
            Err(CodegenError::Unrecognized { .. })
        ));
    }

    #[test]
    fn test_sub_operand_order() {
        let code = gen_one("sub");
        assert!(code.contains(&"D=M-D".to_string()));
    }

    #[test]
    fn test_comparison_labels_use_instruction_index() {
        let blocks = gen_all("Test", "push constant 1\npush constant 1\neq\n// c\n\neq\nlt");
        assert_eq!(labels_defined(&blocks[2]), vec!["eq.2.TRUE", "eq.2.END"]);
        assert_eq!(labels_defined(&blocks[3]), vec!["eq.3.TRUE", "eq.3.END"]);
        assert_eq!(labels_defined(&blocks[4]), vec!["lt.4.TRUE", "lt.4.END"]);
        assert!(blocks[4].contains(&"D;JLT".to_string()));
    }

    #[test]
    fn test_many_comparisons_have_distinct_labels() {
        let source = vec!["eq"; 25].join("\n");
        let mut all: Vec<String> = gen_all("Test", &source)
            .iter()
            .flat_map(|b| labels_defined(b))
            .collect();
        assert_eq!(all.len(), 50);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 50);
    }

    #[test]
    fn test_labels_scoped_to_function() {
        let blocks = gen_all(
            "Main",
            "label TOP\ngoto TOP\nfunction Main.loop 0\nlabel TOP\ngoto TOP\nif-goto TOP",
        );
        assert_eq!(blocks[0], vec!["(TOP)".to_string()]);
        assert_eq!(blocks[1][0], "@TOP");
        assert_eq!(blocks[3], vec!["(Main.loop$TOP)".to_string()]);
        assert_eq!(blocks[4], vec!["@Main.loop$TOP".to_string(), "0;JMP".to_string()]);
        assert_eq!(blocks[5][7], "@Main.loop$TOP");
        assert_eq!(blocks[5][8], "D;JEQ");
    }

    #[test]
    fn test_function_init_loop() {
        let code = gen_one("function Main.fib 2");
        assert_eq!(code[0], "(Main.fib)");
        assert_eq!(code[1], "@2");
        assert_eq!(
            labels_defined(&code),
            vec!["Main.fib", "Main.fib.initLCL", "Main.fib.initLCL.end"]
        );
    }

    #[test]
    fn test_call_return_labels_are_unique() {
        let blocks = gen_all(
            "Main",
            "call Main.fib 1\nfunction Main.fib 1\ncall Main.fib 1\ncall Main.fib 1\nfunction Main.other 0\ncall Main.fib 1",
        );
        assert_eq!(labels_defined(&blocks[0]), vec!["Main.0.retAddr"]);
        assert_eq!(labels_defined(&blocks[2]), vec!["Main.fib.1.retAddr"]);
        assert_eq!(labels_defined(&blocks[3]), vec!["Main.fib.2.retAddr"]);
        assert_eq!(labels_defined(&blocks[5]), vec!["Main.other.3.retAddr"]);
    }

    #[test]
    fn test_call_frame_setup() {
        let code = gen_one("call Math.max 2");
        assert_eq!(code[0], "@Test.0.retAddr");
        // return address + four saved pointers
        assert_eq!(code.len(), 7 + 4 * 7 + 15);
        assert!(code.windows(2).any(|w| w[0] == "@2" && w[1] == "D=D-A"));
        assert_eq!(
            &code[code.len() - 3..],
            &["@Math.max", "0;JMP", "(Test.0.retAddr)"]
        );
    }

    #[test]
    fn test_return_is_fixed() {
        let a = gen_one("return");
        let b = gen_all("Other", "function Other.f 3\nreturn").remove(1);
        assert_eq!(a, b);
        assert_eq!(a.len(), 21 + 4 * 7 + 3);
        assert_eq!(&a[a.len() - 3..], &["@R14", "A=M", "0;JMP"]);
    }

    #[test]
    fn test_bootstrap() {
        let code = CodeGen::default().bootstrap();
        assert_eq!(&code[..4], &["@256", "D=A", "@SP", "M=D"]);
        assert_eq!(code.len(), 4 + 5 * 7 + 12 + 2);
        assert_eq!(&code[code.len() - 2..], &["@Sys.init", "0;JMP"]);

        let custom = CodeGen::new("Main.main", 300).bootstrap();
        assert_eq!(custom[0], "@300");
        assert_eq!(custom[custom.len() - 2], "@Main.main");
    }
}
