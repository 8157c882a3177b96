use crate::lang::instruction::{ArithOp, Direction, Instruction, Kind, MAX_IMMEDIATE, Segment};

/// Line-oriented scanner over one VM module.
///
/// Pulls lines lazily from the wrapped iterator and yields one
/// [`Instruction`] per line that is neither blank nor a `//` comment.
/// Malformed lines are not errors here: they come out as
/// [`Kind::Unrecognized`] and the caller decides what to do with them.
pub struct Parser<I> {
    lines: I,
    /// 1-based number of the last physical line read.
    line: usize,
    /// Index the next retained instruction will get.
    index: usize,
}

impl<'a> Parser<std::str::Lines<'a>> {
    pub fn from_source(source: &'a str) -> Self {
        Parser::new(source.lines())
    }
}

impl<I, S> Parser<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    pub fn new(lines: I) -> Self {
        Parser {
            lines,
            line: 0,
            index: 0,
        }
    }
}

impl<I, S> Iterator for Parser<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        loop {
            let raw = self.lines.next()?;
            self.line += 1;

            let text = raw.as_ref().trim();
            if text.is_empty() || text.starts_with("//") {
                continue;
            }

            let index = self.index;
            self.index += 1;

            return Some(Instruction {
                text: text.to_string(),
                line: self.line,
                index,
                kind: parse_kind(text),
            });
        }
    }
}

/// Classify one trimmed, non-comment line by its token shape.
pub fn parse_kind(text: &str) -> Kind {
    // trailing comments do not count as tokens
    let code = match text.find("//") {
        Some(pos) => &text[..pos],
        None => text,
    };
    let tokens: Vec<&str> = code.split_whitespace().collect();

    match tokens.as_slice() {
        ["return"] => Kind::Return,
        [name] => match ArithOp::from_name(name) {
            Some(op) => Kind::Arithmetic(op),
            None => unrecognized(format!("unknown command '{}'", name)),
        },

        ["label", name] => Kind::Label(name.to_string()),
        ["goto", name] => Kind::Goto(name.to_string()),
        ["if-goto", name] => Kind::IfGoto(name.to_string()),

        ["function", name, count] => match parse_count(count) {
            Ok(locals) => Kind::Function {
                name: name.to_string(),
                locals,
            },
            Err(reason) => unrecognized(reason),
        },
        ["call", name, count] => match parse_count(count) {
            Ok(args) => Kind::Call {
                name: name.to_string(),
                args,
            },
            Err(reason) => unrecognized(reason),
        },

        [direction @ ("push" | "pop"), segment, offset] => {
            let direction = if *direction == "push" {
                Direction::Push
            } else {
                Direction::Pop
            };
            let Some(segment) = Segment::from_name(segment) else {
                return unrecognized(format!("unknown segment '{}'", segment));
            };
            match parse_count(offset) {
                Ok(offset) => Kind::PushPop {
                    direction,
                    segment,
                    offset,
                },
                Err(reason) => unrecognized(reason),
            }
        }

        [] => unrecognized("empty instruction".to_string()),
        [first, rest @ ..] => unrecognized(format!(
            "'{}' does not take {} operand(s)",
            first,
            rest.len()
        )),
    }
}

fn parse_count(token: &str) -> Result<u16, String> {
    match token.parse::<u16>() {
        Ok(n) if n <= MAX_IMMEDIATE => Ok(n),
        Ok(_) => Err(format!("{} is larger than {}", token, MAX_IMMEDIATE)),
        Err(_) => Err(format!("expected a non-negative integer, got '{}'", token)),
    }
}

fn unrecognized(reason: String) -> Kind {
    Kind::Unrecognized { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Kind> {
        Parser::from_source(source).map(|i| i.kind).collect()
    }

    fn is_unrecognized(kind: &Kind) -> bool {
        matches!(kind, Kind::Unrecognized { .. })
    }

    #[test]
    fn test_arithmetic_commands() {
        let k = kinds("add\nsub\nneg\neq\ngt\nlt\nand\nor\nnot");
        assert_eq!(
            k,
            vec![
                Kind::Arithmetic(ArithOp::Add),
                Kind::Arithmetic(ArithOp::Sub),
                Kind::Arithmetic(ArithOp::Neg),
                Kind::Arithmetic(ArithOp::Eq),
                Kind::Arithmetic(ArithOp::Gt),
                Kind::Arithmetic(ArithOp::Lt),
                Kind::Arithmetic(ArithOp::And),
                Kind::Arithmetic(ArithOp::Or),
                Kind::Arithmetic(ArithOp::Not),
            ]
        );
    }

    #[test]
    fn test_push_pop() {
        let k = kinds("push local 2\npop static 7");
        assert_eq!(
            k,
            vec![
                Kind::PushPop {
                    direction: Direction::Push,
                    segment: Segment::Local,
                    offset: 2,
                },
                Kind::PushPop {
                    direction: Direction::Pop,
                    segment: Segment::Static,
                    offset: 7,
                },
            ]
        );
    }

    #[test]
    fn test_branching_and_functions() {
        let k = kinds("label LOOP\ngoto LOOP\nif-goto END\nfunction Main.fib 0\ncall Main.fib 1\nreturn");
        assert_eq!(
            k,
            vec![
                Kind::Label("LOOP".to_string()),
                Kind::Goto("LOOP".to_string()),
                Kind::IfGoto("END".to_string()),
                Kind::Function {
                    name: "Main.fib".to_string(),
                    locals: 0,
                },
                Kind::Call {
                    name: "Main.fib".to_string(),
                    args: 1,
                },
                Kind::Return,
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_skip_index() {
        let source = "// header\n\n   push constant 1\n\t// indented comment\n  \nadd\n";
        let instrs: Vec<Instruction> = Parser::from_source(source).collect();

        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[0].index, 0);
        assert_eq!(instrs[0].line, 3);
        assert_eq!(instrs[0].text, "push constant 1");
        assert_eq!(instrs[1].index, 1);
        assert_eq!(instrs[1].line, 6);
    }

    #[test]
    fn test_trailing_comment_is_not_a_token() {
        let instrs: Vec<Instruction> = Parser::from_source("push constant 7 // seven").collect();
        assert_eq!(instrs[0].text, "push constant 7 // seven");
        assert_eq!(
            instrs[0].kind,
            Kind::PushPop {
                direction: Direction::Push,
                segment: Segment::Constant,
                offset: 7,
            }
        );
    }

    #[test]
    fn test_tabs_and_repeated_spaces() {
        let k = kinds("push\t  argument   3");
        assert_eq!(
            k,
            vec![Kind::PushPop {
                direction: Direction::Push,
                segment: Segment::Argument,
                offset: 3,
            }]
        );
    }

    #[test]
    fn test_malformed_lines_degrade_but_keep_index() {
        let source = "push local\nmul\npush heap 1\npop temp -1\ncall Foo x\nadd";
        let instrs: Vec<Instruction> = Parser::from_source(source).collect();

        assert_eq!(instrs.len(), 6);
        for instr in &instrs[..5] {
            assert!(is_unrecognized(&instr.kind), "{:?}", instr);
        }
        assert_eq!(instrs[5].kind, Kind::Arithmetic(ArithOp::Add));
        assert_eq!(instrs[5].index, 5);
    }

    #[test]
    fn test_unrecognized_reasons() {
        match parse_kind("push heap 1") {
            Kind::Unrecognized { reason } => assert!(reason.contains("heap")),
            other => panic!("expected unrecognized, got {:?}", other),
        }
        match parse_kind("return 1") {
            Kind::Unrecognized { reason } => assert!(reason.contains("1 operand")),
            other => panic!("expected unrecognized, got {:?}", other),
        }
    }

    #[test]
    fn test_counts_fit_an_a_instruction() {
        assert_eq!(
            parse_kind("push constant 32767"),
            Kind::PushPop {
                direction: Direction::Push,
                segment: Segment::Constant,
                offset: 32767,
            }
        );
        for line in ["push constant 32768", "push constant 70000", "function F 40000"] {
            match parse_kind(line) {
                Kind::Unrecognized { reason } => assert!(!reason.is_empty()),
                other => panic!("{} should not parse, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_owned_lines() {
        let lines = vec!["push constant 1".to_string(), "neg".to_string()];
        let instrs: Vec<Instruction> = Parser::new(lines.into_iter()).collect();
        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[1].kind, Kind::Arithmetic(ArithOp::Neg));
    }
}
