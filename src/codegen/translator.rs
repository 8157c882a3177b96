use log::{debug, warn};

use crate::codegen::codegen_error::CodegenError;
use crate::codegen::generator::{CodeGen, GenContext};
use crate::frontend::parser::Parser;
use crate::lang::instruction::Instruction;
use crate::lang::module::Module;

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Fail on lines that produce no code instead of echoing them.
    pub strict: bool,
    /// Function the bootstrap jumps to.
    pub entry_point: String,
    /// Initial value of `SP`.
    pub stack_base: u16,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        TranslatorConfig {
            strict: false,
            entry_point: "Sys.init".to_string(),
            stack_base: 256,
        }
    }
}

/// Generated code for one source instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// `// <source line>`
    pub comment: String,
    pub code: Vec<String>,
}

impl std::fmt::Display for Block {
    /// One line per entry, each terminated by `\n`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.comment)?;
        for line in &self.code {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct TranslateError {
    pub module: String,
    pub line: usize,
    pub text: String,
    pub source: CodegenError,
}

impl std::fmt::Display for TranslateError {
    /// `module:line: message`, the usual compiler diagnostic shape.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}\n  | {}",
            self.module, self.line, self.source, self.text
        )
    }
}

impl std::error::Error for TranslateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Drives the parser and generator over whole modules.
pub struct Translator {
    codegen: CodeGen,
    config: TranslatorConfig,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(TranslatorConfig::default())
    }
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            codegen: CodeGen::new(config.entry_point.clone(), config.stack_base),
            config,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Start-up code, emitted once ahead of every module. No echo comment.
    pub fn bootstrap(&self) -> String {
        let mut out = String::new();
        for line in self.codegen.bootstrap() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Lazily translate one module's source lines.
    pub fn translate_module<I, S>(
        &self,
        module_name: &str,
        lines: I,
    ) -> ModuleTranslation<'_, Parser<I>>
    where
        I: Iterator<Item = S>,
        S: AsRef<str>,
    {
        self.translate_instructions(module_name, Parser::new(lines))
    }

    /// Lazily translate an already parsed module.
    pub fn translate_parsed<'a>(
        &'a self,
        module: &'a Module,
    ) -> ModuleTranslation<'a, std::iter::Cloned<std::slice::Iter<'a, Instruction>>> {
        self.translate_instructions(&module.name, module.instructions.iter().cloned())
    }

    fn translate_instructions<I>(&self, module_name: &str, instrs: I) -> ModuleTranslation<'_, I>
    where
        I: Iterator<Item = Instruction>,
    {
        debug!("translating module {}", module_name);
        ModuleTranslation {
            translator: self,
            ctx: GenContext::new(module_name),
            instrs,
        }
    }

    /// Translate several modules into one assembly text.
    ///
    /// Each module gets its own [`GenContext`]; the bootstrap, if asked for,
    /// comes before everything else.
    pub fn translate_program<'a, M>(
        &self,
        modules: M,
        bootstrap: bool,
    ) -> Result<String, TranslateError>
    where
        M: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut out = if bootstrap {
            self.bootstrap()
        } else {
            String::new()
        };

        for (name, source) in modules {
            for block in self.translate_module(name, source.lines()) {
                out.push_str(&block?.to_string());
            }
        }

        Ok(out)
    }

    fn emit(&self, ctx: &mut GenContext, instr: Instruction) -> Result<Block, TranslateError> {
        let comment = format!("// {}", instr.text);

        match self.codegen.translate(ctx, &instr) {
            Ok(code) => Ok(Block { comment, code }),
            Err(source) if self.config.strict => Err(TranslateError {
                module: ctx.module_name().to_string(),
                line: instr.line,
                text: instr.text,
                source,
            }),
            Err(e) => {
                warn!(
                    "{}:{}: {} (no code emitted)",
                    ctx.module_name(),
                    instr.line,
                    e
                );
                Ok(Block {
                    comment,
                    code: Vec::new(),
                })
            }
        }
    }
}

/// Iterator of translated blocks for one module.
pub struct ModuleTranslation<'a, I> {
    translator: &'a Translator,
    ctx: GenContext,
    instrs: I,
}

impl<I> ModuleTranslation<'_, I> {
    pub fn context(&self) -> &GenContext {
        &self.ctx
    }
}

impl<I> Iterator for ModuleTranslation<'_, I>
where
    I: Iterator<Item = Instruction>,
{
    type Item = Result<Block, TranslateError>;

    fn next(&mut self) -> Option<Self::Item> {
        let instr = self.instrs.next()?;
        Some(self.translator.emit(&mut self.ctx, instr))
    }
}
