use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser};
use log::{debug, info};

use hackvm::codegen::{Translator, TranslatorConfig};
use hackvm::frontend::ir_dumper::IrDumper;
use hackvm::frontend::source::SourceSet;
use hackvm::lang::module::Module;
use hackvm::lang::program::ProgramIr;
use hackvm::runtime::hack::{Machine, MachineConfig, Rom};

#[derive(Parser, Debug)]
#[command(
    name = "hackvm",
    version,
    about = "Translate stack-VM code (.vm) to Hack assembly (.asm)"
)]
struct Cli {
    /// A .vm file, or a directory whose .vm files form one program
    path: PathBuf,

    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit the bootstrap even for a single file
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_bootstrap")]
    bootstrap: bool,

    /// Leave out the bootstrap even for a directory
    #[arg(long = "no-bootstrap", action = ArgAction::SetTrue)]
    no_bootstrap: bool,

    /// Fail on lines that do not translate instead of echoing them
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Function the bootstrap jumps to
    #[arg(long = "entry", value_name = "NAME", default_value = "Sys.init")]
    entry: String,

    /// Print the parsed instructions of every module
    #[arg(long, action = ArgAction::SetTrue)]
    dump: bool,

    #[arg(long = "no-color", action = ArgAction::SetTrue)]
    no_color: bool,

    /// Write the parsed program as postcard-encoded IR
    #[arg(long = "emit-ir", value_name = "FILE")]
    emit_ir: Option<PathBuf>,

    /// Run the output on the built-in Hack machine for at most STEPS steps
    #[arg(long, value_name = "STEPS")]
    simulate: Option<usize>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let sources = SourceSet::open(&cli.path)?;
    let bootstrap = (sources.whole_program || cli.bootstrap) && !cli.no_bootstrap;

    let translator = Translator::new(TranslatorConfig {
        strict: cli.strict,
        entry_point: cli.entry.clone(),
        ..TranslatorConfig::default()
    });

    let mut program = ProgramIr::new();
    for file in &sources.files {
        let text = file
            .read()
            .with_context(|| format!("cannot read {}", file.path.display()))?;
        program.push(Module::parse(file.name.clone(), &text));
    }

    if cli.dump {
        let dumper = if cli.no_color {
            IrDumper::new().no_color()
        } else {
            IrDumper::new()
        };
        for module in &program.modules {
            dumper.dump(module);
        }
    }

    if let Some(path) = &cli.emit_ir {
        let bytes = program
            .to_bytes()
            .map_err(|e| anyhow!("cannot encode IR: {}", e))?;
        fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
        info!("wrote IR to {}", path.display());
    }

    let output = cli.output.clone().unwrap_or(sources.output);
    let asm = write_output(&translator, &program, bootstrap, &output)?;
    println!("written to {}", output.display());

    if let Some(max_steps) = cli.simulate {
        simulate(&asm, max_steps)?;
    }

    Ok(())
}

/// Write the translation and return it for `--simulate`.
fn write_output(
    translator: &Translator,
    program: &ProgramIr,
    bootstrap: bool,
    output: &Path,
) -> Result<String> {
    let mut asm = String::new();

    if bootstrap {
        debug!("emitting bootstrap to {}", translator.config().entry_point);
        asm.push_str(&translator.bootstrap());
    }

    for module in &program.modules {
        for block in translator.translate_parsed(module) {
            asm.push_str(&block?.to_string());
        }
    }

    let file =
        File::create(output).with_context(|| format!("cannot create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(asm.as_bytes())
        .and_then(|_| writer.flush())
        .with_context(|| format!("cannot write {}", output.display()))?;

    Ok(asm)
}

fn simulate(asm: &str, max_steps: usize) -> Result<()> {
    let rom = Rom::assemble(asm).context("generated assembly does not assemble")?;
    if rom.is_empty() {
        bail!("nothing to simulate");
    }

    let mut machine = Machine::with_config(rom, MachineConfig { max_steps });
    let halt = machine
        .run()
        .map_err(|e| e.with_context("simulating output"))?;

    println!("halted ({:?}) after {} steps", halt, machine.steps());
    match machine.stack_top() {
        Some(top) => println!("SP={} top={}", machine.sp(), top),
        None => println!("SP={} (no stack)", machine.sp()),
    }
    Ok(())
}
