//! Covenant contract checker CLI.
//!
//! Provides the `covenant` binary. Programs are read from JSON files in the
//! format of [`Program::from_json`]:
//!
//! - `check` resolves every contract and reports the classes that would be
//!   excluded from lowering.
//! - `lower` prints the program with every contract lowered into guarded
//!   routine bodies.
//! - `run` lowers the program and invokes one routine under the effect
//!   runtime.
//!
//! Diagnostics and results go to stdout as JSON; human-readable messages and
//! logs go to stderr.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tracing::{debug, info};

use covenant_check::{
    CompileOptions, CompileResult, ContractCompiler, ExecError, Interpreter, InterpreterConfig,
    Value,
};
use covenant_core::Program;

/// Design-by-contract checker and interpreter.
#[derive(Parser)]
#[command(name = "covenant", about = "Design-by-contract checker and interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args)]
struct Common {
    /// Path to the program JSON file.
    program: PathBuf,

    /// Settings file with optional `compile` and `interpreter` sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not generate invariant checks.
    #[arg(long)]
    no_invariants: bool,

    /// Do not open permission frames or check field accesses.
    #[arg(long)]
    no_effects: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Resolve every contract of a program.
    Check {
        #[command(flatten)]
        common: Common,
    },

    /// Print the lowered program.
    Lower {
        #[command(flatten)]
        common: Common,
    },

    /// Lower a program and invoke one routine.
    ///
    /// Instance routines run on a fresh object built with the no-argument
    /// constructor.
    Run {
        #[command(flatten)]
        common: Common,

        /// Class declaring the routine.
        class: String,

        /// Routine name.
        method: String,

        /// Arguments as JSON literals; bare words are passed as strings.
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// Skip `assert` statements, contract checks included.
        #[arg(long)]
        disable_assertions: bool,

        /// Print the invocation trace to stderr.
        #[arg(long)]
        trace: bool,

        /// Maximum interpreted call depth.
        #[arg(long)]
        max_call_depth: Option<usize>,
    },
}

/// Contents of a `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    compile: CompileOptions,
    interpreter: InterpreterConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Check { common } => run_check(&common),
        Commands::Lower { common } => run_lower(&common),
        Commands::Run {
            common,
            class,
            method,
            args,
            disable_assertions,
            trace,
            max_call_depth,
        } => run_routine(
            &common,
            &class,
            &method,
            &args,
            disable_assertions,
            trace,
            max_call_depth,
        ),
    };
    process::exit(exit_code);
}

/// Read the program and the settings, applying command-line overrides.
fn load(common: &Common) -> Result<(Program, Settings), String> {
    let path = &common.program;
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let program = Program::from_json(&text)
        .map_err(|e| format!("failed to load '{}': {}", path.display(), e))?;

    let mut settings = match &common.config {
        Some(config) => {
            let raw = fs::read_to_string(config)
                .map_err(|e| format!("failed to read '{}': {}", config.display(), e))?;
            serde_json::from_str(&raw)
                .map_err(|e| format!("invalid settings in '{}': {}", config.display(), e))?
        }
        None => Settings::default(),
    };
    if common.no_invariants {
        settings.compile.check_invariants = false;
    }
    if common.no_effects {
        settings.compile.effect_frames = false;
        settings.interpreter.check_effects = false;
    }
    debug!(classes = program.user_classes().count(), "program loaded");
    Ok((program, settings))
}

fn report(result: &CompileResult) {
    for diagnostics in &result.diagnostics {
        eprintln!(
            "{}: excluded with {} error(s):",
            if diagnostics.class.is_empty() {
                "<program>"
            } else {
                diagnostics.class.as_str()
            },
            diagnostics.errors.len()
        );
        for err in &diagnostics.errors {
            eprintln!("  - {}", err);
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {}\"}}", e))
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = every class resolved, 2 = contract errors,
/// 3 = I/O error.
fn run_check(common: &Common) -> i32 {
    let (program, settings) = match load(common) {
        Ok(loaded) => loaded,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };
    let result = ContractCompiler::new(settings.compile).compile(&program);
    println!("{}", to_json(&result.diagnostics));
    if result.is_clean() {
        0
    } else {
        report(&result);
        2
    }
}

/// Execute the lower subcommand. The lowered program is printed even when
/// some classes were excluded.
fn run_lower(common: &Common) -> i32 {
    let (program, settings) = match load(common) {
        Ok(loaded) => loaded,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };
    let result = ContractCompiler::new(settings.compile).compile(&program);
    match result.program.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: failed to serialize lowered program: {}", e);
            return 3;
        }
    }
    if result.is_clean() {
        0
    } else {
        report(&result);
        2
    }
}

/// Execute the run subcommand.
///
/// Returns exit code: 0 = success, 1 = uncaught exception (contract
/// violations included), 2 = the class was excluded, 3 = I/O or argument
/// error, 4 = interpreter fault.
fn run_routine(
    common: &Common,
    class: &str,
    method: &str,
    raw_args: &[String],
    disable_assertions: bool,
    trace: bool,
    max_call_depth: Option<usize>,
) -> i32 {
    let (program, mut settings) = match load(common) {
        Ok(loaded) => loaded,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };
    if disable_assertions {
        settings.interpreter.enable_assertions = false;
    }
    if trace {
        settings.interpreter.trace_enabled = true;
    }
    if let Some(depth) = max_call_depth {
        settings.interpreter.max_call_depth = depth;
    }

    let args = match raw_args
        .iter()
        .map(|a| parse_arg(a))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };

    let result = ContractCompiler::new(settings.compile.clone()).compile(&program);
    if !result.is_clean() {
        report(&result);
    }
    let lowered = &result.program;
    if lowered.class(class).is_none() {
        eprintln!("Error: class '{}' is not available", class);
        return 2;
    }

    let mut interp = match Interpreter::new(lowered, settings.interpreter) {
        Ok(interp) => interp,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 4;
        }
    };
    let is_static = match lowered.lookup_method(class, method, args.len()) {
        Some((_, decl)) => decl.modifiers.is_static,
        None => {
            eprintln!(
                "Error: class '{}' has no method {}/{}",
                class,
                method,
                args.len()
            );
            return 4;
        }
    };
    info!(class, method, is_static, "invoking");
    let outcome = if is_static {
        interp.call_static(class, method, args)
    } else {
        interp
            .instantiate(class, Vec::new())
            .and_then(|receiver| interp.call_method(&receiver, method, args))
    };

    if let Some(entries) = interp.trace() {
        eprintln!("{}", to_json(&entries));
    }
    match outcome {
        Ok(value) => {
            println!("{}", value);
            0
        }
        Err(ExecError::Uncaught(exception)) => {
            eprintln!("Uncaught {}", exception);
            println!("{}", to_json(&exception));
            1
        }
        Err(ExecError::Fault(fault)) => {
            eprintln!("Interpreter error: {}", fault);
            4
        }
    }
}

/// Parse one command-line argument into an interpreter value.
fn parse_arg(raw: &str) -> Result<Value, String> {
    let parsed = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(v) => v,
        Err(_) => return Ok(Value::string(raw)),
    };
    match parsed {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| format!("argument '{}' is out of range", raw)),
        },
        serde_json::Value::String(s) => Ok(Value::string(s)),
        other => Err(format!(
            "unsupported argument '{}': only scalars are accepted",
            other
        )),
    }
}
