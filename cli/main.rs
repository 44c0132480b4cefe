//! Reference embedding of the `hololisp` core (spec §6): read one
//! source file, run it, and translate the resulting `Outcome` into
//! process output and an exit code. Not part of the library itself —
//! kept here the way a teacher repo keeps its own `cli/` thin, pushing
//! everything that could be reused by an embedder into the lib crate.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use hololisp::{Diagnostic, Outcome, Vm, VmConfig};

/// Run a hololisp source file.
#[derive(Parser)]
#[command(name = "hololisp", version, about)]
struct Args {
    /// Path to the source file to interpret.
    path: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args.path) {
        Ok(outcome) => exit_code_for(&outcome),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &PathBuf) -> Result<Outcome> {
    let source = fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
    let name = path.display().to_string();

    let config = VmConfig {
        write_fn: Box::new(|s| print!("{s}")),
        error_fn: Box::new(render_diagnostic),
        ..VmConfig::default()
    };
    let mut vm = Vm::new(config);
    Ok(vm.interpret(source, name))
}

fn render_diagnostic(d: &Diagnostic) {
    eprintln!("{}: {}: {}", d.span.offset, d.kind, d.message);
}

/// Non-zero on any compile or runtime error, zero on success (spec §6).
fn exit_code_for(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Ok(_) => ExitCode::SUCCESS,
        Outcome::CompileError(_) | Outcome::RuntimeError(_) => ExitCode::FAILURE,
    }
}
