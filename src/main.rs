//! Slate - a small statically typed imperative language on a bytecode VM
//!
//! This is the main entry point for the slate CLI/REPL.
//!
//! ## Features
//!
//! - Interactive REPL with syntax highlighting and history
//! - Script execution and one-shot evaluation
//! - Bytecode listings via `--emit-bytecode`

mod repl;

use clap::Parser;
use owo_colors::OwoColorize;
use slate_core::{Engine, Error};
use std::path::PathBuf;
use std::process::ExitCode;

/// The Slate language driver.
#[derive(Parser)]
#[command(name = "slate", version, about = "The Slate language", long_about = None)]
struct Cli {
    /// Slate source file to execute
    file: Option<PathBuf>,

    /// Evaluate code given on the command line
    #[arg(short = 'e', long = "eval", value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the compiled bytecode listing instead of executing
    #[arg(long)]
    emit_bytecode: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(code) = &cli.eval {
        return run_source(code, cli.emit_bytecode);
    }

    if let Some(path) = &cli.file {
        return run_file(path, cli.emit_bytecode);
    }

    run_repl()
}

/// Start the interactive REPL
fn run_repl() -> ExitCode {
    match repl::Repl::new() {
        Ok(mut repl) => {
            if let Err(e) = repl.run() {
                eprintln!("{}: {:?}", "REPL Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(
                "{}: Failed to initialize REPL: {:?}",
                "Error".red().bold(),
                e
            );
            ExitCode::FAILURE
        }
    }
}

/// Execute a Slate file.
fn run_file(path: &std::path::Path, emit_bytecode: bool) -> ExitCode {
    if !path.exists() {
        eprintln!(
            "{}: file not found '{}'",
            "Error".red().bold(),
            path.display().cyan()
        );
        return ExitCode::FAILURE;
    }

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    run_source(&source, emit_bytecode)
}

/// Compile and run (or just list) Slate source code.
fn run_source(source: &str, emit_bytecode: bool) -> ExitCode {
    let mut engine = Engine::new();

    if emit_bytecode {
        return match engine.compile(source) {
            Ok((bytecode, diagnostics)) => {
                for diagnostic in &diagnostics {
                    eprintln!("{}: {}", "warning".yellow().bold(), diagnostic);
                }
                print!("{}", bytecode.disassemble());
                ExitCode::SUCCESS
            }
            Err(e) => {
                print_error(&e);
                ExitCode::FAILURE
            }
        };
    }

    match engine.eval(source) {
        Ok(outcome) => {
            for diagnostic in &outcome.diagnostics {
                eprintln!("{}: {}", "warning".yellow().bold(), diagnostic);
            }
            for value in &outcome.output {
                println!("{}", value);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Print a formatted error message
fn print_error(error: &Error) {
    let error_str = error.to_string();

    // Split error type from message
    if let Some(colon_pos) = error_str.find(':') {
        let (error_type, message) = error_str.split_at(colon_pos);
        eprintln!("{}{}", error_type.red().bold(), message);
    } else {
        eprintln!("{}", error_str.red());
    }
}
