//! Command-line driver for the compiler front-end.

use std::path::PathBuf;

use clap::Parser;

use crate::diagnostic::Diagnostic;
use crate::ir;
use crate::program::Program;

#[derive(Parser)]
#[command(name = "dyva")]
#[command(about = "The Dyva compiler front-end", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Source file to compile
    pub input: PathBuf,

    /// Print the lowered IR of the entry module to stdout
    #[arg(long)]
    pub emit_ir: bool,

    /// Print diagnostics as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Disable ANSI colors in diagnostics
    #[arg(long)]
    pub no_color: bool,
}

/// Entry point for the CLI. Renders the diagnostics of every loaded module
/// to stderr and exits non-zero when any is an error.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut program = Program::new();
    let entry = program.load_file(&cli.input, true)?;

    for module in &program.modules {
        for diagnostic in module.syntax.diagnostics.sorted(&program.sources) {
            eprint!("{}", diagnostic.render(&program.sources, !cli.no_color));
        }
    }
    if cli.json {
        let all: Vec<&Diagnostic> = program
            .modules
            .iter()
            .flat_map(|m| m.syntax.diagnostics.iter())
            .collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
    }
    let failed = program.contains_error();
    if cli.emit_ir && !failed {
        print!("{}", ir::print_module(&program.module(entry).ir, &program.interner));
    }
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
