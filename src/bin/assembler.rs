//! Assembly to binary program compiler CLI.
//!
//! Reads an assembly source file and writes the binary program file that the
//! `stackvm` runner loads.
//!
//! # Usage
//! ```text
//! assembler <input.basm> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.basm`: Assembly source file to compile
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.bm`)
//!
//! # Examples
//! ```text
//! assembler fib.basm
//! assembler fib.basm -o out/fib.bm
//! ```

use stackvm::virtual_machine::assembler::{assemble_source, render_assembly_diagnostic};
use stackvm::virtual_machine::program::RECORD_SIZE;
use stackvm::{error, info};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let source = fs::read_to_string(input_path).unwrap_or_else(|e| {
        error!("Failed to read {}: {}", input_path, e);
        process::exit(1)
    });

    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.bm", stem))
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    let program = match assemble_source(&source) {
        Ok(p) => p,
        Err(e) => {
            error!(
                "Assembly failed\n{}",
                render_assembly_diagnostic(input_path, &source, &e)
            );
            process::exit(1);
        }
    };

    if let Err(e) = program.save_to_file(&output_path) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Compiled {} -> {} ({} instructions, {} bytes)",
        input_path,
        output_path,
        program.len(),
        program.len() * RECORD_SIZE
    );
}

const USAGE: &str = "\
Stack VM Assembler

USAGE:
    {program} <input.basm> [OPTIONS]

ARGS:
    <input.basm>    Assembly source file to compile

OPTIONS:
    -o, --output <file>    Output file path (defaults to <input>.bm)
    -h, --help             Print this help message

EXAMPLES:
    # Compile to default output name
    {program} fib.basm

    # Compile with explicit output
    {program} fib.basm -o out/fib.bm
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
