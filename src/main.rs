//! Stack VM program runner.
//!
//! Loads a binary program file and executes it under a step budget.
//!
//! # Usage
//! ```text
//! stackvm <program.bm> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program.bm`: Binary program produced by the `assembler` binary
//!
//! # Options
//! - `-l, --limit <N>`: Step budget (defaults to `STACKVM_EXECUTION_LIMIT`, then 69)
//! - `-t, --trace`: Dump the stack after every step
//! - `-q, --quiet`: Only log errors
//! - `-v, --verbose`: Log every executed step
//!
//! The final stack is dumped to stdout when the program halts. Any error,
//! including an exhausted budget, is logged with its symbolic name and the
//! process exits with status 1.

use stackvm::utils::log::{self, Level};
use stackvm::virtual_machine::program::Program;
use stackvm::virtual_machine::vm::{EXECUTION_LIMIT, Machine};
use stackvm::{debug, error, info, warn};
use std::env;
use std::io;
use std::process;

const LIMIT_ENV: &str = "STACKVM_EXECUTION_LIMIT";

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut limit: Option<u64> = None;
    let mut trace = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--limit" | "-l") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                limit = Some(parse_limit(&args[i]));
                i += 1;
            }
            "--trace" | "-t" => {
                trace = true;
                i += 1;
            }
            "--quiet" | "-q" => {
                log::set_max_level(Level::Error);
                i += 1;
            }
            "--verbose" | "-v" => {
                log::set_max_level(Level::Debug);
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let limit = limit.unwrap_or_else(|| match env::var(LIMIT_ENV) {
        Ok(value) => parse_limit(&value),
        Err(env::VarError::NotPresent) => EXECUTION_LIMIT,
        Err(e) => {
            warn!("Ignoring {LIMIT_ENV}: {e}");
            EXECUTION_LIMIT
        }
    });

    let program = Program::load_from_file(input_path).unwrap_or_else(|e| {
        error!("{}: {}", e.name(), e);
        process::exit(1)
    });

    info!(
        "Loaded {} ({} instructions), step budget {}",
        input_path,
        program.len(),
        limit
    );

    let mut vm = Machine::new(program);
    let mut steps = 0u64;
    let result = vm.run_traced(limit, |m| {
        steps += 1;
        debug!("step {}: ip={} depth={}", steps, m.ip(), m.stack().len());
        if trace && let Err(e) = m.dump_stack(&mut io::stdout().lock()) {
            warn!("Failed to dump stack: {e}");
        }
    });

    if let Err(e) = result {
        // The faulting step commits nothing, so this is the state it saw.
        if trace && let Err(dump_err) = vm.dump_stack(&mut io::stdout().lock()) {
            warn!("Failed to dump stack: {dump_err}");
        }
        error!("{}: {}", e.name(), e);
        process::exit(1);
    }

    info!("Halted after {} steps", steps);
    if let Err(e) = vm.dump_stack(&mut io::stdout().lock()) {
        error!("Failed to dump stack: {e}");
        process::exit(1);
    }
}

fn parse_limit(value: &str) -> u64 {
    value.parse::<u64>().unwrap_or_else(|_| {
        error!("Invalid step limit: '{}' is not a valid number", value);
        process::exit(1)
    })
}

const USAGE: &str = "\
Stack VM Runner

USAGE:
    {program} <program.bm> [OPTIONS]

ARGS:
    <program.bm>    Binary program file to execute

OPTIONS:
    -l, --limit <N>    Step budget (defaults to $STACKVM_EXECUTION_LIMIT, then 69)
    -t, --trace        Dump the stack after every step
    -q, --quiet        Only log errors
    -v, --verbose      Log every executed step
    -h, --help         Print this help message

EXAMPLES:
    # Run with the default budget
    {program} fib.bm

    # Run with a larger budget and trace each step
    {program} fib.bm -l 1000 -t
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
