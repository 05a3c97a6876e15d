//! VM benchmark binary.
//!
//! Measures execution time for representative programs.
//! Run with: `cargo run --release --bin bench`

use std::io;
use std::time::{Duration, Instant};

use stackvm::virtual_machine::assembler::assemble_source;
use stackvm::virtual_machine::isa::Word;
use stackvm::virtual_machine::program::{Instruction, PROGRAM_CAPACITY, Program};
use stackvm::virtual_machine::vm::{DebugSink, Machine};

/// Discards `PRINT_DEBUG` output so the benchmark measures the engine alone.
struct NullSink;

impl DebugSink for NullSink {
    fn emit(&mut self, _value: Word) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Benchmark harness
// ---------------------------------------------------------------------------

struct BenchResult {
    name: &'static str,
    iterations: u64,
    total: Duration,
    /// Steps executed by the last run (0 to omit per-step columns).
    steps: u64,
}

impl BenchResult {
    fn avg(&self) -> Duration {
        self.total / self.iterations as u32
    }

    fn print(&self) {
        let ns_per_op = self.avg().as_nanos();
        let (ns_per_step, msteps_per_sec) = if self.steps > 0 {
            let ns = ns_per_op as f64 / self.steps as f64;
            (format!("{:>8.2}", ns), format!("{:>8.1}", 1_000.0 / ns))
        } else {
            ("       -".to_string(), "       -".to_string())
        };
        println!(
            "  {:<24} {:>7} iters {:>10.3} us/iter {:>9} steps {} ns/step {} Msteps/s",
            self.name,
            self.iterations,
            ns_per_op as f64 / 1000.0,
            self.steps,
            ns_per_step,
            msteps_per_sec,
        );
    }
}

/// Runs `f` for at least `min_duration`, returning aggregated results.
fn bench<F>(name: &'static str, min_duration: Duration, mut f: F) -> BenchResult
where
    F: FnMut() -> u64,
{
    // Warmup
    for _ in 0..5 {
        f();
    }

    let mut iterations = 0u64;
    let mut last_steps = 0u64;
    let start = Instant::now();
    while start.elapsed() < min_duration {
        last_steps = f();
        iterations += 1;
    }
    let total = start.elapsed();

    BenchResult {
        name,
        iterations,
        total,
        steps: last_steps,
    }
}

/// Runs `program` on a fresh machine, returning the number of steps executed.
///
/// `expect_halt` distinguishes programs that finish from ones that are meant
/// to exhaust `fuel`.
fn execute(program: &Program, fuel: u64, expect_halt: bool) -> u64 {
    let mut vm = Machine::with_sink(program.clone(), NullSink);
    let mut steps = 0u64;
    let result = vm.run_traced(fuel, |_| steps += 1);
    assert_eq!(result.is_ok(), expect_halt, "unexpected outcome: {result:?}");
    steps
}

// ---------------------------------------------------------------------------
// Benchmark definitions
// ---------------------------------------------------------------------------

const COUNTDOWN_ASM: &str = r#"
    PUSH 100000
loop:
    PUSH -1
    PLUS
    DUP 0
    JMP_IF loop
    HALT
"#;

const ARITHMETIC_MIX_ASM: &str = r#"
    PUSH 10000
loop:
    PUSH 7
    PUSH 3
    MULT
    PUSH 2
    DIV
    PUSH 1
    MINUS
    PUSH 5
    EQ
    JMP_IF loop     # never taken; pops the comparison
    PUSH -1
    PLUS
    DUP 0
    JMP_IF loop
    HALT
"#;

const DEBUG_OUTPUT_ASM: &str = r#"
    PUSH 50000
loop:
    DUP 0
    PRINT_DEBUG
    PUSH -1
    PLUS
    DUP 0
    JMP_IF loop
    HALT
"#;

const FIBONACCI_ASM: &str = r#"
    PUSH 0
    PUSH 1
loop:
    DUP 1
    DUP 1
    PLUS
    JMP loop
"#;

/// Fibonacci grows the stack by one value every four steps; stay below capacity.
const FIBONACCI_FUEL: u64 = 4000;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let min = Duration::from_secs(2);

    println!("VM Benchmarks (each runs for >= 2s)\n");
    println!(
        "  {:<24} {:>7}       {:>14} {:>15} {:>16} {:>17}",
        "benchmark", "iters", "avg time", "steps/run", "ns/step", "Msteps/s"
    );
    println!("  {}", "-".repeat(100));

    // Pre-assemble programs (assembly cost excluded from benchmark)
    let countdown = assemble_source(COUNTDOWN_ASM).expect("asm");
    let arith = assemble_source(ARITHMETIC_MIX_ASM).expect("asm");
    let debug_output = assemble_source(DEBUG_OUTPUT_ASM).expect("asm");
    let fibonacci = assemble_source(FIBONACCI_ASM).expect("asm");

    // 1. Tight countdown loop
    let r = bench("countdown(100K)", min, || execute(&countdown, u64::MAX, true));
    r.print();

    // 2. Arithmetic mix
    let r = bench("arithmetic_mix(10K)", min, || execute(&arith, u64::MAX, true));
    r.print();

    // 3. PRINT_DEBUG into a discarding sink
    let r = bench("print_debug(50K)", min, || {
        execute(&debug_output, u64::MAX, true)
    });
    r.print();

    // 4. Fibonacci until the budget runs out
    let r = bench("fibonacci(budget 4000)", min, || {
        execute(&fibonacci, FIBONACCI_FUEL, false)
    });
    r.print();

    // 5. Decoding a full program image
    let image = Program::from_instructions(&vec![Instruction::push(1); PROGRAM_CAPACITY - 1]).to_bytes();
    let r = bench("decode(1023 records)", min, || {
        let program = Program::from_bytes(&image).expect("decode");
        assert_eq!(program.len(), PROGRAM_CAPACITY - 1);
        0
    });
    r.print();
}
