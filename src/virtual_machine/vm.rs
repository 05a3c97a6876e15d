//! Core virtual machine implementation.
//!
//! The VM executes a [`Program`] one instruction per [`Machine::step`] using a
//! single fixed-capacity operand stack of [`Word`]s. All arithmetic uses
//! wrapping semantics to prevent overflow panics.
//!
//! Every handler validates before it mutates, so a failing step leaves the
//! stack and instruction pointer exactly as they were.

mod stack;

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Opcode, Word};
use crate::virtual_machine::program::{Instruction, Program};
use stack::Stack;
use std::io::{self, Write};

/// Maximum number of values on the operand stack.
pub const STACK_CAPACITY: usize = 1024;

/// Default step budget used by the runner when none is configured.
pub const EXECUTION_LIMIT: u64 = 69;

/// Destination for values popped by `PRINT_DEBUG`.
pub trait DebugSink {
    fn emit(&mut self, value: Word) -> io::Result<()>;
}

/// Writes each value on its own line to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stdout;

impl DebugSink for Stdout {
    fn emit(&mut self, value: Word) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{value}")
    }
}

/// Collects emitted values in order.
impl DebugSink for Vec<Word> {
    fn emit(&mut self, value: Word) -> io::Result<()> {
        self.push(value);
        Ok(())
    }
}

/// Lifecycle of a run.
///
/// ```text
/// Ready -> Running -> { Halted, Failed(kind), BudgetExceeded }
/// ```
///
/// The three right-hand states are terminal until the machine is reset or
/// given a new program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Ready,
    Running,
    Halted,
    Failed(VMError),
    BudgetExceeded,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Halted | RunState::Failed(_) | RunState::BudgetExceeded
        )
    }
}

/// Stack machine executing a loaded [`Program`].
///
/// Each machine owns its program, stack and debug sink outright; run several
/// programs concurrently by giving each its own machine.
pub struct Machine<D: DebugSink = Stdout> {
    /// Instructions being executed.
    program: Program,
    /// Operand stack.
    stack: Stack,
    /// Index of the next instruction. Signed so that a jump to a negative
    /// target is reported at the next fetch instead of being truncated.
    ip: Word,
    /// Set by `HALT`.
    halted: bool,
    state: RunState,
    /// Fuel of the run that ended in [`RunState::BudgetExceeded`].
    exhausted_limit: u64,
    sink: D,
}

impl Machine<Stdout> {
    /// Creates a machine that prints debug output to standard output.
    pub fn new(program: Program) -> Self {
        Self::with_sink(program, Stdout)
    }
}

impl<D: DebugSink> Machine<D> {
    /// Creates a machine that sends `PRINT_DEBUG` values to `sink`.
    pub fn with_sink(program: Program, sink: D) -> Self {
        Self {
            program,
            stack: Stack::new(STACK_CAPACITY),
            ip: 0,
            halted: false,
            state: RunState::Ready,
            exhausted_limit: 0,
            sink,
        }
    }

    /// Replaces the program and returns the machine to [`RunState::Ready`].
    pub fn load_program(&mut self, program: Program) {
        self.program = program;
        self.reset();
    }

    /// Clears the stack, instruction pointer and halt flag, keeping the program.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.ip = 0;
        self.halted = false;
        self.state = RunState::Ready;
        self.exhausted_limit = 0;
    }

    pub fn stack(&self) -> &[Word] {
        self.stack.as_slice()
    }

    pub fn ip(&self) -> Word {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Writes the stack bottom to top, one value per line.
    pub fn dump_stack<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Stack:")?;
        if self.stack.len() == 0 {
            return writeln!(out, "  [empty]");
        }
        for value in self.stack.as_slice() {
            writeln!(out, "  {value}")?;
        }
        Ok(())
    }

    /// Executes exactly one instruction.
    ///
    /// On error nothing is committed and the state becomes
    /// [`RunState::Failed`]. A machine in a terminal state is not stepped; its
    /// recorded outcome is returned instead.
    pub fn step(&mut self) -> Result<(), VMError> {
        if let Some(outcome) = self.outcome() {
            return outcome;
        }

        match self.exec() {
            Ok(()) => {
                self.state = if self.halted {
                    RunState::Halted
                } else {
                    RunState::Running
                };
                Ok(())
            }
            Err(err) => {
                self.state = RunState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Steps until `HALT`, an error, or `fuel` steps have executed.
    ///
    /// Returns `Ok(())` only if the machine halted. Running out of fuel yields
    /// [`VMError::BudgetExceeded`]. A machine already in a terminal state
    /// returns its recorded outcome without stepping.
    pub fn run(&mut self, fuel: u64) -> Result<(), VMError> {
        self.run_traced(fuel, |_| {})
    }

    /// Like [`run`](Machine::run), calling `on_step` after every successful step.
    pub fn run_traced<F>(&mut self, fuel: u64, mut on_step: F) -> Result<(), VMError>
    where
        F: FnMut(&Self),
    {
        if let Some(outcome) = self.outcome() {
            return outcome;
        }

        for _ in 0..fuel {
            self.step()?;
            on_step(&*self);
            if self.halted {
                return Ok(());
            }
        }

        self.state = RunState::BudgetExceeded;
        self.exhausted_limit = fuel;
        Err(VMError::BudgetExceeded { limit: fuel })
    }

    /// Result recorded for a terminal state, `None` while the run can continue.
    fn outcome(&self) -> Option<Result<(), VMError>> {
        match &self.state {
            RunState::Ready | RunState::Running => None,
            RunState::Halted => Some(Ok(())),
            RunState::Failed(err) => Some(Err(err.clone())),
            RunState::BudgetExceeded => Some(Err(VMError::BudgetExceeded {
                limit: self.exhausted_limit,
            })),
        }
    }

    /// Returns the instruction at `ip`, bounds-checked against the program.
    fn fetch(&self) -> Result<Instruction, VMError> {
        usize::try_from(self.ip)
            .ok()
            .and_then(|index| self.program.get(index))
            .copied()
            .ok_or(VMError::IllegalInstAccess {
                ip: self.ip,
                program_len: self.program.len(),
            })
    }

    fn exec(&mut self) -> Result<(), VMError> {
        let instruction = self.fetch()?;
        let opcode = instruction
            .opcode()
            .map_err(|_| VMError::IllegalInstruction {
                tag: instruction.tag(),
                ip: self.ip,
            })?;
        let instr = opcode.mnemonic();
        let operand = instruction.operand();

        match opcode {
            Opcode::Nop => self.op_nop(instr),
            Opcode::Push => self.op_push(instr, operand),
            Opcode::Dup => self.op_dup(instr, operand),
            Opcode::Plus => self.op_arith(instr, Word::wrapping_add),
            Opcode::Minus => self.op_arith(instr, Word::wrapping_sub),
            Opcode::Mult => self.op_arith(instr, Word::wrapping_mul),
            Opcode::Div => self.op_div(instr),
            Opcode::Jmp => self.op_jmp(instr, operand),
            Opcode::Eq => self.op_eq(instr),
            Opcode::JmpIf => self.op_jmp_if(instr, operand),
            Opcode::Halt => self.op_halt(instr),
            Opcode::PrintDebug => self.op_print_debug(instr),
        }
    }

    fn advance(&mut self) {
        self.ip = self.ip.wrapping_add(1);
    }

    /// Pops `b` then `a` and pushes `f(a, b)`. Callers have already checked
    /// that two values are present.
    fn combine(&mut self, f: impl FnOnce(Word, Word) -> Word) -> Result<(), VMError> {
        let b = self.stack.pop()?;
        let a = self.stack.peek(0)?;
        self.stack.set_top(f(a, b))
    }

    fn op_nop(&mut self, _instr: &'static str) -> Result<(), VMError> {
        self.advance();
        Ok(())
    }

    fn op_push(&mut self, _instr: &'static str, value: Word) -> Result<(), VMError> {
        self.stack.push(value)?;
        self.advance();
        Ok(())
    }

    fn op_dup(&mut self, instr: &'static str, depth: Word) -> Result<(), VMError> {
        let Ok(depth) = usize::try_from(depth) else {
            return Err(VMError::IllegalOperand {
                instruction: instr,
                operand: depth,
            });
        };
        let value = self.stack.peek(depth)?;
        self.stack.push(value)?;
        self.advance();
        Ok(())
    }

    fn op_arith(
        &mut self,
        _instr: &'static str,
        f: fn(Word, Word) -> Word,
    ) -> Result<(), VMError> {
        self.stack.require(2)?;
        self.combine(f)?;
        self.advance();
        Ok(())
    }

    fn op_div(&mut self, _instr: &'static str) -> Result<(), VMError> {
        self.stack.require(2)?;
        if self.stack.peek(0)? == 0 {
            return Err(VMError::DivByZero);
        }
        self.combine(Word::wrapping_div)?;
        self.advance();
        Ok(())
    }

    fn op_eq(&mut self, _instr: &'static str) -> Result<(), VMError> {
        self.stack.require(2)?;
        self.combine(|a, b| Word::from(a == b))?;
        self.advance();
        Ok(())
    }

    fn op_jmp(&mut self, _instr: &'static str, target: Word) -> Result<(), VMError> {
        self.ip = target;
        Ok(())
    }

    fn op_jmp_if(&mut self, _instr: &'static str, target: Word) -> Result<(), VMError> {
        let cond = self.stack.pop()?;
        if cond != 0 {
            self.ip = target;
        } else {
            self.advance();
        }
        Ok(())
    }

    fn op_halt(&mut self, _instr: &'static str) -> Result<(), VMError> {
        self.halted = true;
        Ok(())
    }

    fn op_print_debug(&mut self, _instr: &'static str) -> Result<(), VMError> {
        let value = self.stack.peek(0)?;
        self.sink
            .emit(value)
            .map_err(|e| VMError::DebugOutput {
                reason: e.to_string(),
            })?;
        self.stack.pop()?;
        self.advance();
        Ok(())
    }
}
