//! Stack-based bytecode virtual machine.
//!
//! The VM executes programs made of fixed-size instruction records against a
//! single bounded operand stack of signed 64-bit words.
//!
//! # Architecture
//!
//! - **Stack**: up to [`vm::STACK_CAPACITY`] words; the only data store
//! - **Instruction format**: one opcode tag plus one operand per instruction
//! - **Execution model**: one instruction per step, driven by a fuel-bounded
//!   run loop; errors are returned, never recovered from internally
//! - **Failure atomicity**: a failing step commits no change
//!
//! # Modules
//!
//! - [`assembler`]: Assembly parsing and diagnostics
//! - [`errors`]: Load, assembly and execution error types
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`program`]: Program store and binary file format
//! - [`vm`]: Execution engine

pub mod assembler;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod program;
pub mod vm;
