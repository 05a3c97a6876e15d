//! Stack virtual machine library.
//!
//! Provides the instruction set, the fixed-width binary program format, the
//! execution engine and a small text assembler.

pub mod types;
pub mod utils;
pub mod virtual_machine;
