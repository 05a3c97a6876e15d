//! Program store: a bounded sequence of fixed-size instruction records.
//!
//! # File format
//!
//! A program file is the concatenation of its instruction records, with no
//! header. Each record is [`RECORD_SIZE`] bytes:
//!
//! ```text
//! +----------------+--------------------------+
//! | tag: u32 (LE)  | operand: i64 (LE)        |
//! +----------------+--------------------------+
//! ```
//!
//! Tags are not validated on load. A record with an unknown tag fails with
//! `ILLEGAL_INSTRUCTION` only if the machine reaches it.

use crate::types::encoding::{Decode, Encode};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Opcode, Word};
use stackvm_derive::BinaryCodec;
use std::fmt;
use std::fs;
use std::path::Path;

/// Maximum number of instructions a program may hold.
pub const PROGRAM_CAPACITY: usize = 1024;

/// Size in bytes of one encoded instruction record.
pub const RECORD_SIZE: usize = 12;

/// A single instruction: an opcode tag plus one operand slot.
///
/// Instructions without an operand carry it anyway (conventionally zero) and
/// the engine ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinaryCodec)]
pub struct Instruction {
    tag: u32,
    operand: Word,
}

impl Instruction {
    pub const fn new(opcode: Opcode, operand: Word) -> Self {
        Self {
            tag: opcode as u32,
            operand,
        }
    }

    /// Builds a record from a raw tag, which need not name a valid opcode.
    pub const fn from_raw(tag: u32, operand: Word) -> Self {
        Self { tag, operand }
    }

    pub const fn push(value: Word) -> Self {
        Self::new(Opcode::Push, value)
    }

    pub const fn dup(depth: Word) -> Self {
        Self::new(Opcode::Dup, depth)
    }

    pub const fn jmp(target: Word) -> Self {
        Self::new(Opcode::Jmp, target)
    }

    pub const fn jmp_if(target: Word) -> Self {
        Self::new(Opcode::JmpIf, target)
    }

    /// Decodes the tag. The error's `ip` is zero; see [`Opcode`]'s `TryFrom`.
    pub fn opcode(&self) -> Result<Opcode, VMError> {
        Opcode::try_from(self.tag)
    }

    pub const fn tag(&self) -> u32 {
        self.tag
    }

    pub const fn operand(&self) -> Word {
        self.operand
    }
}

impl From<Opcode> for Instruction {
    fn from(opcode: Opcode) -> Self {
        Self::new(opcode, 0)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Ok(opcode) if opcode.takes_operand() => write!(f, "{} {}", opcode, self.operand),
            Ok(opcode) => write!(f, "{opcode}"),
            Err(_) => write!(f, "<illegal {}>", self.tag),
        }
    }
}

/// A loaded program, at most [`PROGRAM_CAPACITY`] instructions long.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Copies instructions from memory into a new program.
    ///
    /// # Panics
    ///
    /// Panics if `instructions.len() >= PROGRAM_CAPACITY`. Callers holding
    /// untrusted input should go through [`Program::from_bytes`] or the
    /// assembler, which report the condition as an error.
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        assert!(
            instructions.len() < PROGRAM_CAPACITY,
            "program of {} instructions does not fit capacity {}",
            instructions.len(),
            PROGRAM_CAPACITY
        );
        Self {
            instructions: instructions.to_vec(),
        }
    }

    /// Decodes a program image. Opcode tags are not checked.
    pub fn from_bytes(data: &[u8]) -> Result<Self, VMError> {
        if data.len() % RECORD_SIZE != 0 {
            return Err(VMError::MisalignedProgram {
                size: data.len(),
                record_size: RECORD_SIZE,
            });
        }

        let count = data.len() / RECORD_SIZE;
        if count > PROGRAM_CAPACITY {
            return Err(VMError::ProgramTooLarge {
                count,
                capacity: PROGRAM_CAPACITY,
            });
        }

        let instructions = data
            .chunks_exact(RECORD_SIZE)
            .map(Instruction::from_bytes)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { instructions })
    }

    /// Encodes the program as concatenated records.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.instructions.len() * RECORD_SIZE);
        for instruction in &self.instructions {
            instruction.encode(&mut out);
        }
        out
    }

    /// Reads and decodes a whole program file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let path_ref = path.as_ref();
        let data = fs::read(path_ref).map_err(|e| VMError::Io {
            path: path_ref.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(&data)
    }

    /// Writes the program image to `path`, replacing any existing file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let path_ref = path.as_ref();
        fs::write(path_ref, self.to_bytes()).map_err(|e| VMError::Io {
            path: path_ref.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}
