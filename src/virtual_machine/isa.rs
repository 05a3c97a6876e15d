//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction table and invokes a callback macro with it, so every
//! module that needs per-opcode code generates it from the same list.
//!
//! This module generates:
//! - The [`Opcode`] enum with its numeric tags
//! - `TryFrom<u32>` for decoding tags read from a program file
//! - [`Opcode::mnemonic`] and [`Opcode::operand_kind`]
//!
//! See [`assembler`](super::assembler) for the mnemonic parser generated from
//! the same table.
//!
//! # Tags
//!
//! Tags are assigned in declaration order starting at zero and are part of the
//! program file format: renumbering an entry breaks every existing file. The
//! `isa_static_check` test pins the table.

use crate::virtual_machine::errors::VMError;

/// The machine's only value type: stack entries, literals and addresses.
pub type Word = i64;

/// How an instruction's operand is interpreted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    /// Literal value (`PUSH`) or stack depth (`DUP`).
    Imm,
    /// Absolute instruction index; the assembler also accepts a label.
    Addr,
}

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            /// NOP ; ip += 1
            Nop = 0, "NOP" => [],
            /// PUSH value ; push value
            Push = 1, "PUSH" => [value: Imm],
            /// DUP k ; push a copy of the value k entries below the top (0 = top)
            Dup = 2, "DUP" => [depth: Imm],
            /// PLUS ; pop b, pop a, push a + b
            Plus = 3, "PLUS" => [],
            /// MINUS ; pop b, pop a, push a - b
            Minus = 4, "MINUS" => [],
            /// MULT ; pop b, pop a, push a * b
            Mult = 5, "MULT" => [],
            /// DIV ; pop b, pop a, push a / b (truncating, trap on b == 0)
            Div = 6, "DIV" => [],
            /// JMP target ; ip = target
            Jmp = 7, "JMP" => [target: Addr],
            /// EQ ; pop b, pop a, push 1 if a == b else 0
            Eq = 8, "EQ" => [],
            /// JMP_IF target ; pop c, ip = target if c != 0
            JmpIf = 9, "JMP_IF" => [target: Addr],
            /// HALT ; stop, ip unchanged
            Halt = 10, "HALT" => [],
            /// PRINT_DEBUG ; pop top and write it to the debug channel
            PrintDebug = 11, "PRINT_DEBUG" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $tag:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// Instruction opcodes; the discriminant is the tag stored in program files.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u32)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $tag,
            )*
        }

        /// Decodes a raw tag. The returned error carries `ip: 0`; the engine
        /// replaces it with the faulting instruction pointer.
        impl TryFrom<u32> for Opcode {
            type Error = VMError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                match value {
                    $( $tag => Ok(Opcode::$name), )*
                    _ => Err(VMError::IllegalInstruction { tag: value, ip: 0 }),
                }
            }
        }

        impl Opcode {
            /// Every opcode in tag order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the operand interpretation, or `None` if the operand is ignored.
            pub const fn operand_kind(&self) -> Option<OperandKind> {
                match self {
                    $( Opcode::$name => $crate::define_instructions!(@kind $( $kind )*), )*
                }
            }

            /// Returns the numeric tag written to program files.
            pub const fn tag(&self) -> u32 {
                *self as u32
            }
        }
    };

    (@kind) => { None };
    (@kind $kind:ident) => { Some(OperandKind::$kind) };
}

for_each_instruction!(define_instructions);

impl Opcode {
    /// Returns true if the instruction reads its operand.
    pub const fn takes_operand(&self) -> bool {
        self.operand_kind().is_some()
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_follow_declaration_order() {
        for (index, opcode) in Opcode::ALL.iter().enumerate() {
            assert_eq!(opcode.tag() as usize, index);
            assert_eq!(Opcode::try_from(opcode.tag()).unwrap(), *opcode);
        }
        assert_eq!(Opcode::ALL.len(), 12);
    }

    #[test]
    fn opcode_try_from_invalid() {
        assert!(matches!(
            Opcode::try_from(12),
            Err(VMError::IllegalInstruction { tag: 12, .. })
        ));
        assert!(matches!(
            Opcode::try_from(u32::MAX),
            Err(VMError::IllegalInstruction { tag: u32::MAX, .. })
        ));
    }

    #[test]
    fn operand_kinds() {
        assert_eq!(Opcode::Push.operand_kind(), Some(OperandKind::Imm));
        assert_eq!(Opcode::Dup.operand_kind(), Some(OperandKind::Imm));
        assert_eq!(Opcode::Jmp.operand_kind(), Some(OperandKind::Addr));
        assert_eq!(Opcode::JmpIf.operand_kind(), Some(OperandKind::Addr));
        assert!(!Opcode::Plus.takes_operand());
        assert!(!Opcode::Halt.takes_operand());
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Opcode::JmpIf.mnemonic(), "JMP_IF");
        assert_eq!(Opcode::PrintDebug.to_string(), "PRINT_DEBUG");
    }
}
