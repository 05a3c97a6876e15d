use crate::types::encoding::DecodeError;
use stackvm_derive::Error;

/// Errors produced while loading, assembling or executing a program.
///
/// Engine faults are returned by [`Machine::step`](super::vm::Machine::step)
/// and are terminal for the current run; the rest come from the program store
/// and the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    // =========================
    // Engine
    // =========================
    /// Push onto a full stack.
    #[error("stack overflow: capacity of {capacity} values reached")]
    StackOverflow { capacity: usize },
    /// Instruction needs more values than the stack holds.
    #[error("stack underflow: needed {required} value(s), found {available}")]
    StackUnderflow { required: usize, available: usize },
    /// Opcode tag outside the instruction set.
    #[error("illegal instruction: unknown opcode tag {tag} at ip {ip}")]
    IllegalInstruction { tag: u32, ip: i64 },
    /// Instruction pointer outside `0..program_len`.
    #[error("illegal instruction access: ip {ip} outside program of {program_len} instruction(s)")]
    IllegalInstAccess { ip: i64, program_len: usize },
    /// Negative operand where a non-negative offset is required.
    #[error("illegal operand {operand} for {instruction}")]
    IllegalOperand {
        instruction: &'static str,
        operand: i64,
    },
    /// Division with a zero divisor on top of the stack.
    #[error("division by zero")]
    DivByZero,
    /// Step budget ran out before the program halted.
    #[error("step budget of {limit} exhausted before HALT")]
    BudgetExceeded { limit: u64 },
    /// The `PRINT_DEBUG` channel rejected a write.
    #[error("debug output failed: {reason}")]
    DebugOutput { reason: String },

    // =========================
    // Program store
    // =========================
    /// File access failed.
    #[error("io error on {path}: {reason}")]
    Io { path: String, reason: String },
    /// Program image is not a whole number of records.
    #[error("program size {size} is not a multiple of the {record_size}-byte record size")]
    MisalignedProgram { size: usize, record_size: usize },
    /// More instructions than the program store holds. `capacity` is always
    /// `PROGRAM_CAPACITY`; assembled programs must stay strictly below it.
    #[error("program of {count} instructions does not fit the {capacity}-instruction store")]
    ProgramTooLarge { count: usize, capacity: usize },
    /// A record could not be decoded.
    #[error("decoding error: {reason}")]
    Decode { reason: &'static str },

    // =========================
    // Assembler
    // =========================
    /// Unrecognized mnemonic.
    #[error("unknown instruction: {name}")]
    InvalidInstructionName { name: String },
    /// Wrong number of operands for an instruction.
    #[error("{instruction} expects {expected} operand(s), got {actual}")]
    ArityMismatch {
        instruction: String,
        expected: usize,
        actual: usize,
    },
    /// Operand token is neither an integer nor (where allowed) a label.
    #[error("invalid operand: {token}")]
    InvalidOperand { token: String },
    /// Label defined more than once.
    #[error("duplicate label: {label}")]
    DuplicateLabel { label: String },
    /// Reference to a label that is never defined.
    #[error("undefined label: {label}")]
    UndefinedLabel { label: String },
    /// Assembly error with source location.
    #[error("line {line}:{offset}: {source}")]
    AssemblyError {
        line: usize,
        offset: usize,
        source: String,
    },
}

impl VMError {
    /// Symbolic name of the error kind, as printed by the runner.
    pub const fn name(&self) -> &'static str {
        match self {
            VMError::StackOverflow { .. } => "STACK_OVERFLOW",
            VMError::StackUnderflow { .. } => "STACK_UNDERFLOW",
            VMError::IllegalInstruction { .. } => "ILLEGAL_INSTRUCTION",
            VMError::IllegalInstAccess { .. } => "ILLEGAL_INST_ACCESS",
            VMError::IllegalOperand { .. } => "ILLEGAL_OPERAND",
            VMError::DivByZero => "DIV_BY_ZERO",
            VMError::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
            VMError::DebugOutput { .. } => "DEBUG_OUTPUT",
            VMError::Io { .. } => "IO",
            VMError::MisalignedProgram { .. } => "MISALIGNED_PROGRAM",
            VMError::ProgramTooLarge { .. } => "PROGRAM_TOO_LARGE",
            VMError::Decode { .. } => "DECODE",
            VMError::InvalidInstructionName { .. }
            | VMError::ArityMismatch { .. }
            | VMError::InvalidOperand { .. }
            | VMError::DuplicateLabel { .. }
            | VMError::UndefinedLabel { .. }
            | VMError::AssemblyError { .. } => "ASSEMBLY",
        }
    }

    /// Returns true for faults raised by executing an instruction.
    pub const fn is_engine_error(&self) -> bool {
        matches!(
            self,
            VMError::StackOverflow { .. }
                | VMError::StackUnderflow { .. }
                | VMError::IllegalInstruction { .. }
                | VMError::IllegalInstAccess { .. }
                | VMError::IllegalOperand { .. }
                | VMError::DivByZero
                | VMError::DebugOutput { .. }
        )
    }
}

impl From<DecodeError> for VMError {
    fn from(err: DecodeError) -> Self {
        VMError::Decode {
            reason: err.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_interpolates_fields() {
        let err = VMError::StackUnderflow {
            required: 2,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "stack underflow: needed 2 value(s), found 1"
        );
        assert_eq!(VMError::DivByZero.to_string(), "division by zero");
    }

    #[test]
    fn symbolic_names() {
        assert_eq!(VMError::StackOverflow { capacity: 1 }.name(), "STACK_OVERFLOW");
        assert_eq!(
            VMError::IllegalInstAccess {
                ip: 0,
                program_len: 0
            }
            .name(),
            "ILLEGAL_INST_ACCESS"
        );
        assert_eq!(VMError::BudgetExceeded { limit: 69 }.name(), "BUDGET_EXCEEDED");
        assert_eq!(
            VMError::UndefinedLabel {
                label: "loop".into()
            }
            .name(),
            "ASSEMBLY"
        );
    }

    #[test]
    fn budget_is_not_an_engine_fault() {
        assert!(VMError::DivByZero.is_engine_error());
        assert!(!VMError::BudgetExceeded { limit: 1 }.is_engine_error());
        assert!(
            !VMError::Io {
                path: "a.bm".into(),
                reason: "missing".into()
            }
            .is_engine_error()
        );
    }

    #[test]
    fn decode_error_converts() {
        let err: VMError = DecodeError::UnexpectedEof.into();
        assert_eq!(
            err,
            VMError::Decode {
                reason: "unexpected end of input"
            }
        );
    }
}
