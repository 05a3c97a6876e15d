//! Assembly language parser.
//!
//! Converts human-readable assembly source into a [`Program`].
//! Uses [`for_each_instruction!`](crate::for_each_instruction) to generate
//! `parse_instruction` from the instruction table.
//!
//! # Syntax
//!
//! ```text
//! label: INSTRUCTION operand  # optional comment
//! ```
//!
//! - Instructions are uppercase (e.g., `PUSH`, `JMP_IF`)
//! - Immediates are decimal integers (e.g., `42`, `-1`)
//! - Jump targets are an absolute instruction index or a label name
//! - `name:` defines a label at the index of the next instruction
//! - Comments start with `#`
//! - Commas between tokens are ignored
//!
//! # Example
//!
//! ```text
//!     PUSH 0
//!     PUSH 1
//! loop:
//!     DUP 1
//!     DUP 1
//!     PLUS
//!     JMP loop
//! ```

use crate::for_each_instruction;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Opcode, Word};
use crate::virtual_machine::program::{Instruction, PROGRAM_CAPACITY, Program};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const LABEL_SUFFIX: char = ':';

/// Formats a compiler-style diagnostic for an assembly failure.
///
/// Located errors ([`VMError::AssemblyError`]) quote the offending source line
/// and point at the column; anything else renders as a single `error:` line.
pub fn render_assembly_diagnostic(file: &str, source: &str, err: &VMError) -> String {
    let VMError::AssemblyError {
        line,
        offset,
        source: message,
    } = err
    else {
        return format!("error: {err}\n");
    };

    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "     |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "     | {}^", underline);
    }

    diag
}

/// Label table built during the first pass.
#[derive(Debug, Default)]
struct AsmContext {
    /// Label name to absolute instruction index.
    labels: HashMap<String, usize>,
}

impl AsmContext {
    fn new() -> Self {
        Self::default()
    }

    /// Registers a label at the given instruction index.
    fn define_label(&mut self, name: &str, index: usize) -> Result<(), VMError> {
        if !is_identifier(name) {
            return Err(VMError::InvalidOperand {
                token: format!("{name}{LABEL_SUFFIX}"),
            });
        }
        if self.labels.contains_key(name) {
            return Err(VMError::DuplicateLabel {
                label: name.to_string(),
            });
        }
        self.labels.insert(name.to_string(), index);
        Ok(())
    }

    /// Resolves a label to its instruction index.
    fn resolve_label(&self, name: &str) -> Result<usize, VMError> {
        self.labels
            .get(name)
            .copied()
            .ok_or(VMError::UndefinedLabel {
                label: name.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column offset in the line.
    offset: usize,
}

/// Tokenize a single line of assembly.
///
/// Rules:
/// - `#` starts a comment
/// - commas are ignored
/// - whitespace-separated tokens
fn tokenize(line: &str) -> Vec<Token<'_>> {
    let code = line.split(COMMENT_CHAR).next().unwrap_or("");
    let mut out = Vec::with_capacity(4);
    let mut start: Option<usize> = None;

    for (i, c) in code.char_indices() {
        if c.is_whitespace() || c == ',' {
            if let Some(s) = start.take() {
                out.push(Token {
                    text: &code[s..i],
                    offset: s + 1,
                });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }

    if let Some(s) = start {
        out.push(Token {
            text: &code[s..],
            offset: s + 1,
        });
    }

    out
}

/// Wraps an error with its source location.
fn located(line: usize, offset: usize) -> impl FnOnce(VMError) -> VMError {
    move |err| VMError::AssemblyError {
        line,
        offset,
        source: err.to_string(),
    }
}

/// Checks if a token is a label definition (ends with `:`)
fn is_label_def(tok: &str) -> bool {
    tok.ends_with(LABEL_SUFFIX) && tok.len() > 1
}

/// Extracts the label name from a label definition token.
fn label_name(tok: &str) -> &str {
    &tok[..tok.len() - 1]
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a decimal immediate.
fn parse_word(tok: &str) -> Result<Word, VMError> {
    tok.parse::<Word>().map_err(|_| VMError::InvalidOperand {
        token: tok.to_string(),
    })
}

/// Parses an absolute instruction index or a label reference.
fn parse_word_or_label(tok: &str, ctx: &AsmContext) -> Result<Word, VMError> {
    if let Ok(v) = tok.parse::<Word>() {
        return Ok(v);
    }
    if !is_identifier(tok) {
        return Err(VMError::InvalidOperand {
            token: tok.to_string(),
        });
    }
    let index = ctx.resolve_label(tok)?;
    Ok(index as Word)
}

macro_rules! define_parse_instruction {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $tag:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        fn opcode_from_str(name: &str) -> Result<Opcode, VMError> {
            match name {
                $( $mnemonic => Ok(Opcode::$name), )*
                _ => Err(VMError::InvalidInstructionName {
                    name: name.to_string(),
                }),
            }
        }

        /// Parse one instruction from the tokens of source line `line`.
        ///
        /// Errors point at the mnemonic, or at the operand that failed to parse.
        fn parse_instruction(
            ctx: &AsmContext,
            line: usize,
            tokens: &[Token],
        ) -> Result<Instruction, VMError> {
            let head = tokens[0];
            let opcode = opcode_from_str(head.text).map_err(located(line, head.offset))?;

            match opcode {
                $(
                    Opcode::$name => {
                        const EXPECTED: usize = 0 $( + define_parse_instruction!(@one $field) )*;
                        if tokens.len() - 1 != EXPECTED {
                            return Err(located(line, head.offset)(VMError::ArityMismatch {
                                instruction: head.text.to_string(),
                                expected: EXPECTED,
                                actual: tokens.len() - 1,
                            }));
                        }

                        define_parse_instruction!(
                            @construct ctx line tokens; $name $( $field : $kind ),*
                        )
                    }
                )*
            }
        }
    };

    (@one $x:ident) => { 1usize };

    (@construct $ctx:ident $line:ident $tokens:ident; $name:ident) => {
        Ok(Instruction::from(Opcode::$name))
    };

    (@construct $ctx:ident $line:ident $tokens:ident; $name:ident $field:ident : $kind:ident) => {{
        let tok = $tokens[1];
        let $field = define_parse_instruction!(@parse_operand $kind, tok.text, $ctx)
            .map_err(located($line, tok.offset))?;
        Ok(Instruction::new(Opcode::$name, $field))
    }};

    (@parse_operand Imm, $tok:expr, $ctx:expr) => {
        parse_word($tok)
    };

    (@parse_operand Addr, $tok:expr, $ctx:expr) => {
        parse_word_or_label($tok, $ctx)
    };
}

for_each_instruction!(define_parse_instruction);

/// Assemble a full source string into a program.
///
/// Uses two-pass assembly:
/// 1. First pass: tokenize lines and record label positions
/// 2. Second pass: parse instructions with label resolution
pub fn assemble_source(source: &str) -> Result<Program, VMError> {
    let mut ctx = AsmContext::new();

    // First pass: (line_no, tokens) for every line carrying an instruction
    let mut parsed_lines: Vec<(usize, Vec<Token>)> = Vec::new();

    for (line_no, line) in source.lines().enumerate() {
        let line_no = line_no + 1;
        let mut tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        if is_label_def(tokens[0].text) {
            let label = tokens.remove(0);
            ctx.define_label(label_name(label.text), parsed_lines.len())
                .map_err(located(line_no, label.offset))?;
        }

        if !tokens.is_empty() {
            parsed_lines.push((line_no, tokens));
        }
    }

    if parsed_lines.len() >= PROGRAM_CAPACITY {
        return Err(VMError::ProgramTooLarge {
            count: parsed_lines.len(),
            capacity: PROGRAM_CAPACITY,
        });
    }

    // Second pass: parse instructions
    let instructions = parsed_lines
        .iter()
        .map(|(line_no, tokens)| parse_instruction(&ctx, *line_no, tokens))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Program::from_instructions(&instructions))
}

/// Convenience: assemble directly from file path
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::Io {
        path: path_ref.display().to_string(),
        reason: e.to_string(),
    })?;
    assemble_source(&source)
}
