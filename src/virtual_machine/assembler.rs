//! Assembly language parser.
//!
//! Converts source text into a [`Program`]. Every source line holds at most one instruction,
//! and the line number it was written on is kept with it: jumps target source lines, so blank
//! and comment lines still consume a number.
//!
//! # Syntax
//!
//! ```text
//! mnemonic [dst] [operand] [operand]   # optional comment
//! ```
//!
//! - Mnemonics are lowercase and case-sensitive (`mov`, `add`, `jmp`)
//! - User registers use the `r` prefix (`r0`, `r15`)
//! - `sp` is the stack pointer, `ra` the return address
//! - Device registers are `d<slot>:<register>` (`d0:1`)
//! - Literals are decimal, optionally signed and fractional (`3`, `-1.5`)
//! - `#` starts a comment unless escaped as `\#`
//! - Commas between operands are optional
//!
//! Assembly stops at the first bad line; there is no partial program.

use crate::virtual_machine::errors::{AssemblyError, AssemblyErrorKind};
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::isa::{Operation, Shape};
use crate::virtual_machine::operand::{
    DEVICE_MARKER, DEVICE_SEPARATOR, DeviceAddress, Destination, Operand, REGISTER_MARKER,
    RETURN_ADDRESS, STACK_POINTER,
};
use crate::virtual_machine::program::Program;
use std::fmt::Write;

const COMMENT_CHAR: char = '#';
const ESCAPE_CHAR: char = '\\';

/// Memory-block mnemonics this processor recognises but does not implement.
const UNSUPPORTED_MNEMONICS: &[&str] = &["alloc", "free", "load", "store"];

/// Formats a compiler-style diagnostic for an assembly failure.
///
/// ```text
/// error: syntax error: unknown mnemonic `foo`
///  --> prog.asm:3:1
///      |
///    3 | foo r0 1
///      | ^
/// ```
pub fn render_assembly_diagnostic(file: &str, err: &AssemblyError) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {}: {}", err.kind, err.message);
    let _ = writeln!(diag, " --> {file}:{}:{}", err.line, err.column);

    let line_text = err.text.trim_end_matches('\r');
    let underline = " ".repeat(err.column.saturating_sub(1));
    let _ = writeln!(diag, "     |");
    let _ = writeln!(diag, "{:>4} | {}", err.line, line_text);
    let _ = writeln!(diag, "     | {}^", underline);

    diag
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column in the raw line.
    column: usize,
}

/// Position context for building errors while parsing one line.
struct LineContext<'a> {
    line: usize,
    raw: &'a str,
}

impl LineContext<'_> {
    fn error(&self, kind: AssemblyErrorKind, column: usize, message: String) -> AssemblyError {
        AssemblyError {
            kind,
            line: self.line,
            column,
            message,
            text: self.raw.to_string(),
        }
    }

    fn syntax(&self, column: usize, message: String) -> AssemblyError {
        self.error(AssemblyErrorKind::SyntaxError, column, message)
    }
}

/// Cuts `line` at the first `#` that is not preceded by `\`.
fn strip_comment(line: &str) -> &str {
    let mut prev = None;
    for (i, c) in line.char_indices() {
        if c == COMMENT_CHAR && prev != Some(ESCAPE_CHAR) {
            return &line[..i];
        }
        prev = Some(c);
    }
    line
}

/// Splits a comment-free line on whitespace and commas.
fn tokenize(code: &str) -> Vec<Token<'_>> {
    let mut out = Vec::with_capacity(4);
    let mut start: Option<(usize, usize)> = None;

    for (column, (i, c)) in code.char_indices().enumerate() {
        let separator = c == ',' || c.is_whitespace();
        match (separator, start) {
            (true, Some((s, col))) => {
                out.push(Token {
                    text: &code[s..i],
                    column: col,
                });
                start = None;
            }
            (false, None) => start = Some((i, column + 1)),
            _ => {}
        }
    }
    if let Some((s, col)) = start {
        out.push(Token {
            text: &code[s..],
            column: col,
        });
    }
    out
}

/// Parses a non-negative decimal index: digits only, no sign.
fn parse_index<T: std::str::FromStr>(digits: &str) -> Option<T> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parse a register token like `r0`, `r15`.
pub(crate) fn parse_register(tok: &str) -> Option<u32> {
    parse_index(tok.strip_prefix(REGISTER_MARKER)?)
}

/// Parse a device register token like `d0:1`.
pub(crate) fn parse_device(tok: &str) -> Option<DeviceAddress> {
    let (slot, register) = tok
        .strip_prefix(DEVICE_MARKER)?
        .split_once(DEVICE_SEPARATOR)?;
    Some(DeviceAddress::new(parse_index(slot)?, parse_index(register)?))
}

/// Parse a decimal literal: optional sign, digits, optional `.digits`.
///
/// Exponents, `inf`, `nan` and values that overflow `f32` are rejected.
pub(crate) fn parse_literal(tok: &str) -> Option<f32> {
    let unsigned = tok.strip_prefix(['-', '+']).unwrap_or(tok);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || fraction.is_some_and(|f| !digits(f)) {
        return None;
    }
    tok.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_destination(ctx: &LineContext<'_>, tok: &Token<'_>) -> Result<Destination, AssemblyError> {
    match tok.text {
        STACK_POINTER => return Ok(Destination::StackPointer),
        RETURN_ADDRESS => return Ok(Destination::ReturnAddress),
        _ => {}
    }
    if let Some(index) = parse_register(tok.text) {
        return Ok(Destination::Register(index));
    }
    if let Some(addr) = parse_device(tok.text) {
        return Ok(Destination::Device(addr));
    }
    let message = if parse_literal(tok.text).is_some() {
        format!("cannot write to literal `{}`", tok.text)
    } else {
        format!("expected register, got `{}`", tok.text)
    };
    Err(ctx.syntax(tok.column, message))
}

fn parse_operand(ctx: &LineContext<'_>, tok: &Token<'_>) -> Result<Operand, AssemblyError> {
    if let Some(value) = parse_literal(tok.text) {
        return Ok(Operand::Literal(value));
    }
    parse_destination(ctx, tok)
        .map(Operand::from)
        .map_err(|_| ctx.syntax(tok.column, format!("invalid operand `{}`", tok.text)))
}

/// Parses one non-empty, comment-free line into an instruction.
fn parse_instruction(
    ctx: &LineContext<'_>,
    code: &str,
) -> Result<Instruction, AssemblyError> {
    let tokens = tokenize(code);
    let Some((head, args)) = tokens.split_first() else {
        return Err(ctx.syntax(1, "empty instruction".to_string()));
    };

    let Some(operation) = Operation::from_mnemonic(head.text) else {
        if UNSUPPORTED_MNEMONICS.contains(&head.text) {
            return Err(ctx.error(
                AssemblyErrorKind::OperationNotSupported,
                head.column,
                format!("`{}` is not supported by this processor", head.text),
            ));
        }
        return Err(ctx.syntax(head.column, format!("unknown mnemonic `{}`", head.text)));
    };

    let shape = operation.shape();
    if args.len() != shape.arity() {
        let column = args.get(shape.arity()).map_or(head.column, |t| t.column);
        return Err(ctx.syntax(
            column,
            format!(
                "`{operation}` expects {} operand(s), found {}",
                shape.arity(),
                args.len()
            ),
        ));
    }

    let (destination, sources) = if shape.has_destination() {
        (Some(parse_destination(ctx, &args[0])?), &args[1..])
    } else {
        (None, args)
    };

    let mut operands = [Operand::UNUSED; 2];
    for (slot, tok) in operands.iter_mut().zip(sources) {
        *slot = parse_operand(ctx, tok)?;
    }
    let [left, right] = operands;

    debug_assert!(matches!(
        (shape, destination),
        (Shape::Nullary | Shape::Target, None)
            | (Shape::Destination | Shape::Unary | Shape::Binary, Some(_))
    ));

    Ok(Instruction {
        operation,
        destination,
        left,
        right,
        line: ctx.line,
        text: code.trim().to_string(),
    })
}

/// Assembles source text into a [`Program`].
///
/// Lines are numbered from 1. Blank and comment-only lines produce no instruction but keep
/// their number, so `jmp 5` always means "the instruction written on line 5".
pub fn assemble_source(source: &str) -> Result<Program, AssemblyError> {
    let mut instructions = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let code = strip_comment(raw);
        if code.trim().is_empty() {
            continue;
        }
        let ctx = LineContext {
            line: index + 1,
            raw,
        };
        instructions.push(parse_instruction(&ctx, code)?);
    }

    Ok(Program::new(instructions))
}
