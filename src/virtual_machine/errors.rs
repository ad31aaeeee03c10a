use crate::types::encoding::DecodeError;
use tinycpu_derive::Error;

/// Why a source line was rejected by the assembler.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum AssemblyErrorKind {
    /// Unknown mnemonic, wrong operand count or malformed token.
    #[error("syntax error")]
    SyntaxError,
    /// Mnemonic is reserved but this processor has no implementation for it.
    #[error("operation not supported")]
    OperationNotSupported,
}

/// Assembly failure pinned to a source position.
///
/// `line` and `column` are 1-based; `column` points at the offending token.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind} at line {line}, column {column}: {message}")]
pub struct AssemblyError {
    pub kind: AssemblyErrorKind,
    pub line: usize,
    pub column: usize,
    /// Short description of what was expected.
    pub message: String,
    /// Raw source line, comment included.
    pub text: String,
}

/// Run-time fault taxonomy. Every fault stops the run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum FaultKind {
    #[error("machine does not meet the program requirements")]
    RequirementsNotMet,
    #[error("operation not implemented")]
    OperationNotImplemented,
    #[error("register out of bound")]
    RegisterOutOfBound,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a number")]
    NaN,
    /// Covers both pushing onto a full stack and reading an empty one.
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid jump")]
    InvalidJump,
    #[error("device slot out of range")]
    DeviceOverflow,
    #[error("device unplugged")]
    DeviceUnplugged,
    #[error("device failed")]
    DeviceFailed,
    #[error("assertion failed")]
    AssertFailed,
}

/// Fault raised while running a program.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind} at line {line}: {text}")]
pub struct ExecutionError {
    pub kind: FaultKind,
    /// Source line of the faulting instruction, or 0 for faults raised before the first step.
    pub line: usize,
    /// Source text of the faulting instruction, or a description for pre-run faults.
    pub text: String,
}

impl ExecutionError {
    pub fn new(kind: FaultKind, line: usize, text: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            text: text.into(),
        }
    }
}

/// Errors reading a compiled program back from its binary or text form.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ProgramError {
    #[error("invalid program: {reason}")]
    Decode { reason: String },
}

impl ProgramError {
    pub fn decode(reason: impl Into<String>) -> Self {
        ProgramError::Decode {
            reason: reason.into(),
        }
    }
}

impl From<DecodeError> for ProgramError {
    fn from(err: DecodeError) -> Self {
        ProgramError::decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembly_error_display_leaves_out_raw_text() {
        let err = AssemblyError {
            kind: AssemblyErrorKind::SyntaxError,
            line: 3,
            column: 5,
            message: "unknown mnemonic `jump`".into(),
            text: "    jump 4".into(),
        };
        assert_eq!(
            err.to_string(),
            "syntax error at line 3, column 5: unknown mnemonic `jump`"
        );
    }

    #[test]
    fn execution_error_display() {
        let err = ExecutionError::new(FaultKind::DivisionByZero, 7, "div r0 r1 0");
        assert_eq!(err.to_string(), "division by zero at line 7: div r0 r1 0");
    }

    #[test]
    fn decode_error_converts_to_program_error() {
        let err: ProgramError = DecodeError::UnexpectedEof.into();
        assert_eq!(err.to_string(), "invalid program: unexpected end of input");
    }
}
