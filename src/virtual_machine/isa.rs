//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_operation!`](crate::for_each_operation) macro holds the canonical operation
//! table and invokes a callback macro with it, so the opcode enum, the mnemonic lookup used by the
//! assembler and the frozen-ISA hash check are all generated from one list.
//!
//! Each entry is `Name = opcode, "mnemonic" => Shape`. The [`Shape`] says what follows the
//! mnemonic in source text:
//!
//! | Shape | Source form | Example |
//! |---|---|---|
//! | `Nullary` | `op` | `ret` |
//! | `Target` | `op <operand>` | `jmp 12` |
//! | `Destination` | `op <dst>` | `push r0` |
//! | `Unary` | `op <dst> <operand>` | `mov r0 5` |
//! | `Binary` | `op <dst> <operand> <operand>` | `add r1 r0 3` |

use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use std::fmt;

/// Operand layout of an operation in source text and in the decoded [`Instruction`].
///
/// [`Instruction`]: crate::virtual_machine::instruction::Instruction
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Shape {
    Nullary,
    Target,
    Destination,
    Unary,
    Binary,
}

impl Shape {
    /// Whether the operation writes (or reads-then-writes) a destination.
    pub const fn has_destination(self) -> bool {
        matches!(self, Shape::Destination | Shape::Unary | Shape::Binary)
    }

    /// Number of source operands after the destination.
    pub const fn operand_count(self) -> usize {
        match self {
            Shape::Nullary | Shape::Destination => 0,
            Shape::Target | Shape::Unary => 1,
            Shape::Binary => 2,
        }
    }

    /// Number of tokens expected after the mnemonic.
    pub const fn arity(self) -> usize {
        self.has_destination() as usize + self.operand_count()
    }
}

/// Invokes a callback macro with the complete operation table.
#[macro_export]
macro_rules! for_each_operation {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Moves and unary math
            // =========================
            /// nop ; no effect
            Nop = 0x00, "nop" => Nullary,
            /// mov dst, a ; dst = a
            Move = 0x01, "mov" => Unary,
            /// sqrt dst, a ; dst = √a (faults NaN when a < 0)
            SquareRoot = 0x02, "sqrt" => Unary,
            /// assert dst, a ; faults unless |dst − a| < ε
            Assert = 0x03, "assert" => Unary,
            // =========================
            // Arithmetic
            // =========================
            /// add dst, a, b ; dst = a + b
            Add = 0x10, "add" => Binary,
            /// sub dst, a, b ; dst = a − b
            Subtract = 0x11, "sub" => Binary,
            /// mul dst, a, b ; dst = a × b
            Multiply = 0x12, "mul" => Binary,
            /// div dst, a, b ; dst = a / b (faults when b == 0)
            Divide = 0x13, "div" => Binary,
            /// inc dst ; dst = dst + 1
            Increment = 0x14, "inc" => Destination,
            /// dec dst ; dst = dst − 1
            Decrement = 0x15, "dec" => Destination,
            // =========================
            // Comparison (1.0 = true, 0.0 = false)
            // =========================
            /// eq dst, a, b ; dst = |a − b| < ε
            Equal = 0x20, "eq" => Binary,
            /// neq dst, a, b ; dst = |a − b| >= ε
            NotEqual = 0x21, "neq" => Binary,
            /// gt dst, a, b ; dst = a > b
            GreaterThan = 0x22, "gt" => Binary,
            /// gte dst, a, b ; dst = a >= b
            GreaterThanOrEqual = 0x23, "gte" => Binary,
            /// lt dst, a, b ; dst = a < b
            LesserThan = 0x24, "lt" => Binary,
            /// lte dst, a, b ; dst = a <= b
            LesserThanOrEqual = 0x25, "lte" => Binary,
            // =========================
            // Stack
            // =========================
            /// push src ; stack[sp++] = src
            Push = 0x30, "push" => Destination,
            /// pop dst ; dst = stack[--sp]
            Pop = 0x31, "pop" => Destination,
            /// peek dst ; dst = stack[sp − 1]
            Peek = 0x32, "peek" => Destination,
            // =========================
            // Control flow (targets are source lines)
            // =========================
            /// jmp line ; continue at the instruction written on `line`
            Jump = 0x40, "jmp" => Target,
            /// jra line ; like jmp, and ra = line of the first instruction after current + 1
            JumpReturnAddress = 0x41, "jra" => Target,
            /// ret ; stop the run successfully
            Ret = 0x42, "ret" => Nullary,
        }
    };
}

#[macro_export]
macro_rules! define_operations {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:expr, $mnemonic:literal => $shape:ident
        ),* $(,)?
    ) => {
        /// One operation of the ISA, with its wire opcode as discriminant.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Operation {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for Operation {
            type Error = DecodeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Operation::$name), )*
                    _ => Err(DecodeError::InvalidValue),
                }
            }
        }

        impl Operation {
            /// Every operation in table order.
            pub const ALL: &'static [Operation] = &[ $( Operation::$name ),* ];

            /// Returns the assembly mnemonic for this operation.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Operation::$name => $mnemonic, )*
                }
            }

            /// Returns the source-text shape of this operation.
            pub const fn shape(&self) -> Shape {
                match self {
                    $( Operation::$name => Shape::$shape, )*
                }
            }

            /// Looks up a mnemonic. Mnemonics are case-sensitive.
            pub fn from_mnemonic(name: &str) -> Option<Operation> {
                match name {
                    $( $mnemonic => Some(Operation::$name), )*
                    _ => None,
                }
            }
        }
    };
}

for_each_operation!(define_operations);

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl Encode for Operation {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for Operation {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Operation::try_from(u8::decode(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_try_from_invalid() {
        assert!(matches!(
            Operation::try_from(0xFF),
            Err(DecodeError::InvalidValue)
        ));
    }

    #[test]
    fn opcodes_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::try_from(*op as u8).unwrap(), *op);
        }
    }

    #[test]
    fn mnemonics_round_trip_and_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in Operation::ALL {
            assert!(seen.insert(op.mnemonic()), "duplicate mnemonic {op}");
            assert_eq!(Operation::from_mnemonic(op.mnemonic()), Some(*op));
        }
    }

    #[test]
    fn mnemonics_are_case_sensitive() {
        assert_eq!(Operation::from_mnemonic("add"), Some(Operation::Add));
        assert_eq!(Operation::from_mnemonic("ADD"), None);
    }

    #[test]
    fn shape_arity() {
        assert_eq!(Operation::Nop.shape().arity(), 0);
        assert_eq!(Operation::Jump.shape().arity(), 1);
        assert_eq!(Operation::Push.shape().arity(), 1);
        assert_eq!(Operation::Move.shape().arity(), 2);
        assert_eq!(Operation::Divide.shape().arity(), 3);
        assert!(!Operation::JumpReturnAddress.shape().has_destination());
        assert!(Operation::Increment.shape().has_destination());
    }
}
