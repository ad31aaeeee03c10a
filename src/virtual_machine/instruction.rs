use crate::virtual_machine::isa::Operation;
use crate::virtual_machine::operand::{Destination, Operand};
use std::fmt;
use tinycpu_derive::BinaryCodec;

/// One decoded source line.
///
/// Operand positions the operation's shape does not use hold [`Operand::UNUSED`].
#[derive(Clone, Debug, PartialEq, BinaryCodec)]
pub struct Instruction {
    pub operation: Operation,
    pub destination: Option<Destination>,
    pub left: Operand,
    pub right: Operand,
    /// 1-based source line. Jumps target this value, not the instruction's index.
    pub line: usize,
    /// Trimmed source with the comment stripped.
    pub text: String,
}

/// Source form rebuilt from the decoded fields, e.g. `add r1 r0 3`.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation.mnemonic())?;
        if let Some(dst) = &self.destination {
            write!(f, " {dst}")?;
        }
        let operands = [self.left, self.right];
        for operand in operands.iter().take(self.operation.shape().operand_count()) {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::operand::DeviceAddress;

    fn instruction(
        operation: Operation,
        destination: Option<Destination>,
        left: Operand,
        right: Operand,
    ) -> Instruction {
        Instruction {
            operation,
            destination,
            left,
            right,
            line: 1,
            text: String::new(),
        }
    }

    #[test]
    fn disassemble_binary() {
        let ins = instruction(
            Operation::Add,
            Some(Destination::Register(1)),
            Operand::Register(0),
            Operand::Literal(3.0),
        );
        assert_eq!(ins.to_string(), "add r1 r0 3");
    }

    #[test]
    fn disassemble_skips_unused_operands() {
        let ins = instruction(Operation::Ret, None, Operand::UNUSED, Operand::UNUSED);
        assert_eq!(ins.to_string(), "ret");

        let ins = instruction(
            Operation::Push,
            Some(Destination::Device(DeviceAddress::new(1, 2))),
            Operand::UNUSED,
            Operand::UNUSED,
        );
        assert_eq!(ins.to_string(), "push d1:2");

        let ins = instruction(Operation::Jump, None, Operand::Literal(12.0), Operand::UNUSED);
        assert_eq!(ins.to_string(), "jmp 12");
    }
}
