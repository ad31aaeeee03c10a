//! Compiled program representation and serialization.
//!
//! A [`Program`] is the assembler's output: the decoded instructions plus the minimum machine
//! capacity they need. It serializes to a versioned binary form and to a base64 text form for
//! storage next to the source.

use crate::types::encoding::{Decode, Encode, EncodeSink};
use crate::types::hash::{ContentHash, HashSink};
use crate::virtual_machine::errors::ProgramError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::isa::Operation;
use crate::virtual_machine::operand::Operand;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tinycpu_derive::BinaryCodec;

/// Magic bytes identifying a serialized program.
const MAGIC: &[u8; 4] = b"TCPU";

/// Current program format version.
const CURRENT_VERSION: Version = Version::new(0, 1, 0);

/// Section tag following the version.
const PROGRAM_TAG: &[u8] = b"PROGRAM";

/// Semantic version for program format compatibility.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, BinaryCodec)]
struct Version {
    major: u8,
    minor: u8,
    patch: u8,
}

impl Version {
    const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Minimum machine capacity a program needs to run.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, BinaryCodec)]
pub struct Requirements {
    /// Highest user register referenced + 1.
    pub registers: usize,
    /// Deepest stack depth reached reading the program top to bottom.
    pub stack: usize,
    /// Highest device slot referenced + 1.
    pub devices: usize,
}

impl Requirements {
    /// Derives the requirements of an instruction sequence.
    pub fn of(instructions: &[Instruction]) -> Self {
        let mut req = Requirements::default();
        let mut depth = 0usize;

        for ins in instructions {
            let operands = [ins.left, ins.right];
            let touched = ins
                .destination
                .map(Operand::from)
                .into_iter()
                .chain(operands);
            for operand in touched {
                match operand {
                    Operand::Register(index) => {
                        req.registers = req.registers.max(index as usize + 1);
                    }
                    Operand::Device(addr) => {
                        req.devices = req.devices.max(addr.slot as usize + 1);
                    }
                    Operand::Literal(_) | Operand::StackPointer | Operand::ReturnAddress => {}
                }
            }

            match ins.operation {
                Operation::Push => depth += 1,
                Operation::Pop => depth = depth.saturating_sub(1),
                Operation::Peek => req.stack = req.stack.max(1),
                _ => {}
            }
            req.stack = req.stack.max(depth);
        }
        req
    }
}

/// Assembled program: immutable instruction sequence plus its requirements.
#[derive(Clone, Debug, PartialEq, BinaryCodec)]
pub struct Program {
    instructions: Vec<Instruction>,
    requirements: Requirements,
}

impl Program {
    /// Builds a program and derives its requirements once.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let requirements = Requirements::of(&instructions);
        Self {
            instructions,
            requirements,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn requirements(&self) -> Requirements {
        self.requirements
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Serializes the program to a portable binary format.
    ///
    /// The output includes a magic header and version for compatibility checking.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_image(&mut out);
        out
    }

    fn write_image<S: EncodeSink>(&self, out: &mut S) {
        MAGIC.encode(out);
        CURRENT_VERSION.encode(out);
        PROGRAM_TAG.to_vec().encode(out);
        self.encode(out);
    }

    /// Deserializes a program from its binary representation.
    ///
    /// Besides the header, every instruction is checked against its operation's shape and the
    /// stored requirements must match the ones derived from the instructions.
    pub fn from_bytes(mut input: &[u8]) -> Result<Self, ProgramError> {
        if input.len() < MAGIC.len() {
            return Err(ProgramError::decode("truncated"));
        }

        if &<[u8; 4]>::decode(&mut input)? != MAGIC {
            return Err(ProgramError::decode("bad magic"));
        }

        if Version::decode(&mut input)? != CURRENT_VERSION {
            return Err(ProgramError::decode("unsupported version"));
        }

        if Vec::<u8>::decode(&mut input)?.as_slice() != PROGRAM_TAG {
            return Err(ProgramError::decode("bad prefix"));
        }

        let program = Program::decode(&mut input)?;
        if !input.is_empty() {
            return Err(ProgramError::decode("trailing bytes"));
        }
        program.validate()?;
        Ok(program)
    }

    /// Printable form: the binary form in standard base64.
    pub fn to_text(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parses the printable form. Surrounding whitespace is ignored.
    pub fn from_text(text: &str) -> Result<Self, ProgramError> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| ProgramError::decode(format!("bad base64: {e}")))?;
        Program::from_bytes(&bytes)
    }

    /// SHA3-256 over the binary form.
    pub fn digest(&self) -> ContentHash {
        let mut hasher = HashSink::default();
        self.write_image(&mut hasher);
        hasher.finalize()
    }

    fn validate(&self) -> Result<(), ProgramError> {
        for ins in &self.instructions {
            let wants_destination = ins.operation.shape().has_destination();
            if wants_destination != ins.destination.is_some() {
                return Err(ProgramError::decode(format!(
                    "line {}: `{}` {} a destination",
                    ins.line,
                    ins.operation,
                    if wants_destination {
                        "requires"
                    } else {
                        "does not take"
                    }
                )));
            }
        }
        if Requirements::of(&self.instructions) != self.requirements {
            return Err(ProgramError::decode("requirements mismatch"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::assembler::assemble_source;

    #[test]
    fn requirements_from_registers() {
        let program = assemble_source("mov r0 5\nadd r1 r0 3").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(
            program.requirements(),
            Requirements {
                registers: 2,
                stack: 0,
                devices: 0
            }
        );
    }

    #[test]
    fn requirements_empty_program() {
        let program = assemble_source("# nothing\n\n").unwrap();
        assert!(program.is_empty());
        assert_eq!(program.requirements(), Requirements::default());
    }

    #[test]
    fn requirements_from_devices() {
        let program = assemble_source("mov d2:7 1\nmov r0 d0:65535").unwrap();
        assert_eq!(program.requirements().devices, 3);
        assert_eq!(program.requirements().registers, 1);
    }

    #[test]
    fn requirements_stack_depth_in_source_order() {
        let program = assemble_source("push r0\npush r0\npop r1\npush r0\npop r1\npop r1").unwrap();
        assert_eq!(program.requirements().stack, 2);

        let program = assemble_source("pop r0\npop r0\npush r0").unwrap();
        assert_eq!(program.requirements().stack, 1);

        let program = assemble_source("peek r0").unwrap();
        assert_eq!(program.requirements().stack, 1);
    }

    #[test]
    fn roundtrip_bytes() {
        let program = assemble_source("mov r0 5\nadd r1 r0 -3.5\npush d1:2\njmp 1\nret").unwrap();
        let decoded = Program::from_bytes(&program.to_bytes()).unwrap();
        assert_eq!(decoded, program);
    }

    #[test]
    fn roundtrip_text_ignores_whitespace() {
        let program = assemble_source("mov r3 sp\njra 1").unwrap();
        let text = format!("\n  {}  \n", program.to_text());
        assert_eq!(Program::from_text(&text).unwrap(), program);
    }

    #[test]
    fn from_bytes_truncated() {
        let err = Program::from_bytes(&[0x00, 0x01]).unwrap_err();
        assert!(matches!(err, ProgramError::Decode { ref reason } if reason == "truncated"));
    }

    #[test]
    fn from_bytes_bad_magic() {
        let err = Program::from_bytes(b"BADM\x00\x01\x00").unwrap_err();
        assert!(matches!(err, ProgramError::Decode { ref reason } if reason == "bad magic"));
    }

    #[test]
    fn from_bytes_unsupported_version() {
        let mut bytes = Vec::new();
        MAGIC.encode(&mut bytes);
        Version::new(255, 0, 0).encode(&mut bytes);
        let err = Program::from_bytes(&bytes).unwrap_err();
        assert!(
            matches!(err, ProgramError::Decode { ref reason } if reason == "unsupported version")
        );
    }

    #[test]
    fn from_bytes_bad_prefix() {
        let mut bytes = Vec::new();
        MAGIC.encode(&mut bytes);
        CURRENT_VERSION.encode(&mut bytes);
        b"WRONG".to_vec().encode(&mut bytes);
        let err = Program::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProgramError::Decode { ref reason } if reason == "bad prefix"));
    }

    #[test]
    fn from_bytes_trailing_bytes() {
        let mut bytes = Program::new(Vec::new()).to_bytes();
        bytes.push(0xFF);
        let err = Program::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProgramError::Decode { ref reason } if reason == "trailing bytes"));
    }

    #[test]
    fn from_bytes_rejects_shape_mismatch() {
        let program = Program::new(vec![Instruction {
            operation: Operation::Add,
            destination: None,
            left: Operand::Literal(1.0),
            right: Operand::Literal(2.0),
            line: 4,
            text: "add 1 2".into(),
        }]);
        let err = Program::from_bytes(&program.to_bytes()).unwrap_err();
        assert!(
            matches!(err, ProgramError::Decode { ref reason } if reason.contains("requires a destination"))
        );
    }

    #[test]
    fn from_bytes_rejects_tampered_requirements() {
        let mut program = assemble_source("mov r4 1").unwrap();
        program.requirements.registers = 1;
        let err = Program::from_bytes(&program.to_bytes()).unwrap_err();
        assert!(
            matches!(err, ProgramError::Decode { ref reason } if reason == "requirements mismatch")
        );
    }

    #[test]
    fn from_text_rejects_bad_base64() {
        let err = Program::from_text("not base64!!").unwrap_err();
        assert!(matches!(err, ProgramError::Decode { ref reason } if reason.starts_with("bad base64")));
    }

    #[test]
    fn from_text_rejects_unknown_opcode() {
        let program = assemble_source("nop").unwrap();
        let mut bytes = program.to_bytes();
        // First instruction's opcode follows the header and the instruction count.
        let opcode_at = MAGIC.len() + 3 + 8 + PROGRAM_TAG.len() + 8;
        assert_eq!(bytes[opcode_at], Operation::Nop as u8);
        bytes[opcode_at] = 0xEE;
        assert!(Program::from_bytes(&bytes).is_err());
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = assemble_source("mov r0 1").unwrap();
        let b = assemble_source("mov r0 1").unwrap();
        let c = assemble_source("mov r0 2").unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().to_string().len(), 64);
        assert_eq!(a.digest(), ContentHash::of_bytes(&a.to_bytes()));
    }
}
