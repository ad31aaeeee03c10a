//! Operand and destination kinds.
//!
//! Source operands may be literals; destinations may not. Keeping them as two closed enums makes
//! "write to a literal" unrepresentable and lets the processor resolve both with exhaustive
//! matches.

use std::fmt;
use tinycpu_derive::BinaryCodec;

/// Register marker for user registers (`r0`, `r1`, ...).
pub const REGISTER_MARKER: char = 'r';
/// Device register marker (`d<slot>:<register>`).
pub const DEVICE_MARKER: char = 'd';
/// Separator between slot and device register.
pub const DEVICE_SEPARATOR: char = ':';
/// Stack pointer pseudo-register.
pub const STACK_POINTER: &str = "sp";
/// Return address pseudo-register.
pub const RETURN_ADDRESS: &str = "ra";

/// Address of one register inside one attached device.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, BinaryCodec)]
pub struct DeviceAddress {
    /// Index into the processor's device table.
    pub slot: u16,
    /// Peripheral-private register index.
    pub register: u16,
}

impl DeviceAddress {
    pub const fn new(slot: u16, register: u16) -> Self {
        Self { slot, register }
    }

    /// Packs into the 32-bit form `slot << 16 | register`.
    pub const fn packed(self) -> u32 {
        (self.slot as u32) << 16 | self.register as u32
    }

    /// Splits a packed 32-bit address back into slot and register.
    pub const fn from_packed(value: u32) -> Self {
        Self {
            slot: (value >> 16) as u16,
            register: (value & 0xFFFF) as u16,
        }
    }
}

/// Source operand of an instruction.
#[derive(Copy, Clone, Debug, PartialEq, BinaryCodec)]
pub enum Operand {
    /// Immediate value.
    Literal(f32),
    /// User register index.
    Register(u32),
    /// Current stack pointer.
    StackPointer,
    /// Current return address.
    ReturnAddress,
    /// Register of an attached device.
    Device(DeviceAddress),
}

impl Operand {
    /// Placeholder for operand positions the operation's shape does not use.
    pub const UNUSED: Operand = Operand::Literal(0.0);
}

/// Writable location an instruction stores its result to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, BinaryCodec)]
pub enum Destination {
    Register(u32),
    StackPointer,
    ReturnAddress,
    Device(DeviceAddress),
}

/// Reading a destination's current value goes through the operand path.
impl From<Destination> for Operand {
    fn from(dst: Destination) -> Self {
        match dst {
            Destination::Register(i) => Operand::Register(i),
            Destination::StackPointer => Operand::StackPointer,
            Destination::ReturnAddress => Operand::ReturnAddress,
            Destination::Device(addr) => Operand::Device(addr),
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{DEVICE_MARKER}{}{DEVICE_SEPARATOR}{}",
            self.slot, self.register
        )
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Register(i) => write!(f, "{REGISTER_MARKER}{i}"),
            Destination::StackPointer => f.write_str(STACK_POINTER),
            Destination::ReturnAddress => f.write_str(RETURN_ADDRESS),
            Destination::Device(addr) => addr.fmt(f),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Register(i) => Destination::Register(*i).fmt(f),
            Operand::StackPointer => f.write_str(STACK_POINTER),
            Operand::ReturnAddress => f.write_str(RETURN_ADDRESS),
            Operand::Device(addr) => addr.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::{Decode, Encode};

    #[test]
    fn device_address_packing() {
        let addr = DeviceAddress::new(3, 0x1234);
        assert_eq!(addr.packed(), 0x0003_1234);
        assert_eq!(DeviceAddress::from_packed(0x0003_1234), addr);
        assert_eq!(
            DeviceAddress::from_packed(u32::MAX),
            DeviceAddress::new(0xFFFF, 0xFFFF)
        );
    }

    #[test]
    fn operand_display_matches_source_syntax() {
        assert_eq!(Operand::Register(4).to_string(), "r4");
        assert_eq!(Operand::StackPointer.to_string(), "sp");
        assert_eq!(Operand::ReturnAddress.to_string(), "ra");
        assert_eq!(Operand::Device(DeviceAddress::new(0, 7)).to_string(), "d0:7");
        assert_eq!(Operand::Literal(-1.5).to_string(), "-1.5");
    }

    #[test]
    fn destination_reads_as_operand() {
        assert_eq!(
            Operand::from(Destination::Register(2)),
            Operand::Register(2)
        );
        assert_eq!(
            Operand::from(Destination::Device(DeviceAddress::new(1, 2))),
            Operand::Device(DeviceAddress::new(1, 2))
        );
    }

    #[test]
    fn operand_tags_are_stable() {
        assert_eq!(Operand::Literal(1.0).to_bytes()[0], 0);
        assert_eq!(Operand::Register(0).to_bytes()[0], 1);
        assert_eq!(Operand::StackPointer.to_bytes(), [2]);
        assert_eq!(Operand::ReturnAddress.to_bytes(), [3]);
        assert_eq!(Operand::Device(DeviceAddress::new(0, 0)).to_bytes()[0], 4);
    }

    #[test]
    fn destination_has_no_literal_tag() {
        assert!(Destination::decode(&mut [4u8].as_slice()).is_err());
        let bytes = Destination::Device(DeviceAddress::new(2, 9)).to_bytes();
        assert_eq!(
            Destination::from_bytes(&bytes).unwrap(),
            Destination::Device(DeviceAddress::new(2, 9))
        );
    }
}
