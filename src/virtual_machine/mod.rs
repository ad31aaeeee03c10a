//! A small register/stack processor with memory-mapped devices.
//!
//! Source text is assembled into a [`program::Program`], which a [`vm::VM`] runs against its
//! own machine state.
//!
//! # Architecture
//!
//! - **Registers**: a fixed file of `f32` user registers (`r0`, `r1`, ...)
//! - **Stack**: fixed-capacity `f32` stack with a readable and writable pointer (`sp`)
//! - **Return address**: one `f32` register (`ra`) set by `jra`
//! - **Devices**: fixed slot table; `d<slot>:<register>` reaches a register of the
//!   [`device::Device`] attached to that slot
//! - **Control flow**: jump targets are source line numbers, not instruction indices
//! - **Faults**: the first fault stops the run and reports the source line and text
//!
//! # Modules
//!
//! - [`assembler`]: source parsing, diagnostics and requirement derivation
//! - [`device`]: the capability every peripheral implements
//! - [`errors`]: assembly, execution and decoding error types
//! - [`instruction`]: one decoded source line
//! - [`isa`]: operation table, mnemonics and opcodes
//! - [`operand`]: operand and destination kinds
//! - [`program`]: assembled program and its binary/text encodings
//! - [`vm`]: the processor

pub mod assembler;
pub mod device;
pub mod errors;
pub mod instruction;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod program;
pub mod vm;
