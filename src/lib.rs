//! tinycpu library.
//!
//! An assembler and processor for a small register/stack ISA with memory-mapped devices, plus
//! the peripherals and encodings the command-line tools use.

pub mod devices;
pub mod types;
pub mod utils;
pub mod virtual_machine;
