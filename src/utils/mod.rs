//! Crate-wide utilities.

pub mod log;
