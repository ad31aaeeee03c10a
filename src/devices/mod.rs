//! Peripherals the runner plugs into processor slots.
//!
//! Each implements [`Device`](crate::virtual_machine::device::Device) and keeps its own register
//! map; the processor never sees more than "value" or "refused".

pub mod cell_store;
pub mod display;
pub mod lookup_memory;

pub use cell_store::CellStore;
pub use display::Display;
pub use lookup_memory::LookupMemory;

use tinycpu_derive::Error;

/// Errors loading or saving peripheral contents on the host side.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{path}: {reason}")]
    Io { path: String, reason: String },
    #[error("line {line}: `{token}` is not a number")]
    InvalidNumber { line: usize, token: String },
    #[error("invalid cell image: {reason}")]
    InvalidImage { reason: String },
}

/// Converts a register value to an index: a non-negative integer that fits `usize`.
pub(crate) fn as_index(value: f32) -> Option<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f32 {
        Some(value as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_index_accepts_whole_numbers() {
        assert_eq!(as_index(0.0), Some(0));
        assert_eq!(as_index(12.0), Some(12));
    }

    #[test]
    fn as_index_rejects_others() {
        for v in [-1.0, 0.5, f32::NAN, f32::INFINITY, 1e20] {
            assert_eq!(as_index(v), None, "{v}");
        }
    }
}
