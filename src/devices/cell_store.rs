//! Read/write memory cells that survive between runs.
//!
//! On disk the store is `TCEL` followed by the cells as a codec-encoded `Vec<f32>`.

use crate::devices::DeviceError;
use crate::types::encoding::{Decode, Encode};
use crate::virtual_machine::device::Device;
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 4] = b"TCEL";

#[derive(Debug)]
pub struct CellStore {
    cells: Vec<f32>,
}

impl CellStore {
    /// Creates `len` cells, all zero.
    pub fn new(len: usize) -> Self {
        Self {
            cells: vec![0.0; len],
        }
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        MAGIC.encode(&mut out);
        self.cells.encode(&mut out);
        out
    }

    pub fn from_bytes(mut input: &[u8]) -> Result<Self, DeviceError> {
        let invalid = |reason: &str| DeviceError::InvalidImage {
            reason: reason.to_string(),
        };
        let magic = <[u8; 4]>::decode(&mut input).map_err(|_| invalid("truncated"))?;
        if &magic != MAGIC {
            return Err(invalid("bad magic"));
        }
        let cells = Vec::<f32>::decode(&mut input).map_err(|e| invalid(&e.to_string()))?;
        if !input.is_empty() {
            return Err(invalid("trailing bytes"));
        }
        Ok(Self { cells })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DeviceError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()).map_err(|e| DeviceError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| DeviceError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }
}

impl Device for CellStore {
    fn try_read(&mut self, register: u16) -> Option<f32> {
        self.cells.get(register as usize).copied()
    }

    fn try_write(&mut self, register: u16, value: f32) -> bool {
        match self.cells.get_mut(register as usize) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_read_back_writes() {
        let mut store = CellStore::new(2);
        assert!(store.try_write(1, 4.5));
        assert_eq!(store.try_read(1), Some(4.5));
        assert_eq!(store.try_read(0), Some(0.0));
    }

    #[test]
    fn out_of_range_refused() {
        let mut store = CellStore::new(2);
        assert!(!store.try_write(2, 1.0));
        assert_eq!(store.try_read(2), None);
    }

    #[test]
    fn image_rejects_bad_magic_and_trailing_bytes() {
        assert!(matches!(
            CellStore::from_bytes(b"NOPE\0\0\0\0\0\0\0\0"),
            Err(DeviceError::InvalidImage { ref reason }) if reason == "bad magic"
        ));
        let mut bytes = CellStore::new(1).to_bytes();
        bytes.push(0);
        assert!(matches!(
            CellStore::from_bytes(&bytes),
            Err(DeviceError::InvalidImage { ref reason }) if reason == "trailing bytes"
        ));
        assert!(CellStore::from_bytes(b"TC").is_err());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.bin");
        let mut store = CellStore::new(3);
        store.try_write(0, 1.25);
        store.try_write(2, -8.0);
        store.save(&path).unwrap();

        let loaded = CellStore::load(&path).unwrap();
        assert_eq!(loaded.cells(), &[1.25, 0.0, -8.0]);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = CellStore::load("/nonexistent/tinycpu/cells.bin").err().unwrap();
        assert!(matches!(err, DeviceError::Io { .. }));
    }
}
