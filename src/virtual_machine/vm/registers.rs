use crate::virtual_machine::errors::FaultKind;

/// Fixed-size file of user registers (`r0` .. `rN-1`).
pub(super) struct Registers {
    regs: Vec<f32>,
}

impl Registers {
    /// Creates a register file with `count` registers, all zero.
    pub(super) fn new(count: usize) -> Self {
        Self {
            regs: vec![0.0; count],
        }
    }

    pub(super) fn as_slice(&self) -> &[f32] {
        &self.regs
    }

    /// Zeroes every register.
    pub(super) fn reset(&mut self) {
        self.regs.fill(0.0);
    }

    /// Returns the value in register `idx`.
    ///
    /// Returns [`FaultKind::RegisterOutOfBound`] if `idx` is out of bounds.
    pub(super) fn get(&self, idx: u32) -> Result<f32, FaultKind> {
        self.regs
            .get(idx as usize)
            .copied()
            .ok_or(FaultKind::RegisterOutOfBound)
    }

    /// Stores a value into register `idx`.
    ///
    /// Returns [`FaultKind::RegisterOutOfBound`] if `idx` is out of bounds.
    pub(super) fn set(&mut self, idx: u32, value: f32) -> Result<(), FaultKind> {
        let slot = self
            .regs
            .get_mut(idx as usize)
            .ok_or(FaultKind::RegisterOutOfBound)?;
        *slot = value;
        Ok(())
    }
}
