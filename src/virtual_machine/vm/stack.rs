use crate::virtual_machine::errors::FaultKind;

/// Fixed-capacity operand stack.
///
/// `pointer` is the insertion index: 0 means empty, `cells.len()` means full. Underflow and
/// overflow both fault [`FaultKind::StackOverflow`].
pub(super) struct Stack {
    cells: Vec<f32>,
    pointer: usize,
}

impl Stack {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            cells: vec![0.0; capacity],
            pointer: 0,
        }
    }

    pub(super) fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub(super) fn pointer(&self) -> usize {
        self.pointer
    }

    pub(super) fn as_slice(&self) -> &[f32] {
        &self.cells
    }

    pub(super) fn reset(&mut self) {
        self.cells.fill(0.0);
        self.pointer = 0;
    }

    pub(super) fn push(&mut self, value: f32) -> Result<(), FaultKind> {
        let cell = self
            .cells
            .get_mut(self.pointer)
            .ok_or(FaultKind::StackOverflow)?;
        *cell = value;
        self.pointer += 1;
        Ok(())
    }

    pub(super) fn pop(&mut self) -> Result<f32, FaultKind> {
        let value = self.peek()?;
        self.pointer -= 1;
        Ok(value)
    }

    pub(super) fn peek(&self) -> Result<f32, FaultKind> {
        self.pointer
            .checked_sub(1)
            .and_then(|top| self.cells.get(top))
            .copied()
            .ok_or(FaultKind::StackOverflow)
    }

    /// Moves the stack pointer. `value` must be an integer in `0..=capacity`.
    pub(super) fn set_pointer(&mut self, value: f32) -> Result<(), FaultKind> {
        if !(value >= 0.0 && value.fract() == 0.0 && value <= self.capacity() as f32) {
            return Err(FaultKind::StackOverflow);
        }
        self.pointer = value as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_peek() {
        let mut stack = Stack::new(2);
        stack.push(1.0).unwrap();
        stack.push(2.0).unwrap();
        assert_eq!(stack.peek(), Ok(2.0));
        assert_eq!(stack.pointer(), 2);
        assert_eq!(stack.pop(), Ok(2.0));
        assert_eq!(stack.pop(), Ok(1.0));
        assert_eq!(stack.pointer(), 0);
    }

    #[test]
    fn overflow_and_underflow_share_a_fault() {
        let mut stack = Stack::new(1);
        assert_eq!(stack.pop(), Err(FaultKind::StackOverflow));
        assert_eq!(stack.peek(), Err(FaultKind::StackOverflow));
        stack.push(1.0).unwrap();
        assert_eq!(stack.push(2.0), Err(FaultKind::StackOverflow));
    }

    #[test]
    fn zero_capacity_stack() {
        let mut stack = Stack::new(0);
        assert_eq!(stack.push(1.0), Err(FaultKind::StackOverflow));
        assert_eq!(stack.set_pointer(0.0), Ok(()));
        assert_eq!(stack.set_pointer(1.0), Err(FaultKind::StackOverflow));
    }

    #[test]
    fn set_pointer_bounds() {
        let mut stack = Stack::new(4);
        assert_eq!(stack.set_pointer(4.0), Ok(()));
        assert_eq!(stack.pointer(), 4);
        for bad in [-1.0, 4.5, 5.0, f32::NAN, f32::INFINITY] {
            assert_eq!(stack.set_pointer(bad), Err(FaultKind::StackOverflow), "{bad}");
        }
        assert_eq!(stack.pointer(), 4);
    }
}
