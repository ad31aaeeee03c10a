use std::fmt;

/// Read-only view of the machine after one successful step, handed to the step observer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepSnapshot<'a> {
    /// Source line of the instruction that just ran.
    pub line: usize,
    pub text: &'a str,
    pub registers: &'a [f32],
    pub stack_pointer: usize,
    /// Every stack cell, including those above the stack pointer.
    pub stack: &'a [f32],
    pub return_address: f32,
}

impl StepSnapshot<'_> {
    /// Cells currently on the stack, bottom first.
    pub fn live_stack(&self) -> &[f32] {
        &self.stack[..self.stack_pointer.min(self.stack.len())]
    }
}

impl fmt::Display for StepSnapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4} | {:<24} | sp={} ra={} regs={:?} stack={:?}",
            self.line,
            self.text,
            self.stack_pointer,
            self.return_address,
            self.registers,
            self.live_stack()
        )
    }
}
