//! Processor implementation.
//!
//! The VM runs an assembled [`Program`] against a register file of `f32` values, a fixed
//! operand stack, a return-address register and a table of device slots. Capacities are fixed
//! at construction; machine state is reset at the start of every run and left in place after
//! it for inspection. Devices are not reset.

mod registers;
mod snapshot;
mod stack;

pub use snapshot::StepSnapshot;

use crate::virtual_machine::device::Device;
use crate::virtual_machine::errors::{ExecutionError, FaultKind};
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::isa::Operation;
use crate::virtual_machine::operand::{Destination, Operand};
use crate::virtual_machine::program::{Program, Requirements};
use registers::Registers;
use stack::Stack;
use std::thread;
use std::time::Duration;

/// Tolerance used by `eq`, `neq` and `assert`.
pub const EPSILON: f32 = f32::EPSILON;

/// Largest register file [`MachineConfig::fitting`] will size for a program.
pub const MAX_REGISTERS: usize = 1 << 16;
/// Largest stack [`MachineConfig::fitting`] will size for a program.
pub const MAX_STACK: usize = 1 << 16;
/// One past the highest slot a `d<slot>:<register>` address can name.
pub const MAX_DEVICES: usize = u16::MAX as usize + 1;

/// Fixed machine capacities and pacing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MachineConfig {
    pub registers: usize,
    pub stack: usize,
    pub devices: usize,
    /// Instructions per second. `None` (or zero) runs unpaced.
    pub frequency: Option<u32>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            registers: 16,
            stack: 16,
            devices: 4,
            frequency: None,
        }
    }
}

impl MachineConfig {
    /// Default capacities, grown where `program` needs more, up to [`MAX_REGISTERS`] and
    /// [`MAX_STACK`]. A program beyond those limits fails with `RequirementsNotMet` when run.
    pub fn fitting(program: &Program) -> Self {
        let req = program.requirements();
        let base = Self::default();
        Self {
            registers: base.registers.max(req.registers.min(MAX_REGISTERS)),
            stack: base.stack.max(req.stack.min(MAX_STACK)),
            devices: base.devices.max(req.devices),
            frequency: None,
        }
    }

    /// Describes every capacity that falls short of `req`, or `None` if all are met.
    fn shortfall(&self, req: Requirements) -> Option<String> {
        let checks = [
            ("register(s)", req.registers, self.registers),
            ("stack cell(s)", req.stack, self.stack),
            ("device slot(s)", req.devices, self.devices),
        ];
        let missing: Vec<String> = checks
            .iter()
            .filter(|(_, needed, available)| needed > available)
            .map(|(what, needed, available)| {
                format!("program needs {needed} {what}, machine has {available}")
            })
            .collect();
        (!missing.is_empty()).then(|| missing.join("; "))
    }

    fn step_delay(&self) -> Option<Duration> {
        self.frequency
            .filter(|hz| *hz > 0)
            .map(|hz| Duration::from_millis(1000 / hz as u64))
    }
}

/// Observer invoked after every successful step.
pub type StepObserver<'o> = &'o mut dyn FnMut(&StepSnapshot<'_>);

/// What the program counter does after a step.
enum Flow {
    Next,
    Jump(usize),
    Halt,
}

/// The processor.
///
/// `'d` bounds the attached devices, so a host can attach `&mut` borrows of its peripherals and
/// read them back once the VM is dropped.
pub struct VM<'d> {
    config: MachineConfig,
    registers: Registers,
    stack: Stack,
    return_address: f32,
    devices: Vec<Option<Box<dyn Device + 'd>>>,
    last_error: Option<ExecutionError>,
}

impl<'d> VM<'d> {
    /// Creates a processor with the given capacities. They cannot change afterwards.
    pub fn new(config: MachineConfig) -> Self {
        Self {
            registers: Registers::new(config.registers),
            stack: Stack::new(config.stack),
            return_address: 0.0,
            devices: (0..config.devices).map(|_| None).collect(),
            last_error: None,
            config,
        }
    }

    /// Binds `device` to `slot`, replacing any previous occupant.
    ///
    /// Returns `false` and drops `device` if `slot` is out of range.
    pub fn attach(&mut self, slot: usize, device: impl Device + 'd) -> bool {
        match self.devices.get_mut(slot) {
            Some(entry) => {
                *entry = Some(Box::new(device));
                true
            }
            None => false,
        }
    }

    /// Empties `slot`. Returns `false` if `slot` is out of range.
    pub fn detach(&mut self, slot: usize) -> bool {
        match self.devices.get_mut(slot) {
            Some(entry) => {
                *entry = None;
                true
            }
            None => false,
        }
    }

    pub fn registers(&self) -> &[f32] {
        self.registers.as_slice()
    }

    pub fn stack(&self) -> &[f32] {
        self.stack.as_slice()
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.pointer()
    }

    pub fn return_address(&self) -> f32 {
        self.return_address
    }

    /// Fault of the most recent run, if it failed.
    pub fn last_error(&self) -> Option<&ExecutionError> {
        self.last_error.as_ref()
    }

    /// Runs `program` from its first instruction until `ret`, the end of the program, or a fault.
    ///
    /// `on_step` sees the machine after every successful step.
    pub fn run(
        &mut self,
        program: &Program,
        on_step: Option<StepObserver<'_>>,
    ) -> Result<(), ExecutionError> {
        let result = self.execute(program, on_step);
        self.last_error = result.as_ref().err().cloned();
        result
    }

    fn reset(&mut self) {
        self.registers.reset();
        self.stack.reset();
        self.return_address = 0.0;
    }

    fn execute(
        &mut self,
        program: &Program,
        mut on_step: Option<StepObserver<'_>>,
    ) -> Result<(), ExecutionError> {
        self.reset();
        if let Some(text) = self.config.shortfall(program.requirements()) {
            return Err(ExecutionError::new(FaultKind::RequirementsNotMet, 0, text));
        }

        let instructions = program.instructions();
        let delay = self.config.step_delay();
        let mut pc = 0;

        while let Some(ins) = instructions.get(pc) {
            let flow = self
                .step(ins, instructions)
                .map_err(|kind| ExecutionError::new(kind, ins.line, ins.text.clone()))?;

            if let Some(observer) = on_step.as_deref_mut() {
                observer(&self.snapshot(ins));
            }
            if let Some(delay) = delay {
                thread::sleep(delay);
            }

            match flow {
                Flow::Next => pc += 1,
                Flow::Jump(target) => pc = target,
                Flow::Halt => break,
            }
        }
        Ok(())
    }

    fn snapshot<'s>(&'s self, ins: &'s Instruction) -> StepSnapshot<'s> {
        StepSnapshot {
            line: ins.line,
            text: &ins.text,
            registers: self.registers.as_slice(),
            stack_pointer: self.stack.pointer(),
            stack: self.stack.as_slice(),
            return_address: self.return_address,
        }
    }

    /// Executes one instruction. Operands are resolved before anything is written.
    fn step(&mut self, ins: &Instruction, program: &[Instruction]) -> Result<Flow, FaultKind> {
        let a = self.read(ins.left)?;
        let b = self.read(ins.right)?;
        let dst = || ins.destination.ok_or(FaultKind::OperationNotImplemented);

        match ins.operation {
            Operation::Nop => {}
            Operation::Move => self.write(dst()?, a)?,
            Operation::SquareRoot => {
                if a < 0.0 {
                    return Err(FaultKind::NaN);
                }
                self.write(dst()?, non_nan(a.sqrt())?)?;
            }
            Operation::Assert => {
                let current = self.read(dst()?.into())?;
                if !approx_eq(current, a) {
                    return Err(FaultKind::AssertFailed);
                }
            }
            Operation::Add => self.write(dst()?, non_nan(a + b)?)?,
            Operation::Subtract => self.write(dst()?, non_nan(a - b)?)?,
            Operation::Multiply => self.write(dst()?, non_nan(a * b)?)?,
            Operation::Divide => {
                if b == 0.0 {
                    return Err(FaultKind::DivisionByZero);
                }
                self.write(dst()?, non_nan(a / b)?)?;
            }
            Operation::Increment | Operation::Decrement => {
                let dst = dst()?;
                let current = self.read(dst.into())?;
                let delta = if ins.operation == Operation::Increment {
                    1.0
                } else {
                    -1.0
                };
                self.write(dst, non_nan(current + delta)?)?;
            }
            Operation::Equal => self.write(dst()?, flag(approx_eq(a, b)))?,
            Operation::NotEqual => self.write(dst()?, flag(!approx_eq(a, b)))?,
            Operation::GreaterThan => self.write(dst()?, flag(a > b))?,
            Operation::GreaterThanOrEqual => self.write(dst()?, flag(a >= b))?,
            Operation::LesserThan => self.write(dst()?, flag(a < b))?,
            Operation::LesserThanOrEqual => self.write(dst()?, flag(a <= b))?,
            Operation::Push => {
                let value = self.read(dst()?.into())?;
                self.stack.push(value)?;
            }
            Operation::Pop => {
                let dst = dst()?;
                let value = self.stack.pop()?;
                if let Err(fault) = self.write(dst, value) {
                    // The value stays on the stack when it could not be stored.
                    self.stack.push(value)?;
                    return Err(fault);
                }
            }
            Operation::Peek => {
                let dst = dst()?;
                self.read(dst.into())?;
                let value = self.stack.peek()?;
                self.write(dst, value)?;
            }
            Operation::Jump => return Ok(Flow::Jump(find_line(program, a)?)),
            Operation::JumpReturnAddress => {
                let target = find_line(program, a)?;
                self.return_address = program
                    .iter()
                    .find(|i| i.line > ins.line + 1)
                    .map_or(0.0, |i| i.line as f32);
                return Ok(Flow::Jump(target));
            }
            Operation::Ret => return Ok(Flow::Halt),
        }
        Ok(Flow::Next)
    }

    /// Operand resolution.
    fn read(&mut self, operand: Operand) -> Result<f32, FaultKind> {
        match operand {
            Operand::Literal(value) => Ok(value),
            Operand::StackPointer => Ok(self.stack.pointer() as f32),
            Operand::ReturnAddress => Ok(self.return_address),
            Operand::Register(index) => self.registers.get(index),
            Operand::Device(addr) => self
                .device(addr.slot)?
                .try_read(addr.register)
                .ok_or(FaultKind::DeviceFailed),
        }
    }

    /// Destination resolution.
    fn write(&mut self, dst: Destination, value: f32) -> Result<(), FaultKind> {
        match dst {
            Destination::Register(index) => self.registers.set(index, value),
            Destination::StackPointer => self.stack.set_pointer(value),
            Destination::ReturnAddress => {
                self.return_address = value;
                Ok(())
            }
            Destination::Device(addr) => {
                if self.device(addr.slot)?.try_write(addr.register, value) {
                    Ok(())
                } else {
                    Err(FaultKind::DeviceFailed)
                }
            }
        }
    }

    fn device(&mut self, slot: u16) -> Result<&mut (dyn Device + 'd), FaultKind> {
        self.devices
            .get_mut(slot as usize)
            .ok_or(FaultKind::DeviceOverflow)?
            .as_deref_mut()
            .ok_or(FaultKind::DeviceUnplugged)
    }
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn flag(condition: bool) -> f32 {
    if condition { 1.0 } else { 0.0 }
}

/// Arithmetic results must stay numbers.
fn non_nan(value: f32) -> Result<f32, FaultKind> {
    if value.is_nan() {
        Err(FaultKind::NaN)
    } else {
        Ok(value)
    }
}

/// Maps a jump operand to the index of the instruction written on that source line.
fn find_line(program: &[Instruction], target: f32) -> Result<usize, FaultKind> {
    if !(target.is_finite() && target >= 0.0 && target.fract() == 0.0) {
        return Err(FaultKind::InvalidJump);
    }
    let line = target as usize;
    program
        .iter()
        .position(|ins| ins.line == line)
        .ok_or(FaultKind::InvalidJump)
}
