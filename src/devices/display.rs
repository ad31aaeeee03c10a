use crate::devices::as_index;
use crate::virtual_machine::device::Device;

/// Write a character code at the cursor and advance it.
pub const REG_CHAR: u16 = 0;
/// Read or move the cursor.
pub const REG_CURSOR: u16 = 1;
/// Any write clears the screen and homes the cursor.
pub const REG_CLEAR: u16 = 2;
/// Read-only buffer capacity.
pub const REG_CAPACITY: u16 = 3;

/// Fixed-width character display.
#[derive(Debug)]
pub struct Display {
    cells: Vec<char>,
    cursor: usize,
}

impl Display {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![' '; capacity],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rendered contents with trailing blanks removed.
    pub fn text(&self) -> String {
        let text: String = self.cells.iter().collect();
        text.trim_end().to_string()
    }

    pub fn clear(&mut self) {
        self.cells.fill(' ');
        self.cursor = 0;
    }

    fn put(&mut self, code: f32) -> bool {
        let Some(c) = as_index(code).and_then(|v| char::from_u32(v as u32)) else {
            return false;
        };
        match self.cells.get_mut(self.cursor) {
            Some(cell) => {
                *cell = c;
                self.cursor += 1;
                true
            }
            None => false,
        }
    }
}

impl Device for Display {
    fn try_read(&mut self, register: u16) -> Option<f32> {
        match register {
            REG_CURSOR => Some(self.cursor as f32),
            REG_CAPACITY => Some(self.capacity() as f32),
            _ => None,
        }
    }

    fn try_write(&mut self, register: u16, value: f32) -> bool {
        match register {
            REG_CHAR => self.put(value),
            REG_CURSOR => match as_index(value) {
                Some(pos) if pos < self.capacity() => {
                    self.cursor = pos;
                    true
                }
                _ => false,
            },
            REG_CLEAR => {
                self.clear();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::assembler::assemble_source;
    use crate::virtual_machine::errors::FaultKind;
    use crate::virtual_machine::vm::{MachineConfig, VM};

    #[test]
    fn writes_advance_cursor() {
        let mut display = Display::new(4);
        assert!(display.try_write(REG_CHAR, 'h' as u32 as f32));
        assert!(display.try_write(REG_CHAR, 'i' as u32 as f32));
        assert_eq!(display.cursor(), 2);
        assert_eq!(display.try_read(REG_CURSOR), Some(2.0));
        assert_eq!(display.text(), "hi");
    }

    #[test]
    fn full_buffer_refuses() {
        let mut display = Display::new(1);
        assert!(display.try_write(REG_CHAR, 65.0));
        assert!(!display.try_write(REG_CHAR, 66.0));
        assert_eq!(display.text(), "A");
    }

    #[test]
    fn invalid_code_points_refused() {
        let mut display = Display::new(4);
        assert!(!display.try_write(REG_CHAR, -1.0));
        assert!(!display.try_write(REG_CHAR, 65.5));
        assert!(!display.try_write(REG_CHAR, 0xD800 as f32));
        assert_eq!(display.cursor(), 0);
    }

    #[test]
    fn cursor_moves_within_buffer() {
        let mut display = Display::new(3);
        assert!(display.try_write(REG_CURSOR, 2.0));
        assert!(display.try_write(REG_CHAR, 'x' as u32 as f32));
        assert_eq!(display.text(), "  x");
        assert!(!display.try_write(REG_CURSOR, 3.0));
    }

    #[test]
    fn clear_resets() {
        let mut display = Display::new(3);
        display.try_write(REG_CHAR, 'a' as u32 as f32);
        assert!(display.try_write(REG_CLEAR, 0.0));
        assert_eq!(display.text(), "");
        assert_eq!(display.cursor(), 0);
    }

    #[test]
    fn register_directions() {
        let mut display = Display::new(8);
        assert_eq!(display.try_read(REG_CAPACITY), Some(8.0));
        assert!(!display.try_write(REG_CAPACITY, 1.0));
        assert_eq!(display.try_read(REG_CHAR), None);
        assert_eq!(display.try_read(REG_CLEAR), None);
    }

    #[test]
    fn program_prints_through_slot() {
        let source = "mov d0:0 72\nmov d0:0 105\nmov r0 d0:1";
        let program = assemble_source(source).unwrap();
        let mut display = Display::new(16);
        {
            let mut vm = VM::new(MachineConfig::default());
            vm.attach(0, &mut display);
            vm.run(&program, None).unwrap();
            assert_eq!(vm.registers()[0], 2.0);
        }
        assert_eq!(display.text(), "Hi");
    }

    #[test]
    fn overflowing_display_faults_the_program() {
        let program = assemble_source("mov d0:0 65\nmov d0:0 66").unwrap();
        let mut vm = VM::new(MachineConfig::default());
        vm.attach(0, Display::new(1));
        assert_eq!(
            vm.run(&program, None).unwrap_err().kind,
            FaultKind::DeviceFailed
        );
    }
}
