use crate::devices::DeviceError;
use crate::virtual_machine::assembler::parse_literal;
use crate::virtual_machine::device::Device;

/// Read-only table: register `i` reads entry `i`.
#[derive(Debug)]
pub struct LookupMemory {
    table: Vec<f32>,
}

impl LookupMemory {
    pub fn new(table: Vec<f32>) -> Self {
        Self { table }
    }

    /// Parses whitespace-separated decimal numbers. `#` starts a comment to end of line.
    pub fn parse(text: &str) -> Result<Self, DeviceError> {
        let mut table = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let data = line.split('#').next().unwrap_or_default();
            for token in data.split_whitespace() {
                let value = parse_literal(token).ok_or_else(|| DeviceError::InvalidNumber {
                    line: index + 1,
                    token: token.to_string(),
                })?;
                table.push(value);
            }
        }
        Ok(Self { table })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Device for LookupMemory {
    fn try_read(&mut self, register: u16) -> Option<f32> {
        self.table.get(register as usize).copied()
    }

    fn try_write(&mut self, _register: u16, _value: f32) -> bool {
        false
    }
}
