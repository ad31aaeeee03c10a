/// Memory-mapped peripheral reachable through a processor slot.
///
/// The processor only sees success or failure; why a device refused an access is its own
/// business and is reported as a plain `DeviceFailed` fault.
pub trait Device {
    /// Reads a device register, or `None` if the register cannot be read.
    fn try_read(&mut self, register: u16) -> Option<f32>;

    /// Writes a device register. Returns `false` if the write was refused.
    fn try_write(&mut self, register: u16, value: f32) -> bool;
}

/// Lets a host attach a borrowed peripheral and inspect it after the run.
impl<D: Device + ?Sized> Device for &mut D {
    fn try_read(&mut self, register: u16) -> Option<f32> {
        (**self).try_read(register)
    }

    fn try_write(&mut self, register: u16, value: f32) -> bool {
        (**self).try_write(register, value)
    }
}
