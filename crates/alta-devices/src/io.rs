use std::collections::HashMap;

use tracing::debug;

/// A device mapped at one or more I/O ports.
///
/// The emulated CPU's port space is eight bits wide and every access moves a
/// single byte, so the interface is deliberately narrower than a PC-style
/// port bus.
pub trait PortIoDevice {
    fn read(&mut self, port: u8) -> u8;
    fn write(&mut self, port: u8, value: u8);

    /// Reset the device back to its power-on state.
    fn reset(&mut self) {}
}

/// Routes the CPU's port accesses to registered devices.
///
/// Dispatch is by exact port number. Accesses to unmapped ports are reported
/// for diagnostics and default benignly: reads return 0x00 (the value the
/// guest software expects from absent devices), writes are dropped.
pub struct IoPortBus {
    devices: HashMap<u8, Box<dyn PortIoDevice>>,
}

impl IoPortBus {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    pub fn register(&mut self, port: u8, device: Box<dyn PortIoDevice>) {
        self.devices.insert(port, device);
    }

    pub fn read(&mut self, port: u8) -> u8 {
        if let Some(device) = self.devices.get_mut(&port) {
            return device.read(port);
        }
        debug!("IN from unmapped port {port:#04x}");
        0x00
    }

    pub fn write(&mut self, port: u8, value: u8) {
        if let Some(device) = self.devices.get_mut(&port) {
            device.write(port, value);
            return;
        }
        debug!("OUT to unmapped port {port:#04x} = {value:#04x}");
    }

    pub fn reset(&mut self) {
        for device in self.devices.values_mut() {
            device.reset();
        }
    }
}

impl Default for IoPortBus {
    fn default() -> Self {
        Self::new()
    }
}
