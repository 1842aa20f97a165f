//! Boundary to the CPU instruction-set emulator.
//!
//! The CPU core itself lives outside this workspace; the execution driver
//! only needs to reset it, aim its program counter, and step it against the
//! machine's memory and port space.

/// The memory and port window the machine supplies to the CPU core.
pub trait CpuBus {
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);
    fn port_in(&mut self, port: u8) -> u8;
    fn port_out(&mut self, port: u8, value: u8);
}

/// The CPU core, consumed opaquely.
///
/// `step` executes one instruction, performing all of its memory and port
/// traffic through the bus it is handed.
pub trait Cpu {
    /// Returns registers and internal state to their power-on values.
    fn reset(&mut self);

    fn set_pc(&mut self, pc: u16);

    fn step(&mut self, bus: &mut dyn CpuBus);
}
