//! Virtual peripherals behind the emulated CPU's port space.
//!
//! The guest software was written for a machine with a serial console and a
//! paper-tape interface; neither exists on this hardware. This crate supplies
//! them: an [`IoPortBus`] routes the CPU's single-byte port accesses to the
//! console device (live keyboard input, character output, file sourcing) and
//! the tape device (file-backed sequential storage).
//!
//! Device failures never reach the guest. Filesystem problems are reported on
//! the diagnostic channel (`tracing`) and the access degrades to a default
//! byte; the emulated program has no way to observe a hardware fault and
//! simply keeps running.
#![forbid(unsafe_code)]

mod console;
mod io;
mod tape;

pub use console::{
    ConsoleOutput, ConsolePorts, LastAlpha, SharedConsoleOutput, CON_DATA_ALT_PORT, CON_DATA_PORT,
    CON_OUT_PORT, CON_STATUS_ALT_PORT, CON_STATUS_PORT, SOURCE_TRIGGER,
};
pub use io::{IoPortBus, PortIoDevice};
pub use tape::{TapePorts, TAPE_DATA_PORT, TAPE_STATUS_PORT};
