//! Machine integration: wires the virtual peripherals to the CPU core and
//! owns the fetch-execute loop.
//!
//! [`Machine`] composes the guest address space, the port I/O bus with the
//! console and tape devices registered, and the host signal flags.
//! [`Machine::boot`] prepares a run (clear memory, reset the CPU, load the
//! program, aim the program counter); [`Machine::run`] then steps the CPU
//! indefinitely. The only way out is the power key: the keyboard poller
//! raises the power-off signal and the loop returns [`RunExit::PowerOff`] for
//! the host to act on. Everything else — break handling included — is the
//! host's business via [`HostSignals`].
#![forbid(unsafe_code)]

mod cpu;
mod loader;
mod memory;

use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use alta_devices::{ConsolePorts, IoPortBus, LastAlpha, SharedConsoleOutput, TapePorts};
use alta_keyboard::{HostSignals, Keyboard};
use alta_storage::Volume;

pub use cpu::{Cpu, CpuBus};
pub use loader::{load_program, LoadError};
pub use memory::{AddressSpace, ADDRESS_SPACE_SIZE};

/// Instructions per [`Machine::run`] scheduling slice.
const SLICE_INST_BUDGET: u64 = 100_000;

/// Machine configuration.
///
/// The defaults reproduce the reference system's layout: the interpreter
/// image loads at address zero, source files live under `/Altair/`, and tape
/// files under `/Altair/tapes/`.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Program image copied into guest memory before execution.
    pub program_path: String,
    /// Guest address the image is loaded at; also the entry point.
    pub load_base: u16,
    /// Directory prefix for source-injection files.
    pub source_dir: String,
    /// Directory prefix for tape files.
    pub tape_dir: String,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            program_path: "/Altair/basicload.bin".to_string(),
            load_base: 0,
            source_dir: "/Altair/".to_string(),
            tape_dir: "/Altair/tapes/".to_string(),
        }
    }
}

/// Why a run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The instruction budget for this slice was exhausted.
    InstLimit,
    /// The power-off signal is pending; the host owns shutdown from here.
    PowerOff,
}

/// The assembled machine: guest memory, port-mapped peripherals, and the
/// signal flags shared with the keyboard poller.
pub struct Machine {
    config: MachineConfig,
    pub memory: AddressSpace,
    pub io: IoPortBus,
    signals: Arc<HostSignals>,
}

struct MachineBus<'a> {
    memory: &'a mut AddressSpace,
    io: &'a mut IoPortBus,
}

impl CpuBus for MachineBus<'_> {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.memory.read(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.memory.write(addr, value);
    }

    fn port_in(&mut self, port: u8) -> u8 {
        self.io.read(port)
    }

    fn port_out(&mut self, port: u8, value: u8) {
        self.io.write(port, value);
    }
}

impl Machine {
    /// Builds the machine and registers the console and tape devices.
    ///
    /// `keyboard` is the consumer handle from the keyboard driver and
    /// `key_ready` the flag its key-available callback raises; `signals` is
    /// the same set the poller raises break/power on. The last-typed-letter
    /// cell that couples console decoding to tape naming is created here and
    /// threaded into both devices.
    pub fn new(
        config: MachineConfig,
        volume: Rc<dyn Volume>,
        keyboard: Keyboard,
        key_ready: Arc<AtomicBool>,
        signals: Arc<HostSignals>,
        console_out: SharedConsoleOutput,
    ) -> Self {
        let mut io = IoPortBus::new();
        let last_alpha = LastAlpha::new();

        ConsolePorts::new(
            keyboard,
            key_ready,
            volume.clone(),
            console_out.clone(),
            last_alpha.clone(),
            config.source_dir.clone(),
        )
        .register(&mut io);

        TapePorts::new(volume, console_out, last_alpha, config.tape_dir.clone()).register(&mut io);

        Self {
            config,
            memory: AddressSpace::new(),
            io,
            signals,
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn signals(&self) -> &Arc<HostSignals> {
        &self.signals
    }

    /// Prepares a run: clears memory and devices, resets the CPU, loads the
    /// program image, and points the program counter at the entry.
    ///
    /// Any load failure aborts the run with memory already cleared.
    pub fn boot(&mut self, cpu: &mut dyn Cpu, volume: &dyn Volume) -> Result<(), LoadError> {
        self.memory.clear();
        self.io.reset();
        cpu.reset();
        load_program(
            volume,
            &self.config.program_path,
            &mut self.memory,
            self.config.load_base,
        )?;
        cpu.set_pc(self.config.load_base);
        Ok(())
    }

    /// Steps the CPU for at most `max_insts` instructions.
    ///
    /// The pending power-off signal is checked between instructions; it is
    /// reported, not consumed — clearing it belongs to the host component
    /// that performs the shutdown.
    pub fn run_slice(&mut self, cpu: &mut dyn Cpu, max_insts: u64) -> RunExit {
        for _ in 0..max_insts {
            if self.signals.power_off_pending() {
                return RunExit::PowerOff;
            }
            let mut bus = MachineBus {
                memory: &mut self.memory,
                io: &mut self.io,
            };
            cpu.step(&mut bus);
        }
        RunExit::InstLimit
    }

    /// The fetch-execute loop. Runs until power-off is requested; there is no
    /// other termination path.
    pub fn run(&mut self, cpu: &mut dyn Cpu) -> RunExit {
        loop {
            if let RunExit::PowerOff = self.run_slice(cpu, SLICE_INST_BUDGET) {
                return RunExit::PowerOff;
            }
        }
    }
}
