//! Machine-level integration: boot, the CPU bus window, and the run loop,
//! driven by a scripted CPU in place of the real core.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use alta_devices::{CON_DATA_PORT, CON_OUT_PORT, CON_STATUS_PORT, TAPE_DATA_PORT};
use alta_keyboard::{keys, HostSignals, Keyboard, KeyAvailableCallback, KeyboardPoller};
use alta_machine::{Cpu, CpuBus, LoadError, Machine, MachineConfig, RunExit};
use alta_southbridge::{BusIo, SbRegister, Southbridge};
use alta_storage::MemVolume;

#[derive(Default)]
struct ScriptState {
    events: VecDeque<u16>,
    selected: u8,
}

#[derive(Clone, Default)]
struct ScriptedBus {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBus {
    fn press(&self, code: u8) {
        self.state
            .lock()
            .unwrap()
            .events
            .push_back(1 << 8 | code as u16);
    }
}

impl BusIo for ScriptedBus {
    fn write(&mut self, src: &[u8]) {
        self.state.lock().unwrap().selected = src[0];
    }

    fn read(&mut self, dst: &mut [u8]) {
        let mut state = self.state.lock().unwrap();
        dst.fill(0);
        if state.selected == SbRegister::Fifo.select() {
            if let Some(raw) = state.events.pop_front() {
                dst[0] = (raw >> 8) as u8;
                dst[1] = raw as u8;
            }
        }
    }
}

/// Stands in for the CPU core: each step replays one scripted bus access.
#[derive(Clone, Copy)]
enum Op {
    In(u8),
    Out(u8, u8),
    WriteMem(u16, u8),
    ReadMem(u16),
}

#[derive(Default)]
struct ScriptedCpu {
    ops: VecDeque<Op>,
    pc: u16,
    resets: u32,
    in_bytes: Vec<u8>,
    mem_bytes: Vec<u8>,
}

impl ScriptedCpu {
    fn script(&mut self, ops: &[Op]) {
        self.ops.extend(ops.iter().copied());
    }
}

impl Cpu for ScriptedCpu {
    fn reset(&mut self) {
        self.pc = 0;
        self.resets += 1;
    }

    fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    fn step(&mut self, bus: &mut dyn CpuBus) {
        match self.ops.pop_front() {
            Some(Op::In(port)) => {
                let value = bus.port_in(port);
                self.in_bytes.push(value);
            }
            Some(Op::Out(port, value)) => bus.port_out(port, value),
            Some(Op::WriteMem(addr, value)) => bus.write_byte(addr, value),
            Some(Op::ReadMem(addr)) => {
                let value = bus.read_byte(addr);
                self.mem_bytes.push(value);
            }
            None => {}
        }
    }
}

struct Rig {
    machine: Machine,
    volume: MemVolume,
    out: Rc<RefCell<Vec<u8>>>,
    keys_bus: ScriptedBus,
    poller: KeyboardPoller<ScriptedBus>,
}

impl Rig {
    fn new() -> Self {
        let keys_bus = ScriptedBus::default();
        let key_ready = Arc::new(AtomicBool::new(false));
        let callback = {
            let ready = key_ready.clone();
            Box::new(move || ready.store(true, Ordering::SeqCst)) as KeyAvailableCallback
        };
        let southbridge = Arc::new(Southbridge::new(keys_bus.clone()));
        let signals = Arc::new(HostSignals::new());
        let (keyboard, poller) = Keyboard::new(southbridge, signals.clone(), Some(callback));

        let volume = MemVolume::new();
        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));

        let machine = Machine::new(
            MachineConfig::default(),
            Rc::new(volume.clone()),
            keyboard,
            key_ready,
            signals,
            out.clone(),
        );

        Self {
            machine,
            volume,
            out,
            keys_bus,
            poller,
        }
    }

    fn type_keys(&mut self, codes: &[u8]) {
        for &code in codes {
            self.keys_bus.press(code);
        }
        self.poller.poll();
    }

    fn output(&self) -> Vec<u8> {
        self.out.borrow().clone()
    }
}

#[test]
fn boot_clears_memory_loads_the_image_and_aims_the_pc() {
    let mut rig = Rig::new();
    rig.volume
        .insert("/Altair/basicload.bin", vec![0xC3u8, 0x00, 0x01]);

    let mut cpu = ScriptedCpu::default();
    rig.machine.memory.write(0x4000, 0x99);
    rig.machine.boot(&mut cpu, &rig.volume).unwrap();

    assert_eq!(cpu.resets, 1);
    assert_eq!(cpu.pc, 0);
    assert_eq!(rig.machine.memory.read(0x0000), 0xC3);
    assert_eq!(rig.machine.memory.read(0x0002), 0x01);
    // Stale contents are gone, the ROM sentinel is back.
    assert_eq!(rig.machine.memory.read(0x4000), 0x00);
    assert_eq!(rig.machine.memory.read(0xFFFF), 0xFF);
}

#[test]
fn boot_without_an_image_aborts_with_not_found() {
    let mut rig = Rig::new();
    let mut cpu = ScriptedCpu::default();
    assert!(matches!(
        rig.machine.boot(&mut cpu, &rig.volume),
        Err(LoadError::NotFound(_))
    ));
}

#[test]
fn cpu_bus_window_reaches_ram_and_respects_the_rom_byte() {
    let mut rig = Rig::new();
    let mut cpu = ScriptedCpu::default();
    cpu.script(&[
        Op::WriteMem(0x2000, 0x5A),
        Op::ReadMem(0x2000),
        Op::WriteMem(0xFFFF, 0x00),
        Op::ReadMem(0xFFFF),
    ]);

    assert_eq!(rig.machine.run_slice(&mut cpu, 4), RunExit::InstLimit);
    assert_eq!(cpu.mem_bytes, vec![0x5A, 0xFF]);
}

#[test]
fn scripted_program_drives_console_output_and_tape() {
    let mut rig = Rig::new();
    let mut cpu = ScriptedCpu::default();
    cpu.script(&[
        Op::Out(CON_OUT_PORT, b'H' | 0x80),
        Op::Out(CON_OUT_PORT, b'i'),
        Op::Out(TAPE_DATA_PORT, b'T'),
        Op::Out(TAPE_DATA_PORT, 0x00),
        Op::Out(TAPE_DATA_PORT, 0x00),
        Op::Out(TAPE_DATA_PORT, 0x00),
        Op::In(TAPE_DATA_PORT),
    ]);

    assert_eq!(rig.machine.run_slice(&mut cpu, 7), RunExit::InstLimit);

    let mut expected = b"Hi".to_vec();
    expected.extend_from_slice(b"Wrote tape file.\n");
    assert_eq!(rig.output(), expected);

    // The finished tape reads straight back through the same port.
    assert_eq!(
        rig.volume.contents("/Altair/tapes/tape_A.dat").unwrap(),
        vec![b'T', 0x00, 0x00, 0x00]
    );
    assert_eq!(cpu.in_bytes, vec![b'T']);
}

#[test]
fn typed_keys_reach_the_guest_through_the_status_and_data_ports() {
    let mut rig = Rig::new();
    let mut cpu = ScriptedCpu::default();

    rig.type_keys(&[b'a']);
    cpu.script(&[
        Op::In(CON_STATUS_PORT),
        Op::In(CON_DATA_PORT),
        Op::In(CON_STATUS_PORT),
    ]);
    rig.machine.run_slice(&mut cpu, 3);

    rig.type_keys(&[keys::KEY_ENTER]);
    cpu.script(&[Op::In(CON_STATUS_PORT), Op::In(CON_DATA_PORT)]);
    rig.machine.run_slice(&mut cpu, 2);

    assert_eq!(
        cpu.in_bytes,
        vec![
            0x00, // ready
            b'A', // typed 'a', case-swapped for the interpreter
            0x01, // consumed: busy again
            0x00, // ready after the next key
            0x0D, // enter arrives as carriage return
        ]
    );
}

#[test]
fn run_returns_only_when_power_off_is_requested() {
    let mut rig = Rig::new();
    let mut cpu = ScriptedCpu::default();

    // A bounded slice with nothing pending just exhausts its budget.
    assert_eq!(rig.machine.run_slice(&mut cpu, 10), RunExit::InstLimit);

    rig.type_keys(&[keys::KEY_POWER]);
    assert_eq!(rig.machine.run(&mut cpu), RunExit::PowerOff);

    // The signal is reported, not consumed: shutdown belongs to the host.
    assert!(rig.machine.signals().power_off_pending());
}
