//! Console device: the guest's keyboard input, status, and character output
//! ports, plus the file-sourcing mode that feeds a text file to the guest as
//! if it were typed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alta_keyboard::Keyboard;
use alta_storage::{Volume, VolumeFile};
use tracing::warn;

use crate::io::{IoPortBus, PortIoDevice};

/// Input status port: 0x00 when a character is ready, 0x01 when busy.
pub const CON_STATUS_PORT: u8 = 0x00;
/// Input data port; also accepts output writes.
pub const CON_DATA_PORT: u8 = 0x01;
/// Aliased status port with the opposite polarity: 0x7F ready, 0xFF busy.
pub const CON_STATUS_ALT_PORT: u8 = 0x10;
/// Aliased data port, paired with [`CON_STATUS_ALT_PORT`].
pub const CON_DATA_ALT_PORT: u8 = 0x11;
/// Output-only console port.
pub const CON_OUT_PORT: u8 = 0x18;

/// Typing this character (control-I) switches console input to sourcing from
/// a file: the device prompts for a name and then feeds the file's bytes to
/// the guest as keystrokes.
pub const SOURCE_TRIGGER: u8 = 0x09;

/// Byte sink for guest-visible console output.
///
/// Rendering lives outside this subsystem; hosts hand in whatever sink drives
/// their display. `Vec<u8>` implements the trait for capture in tests.
pub trait ConsoleOutput {
    fn write_byte(&mut self, byte: u8);

    fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }
}

impl ConsoleOutput for Vec<u8> {
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

/// Console output to the host's stdout. Write failures are swallowed: the
/// guest has no notion of a fallible console.
impl ConsoleOutput for std::io::Stdout {
    fn write_byte(&mut self, byte: u8) {
        use std::io::Write;
        let _ = self.write_all(&[byte]);
        let _ = self.flush();
    }
}

pub type SharedConsoleOutput = Rc<RefCell<dyn ConsoleOutput>>;

/// Most recent uppercase letter decoded from console input.
///
/// The tape device names its file after this letter, so the cell is created
/// by the host and threaded into both devices; the console's data-port read
/// path is its only writer. Starts as `A` so a tape session before the first
/// typed letter still has a usable name.
#[derive(Clone)]
pub struct LastAlpha(Rc<Cell<u8>>);

impl LastAlpha {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(b'A')))
    }

    pub fn get(&self) -> u8 {
        self.0.get()
    }

    pub fn set(&self, letter: u8) {
        self.0.set(letter);
    }
}

impl Default for LastAlpha {
    fn default() -> Self {
        Self::new()
    }
}

struct Console {
    keyboard: Keyboard,
    key_ready: Arc<AtomicBool>,
    volume: Rc<dyn Volume>,
    out: SharedConsoleOutput,
    last_alpha: LastAlpha,
    source_dir: String,
    source: Option<Box<dyn VolumeFile>>,
}

/// The console device behind its five ports.
///
/// One shared state serves every port, so all five registrations hand out
/// clones of the same `Rc<RefCell<...>>` handle.
#[derive(Clone)]
pub struct ConsolePorts {
    inner: Rc<RefCell<Console>>,
}

impl ConsolePorts {
    /// `key_ready` is the flag the keyboard poller raises via its
    /// key-available callback; the console clears it whenever input is
    /// consumed.
    pub fn new(
        keyboard: Keyboard,
        key_ready: Arc<AtomicBool>,
        volume: Rc<dyn Volume>,
        out: SharedConsoleOutput,
        last_alpha: LastAlpha,
        source_dir: impl Into<String>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Console {
                keyboard,
                key_ready,
                volume,
                out,
                last_alpha,
                source_dir: source_dir.into(),
                source: None,
            })),
        }
    }

    pub fn register(&self, bus: &mut IoPortBus) {
        for port in [
            CON_STATUS_PORT,
            CON_DATA_PORT,
            CON_STATUS_ALT_PORT,
            CON_DATA_ALT_PORT,
            CON_OUT_PORT,
        ] {
            bus.register(
                port,
                Box::new(ConsolePort {
                    inner: self.inner.clone(),
                }),
            );
        }
    }
}

#[derive(Clone)]
struct ConsolePort {
    inner: Rc<RefCell<Console>>,
}

impl PortIoDevice for ConsolePort {
    fn read(&mut self, port: u8) -> u8 {
        let mut console = self.inner.borrow_mut();
        match port {
            // The two status ports encode ready/busy with opposite
            // polarities; callers pair each with its own data port.
            CON_STATUS_PORT => {
                if console.input_pending() {
                    0x00
                } else {
                    0x01
                }
            }
            CON_STATUS_ALT_PORT => {
                if console.input_pending() {
                    0x7F
                } else {
                    0xFF
                }
            }
            CON_DATA_PORT | CON_DATA_ALT_PORT => console.read_data(),
            _ => 0x00,
        }
    }

    fn write(&mut self, port: u8, value: u8) {
        match port {
            CON_DATA_PORT | CON_DATA_ALT_PORT | CON_OUT_PORT => {
                self.inner.borrow_mut().write_output(value);
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        let mut console = self.inner.borrow_mut();
        console.source = None;
        console.key_ready.store(false, Ordering::SeqCst);
    }
}

impl Console {
    fn input_pending(&self) -> bool {
        self.key_ready.load(Ordering::SeqCst) || self.source.is_some()
    }

    /// Console output is seven-bit; the high bit is masked off.
    fn write_output(&mut self, value: u8) {
        self.out.borrow_mut().write_byte(value & 0x7F);
    }

    fn read_data(&mut self) -> u8 {
        if self.source.is_some() {
            self.key_ready.store(false, Ordering::SeqCst);
            return self.next_source_byte();
        }

        if !self.key_ready.load(Ordering::SeqCst) {
            // Callers poll the status port first; an unannounced read gets a
            // default byte rather than blocking.
            return 0x00;
        }
        self.key_ready.store(false, Ordering::SeqCst);

        let ch = self.keyboard.read_char();
        if ch == 0x0A {
            return 0x0D;
        }
        if ch == SOURCE_TRIGGER {
            return self.begin_source();
        }

        // The interpreter's keywords are all uppercase, so plain typing
        // should produce uppercase: swap letter case, and remember the
        // uppercase form for tape file naming.
        match ch {
            b'A'..=b'Z' => {
                self.last_alpha.set(ch);
                ch.to_ascii_lowercase()
            }
            b'a'..=b'z' => {
                let upper = ch.to_ascii_uppercase();
                self.last_alpha.set(upper);
                upper
            }
            _ => ch,
        }
    }

    /// One byte from the active source file. A short read substitutes a
    /// carriage return and ends the session.
    fn next_source_byte(&mut self) -> u8 {
        let Some(file) = self.source.as_mut() else {
            return 0x0D;
        };
        let mut byte = [0u8; 1];
        match file.read(&mut byte) {
            Ok(1) => byte[0],
            Ok(_) => self.end_source(),
            Err(err) => {
                warn!("source file read failed: {err}");
                self.end_source()
            }
        }
    }

    fn end_source(&mut self) -> u8 {
        self.source = None;
        self.out.borrow_mut().write_str("\nDone sourcing\n");
        0x0D
    }

    /// Prompts for a file name (echoing keystrokes; `_` rubs out the previous
    /// character; carriage return finishes), opens it as the source session,
    /// and returns its first byte.
    fn begin_source(&mut self) -> u8 {
        {
            let mut out = self.out.borrow_mut();
            out.write_str("Enter file name to source: ");
            out.write_str(&self.source_dir);
        }

        let mut name = String::new();
        loop {
            let ch = self.keyboard.read_char();
            if ch == 0x0D {
                break;
            }
            self.out.borrow_mut().write_byte(ch);
            if ch == b'_' {
                name.pop();
            } else {
                name.push(ch as char);
            }
        }

        let path = format!("{}{}", self.source_dir, name);
        {
            let mut out = self.out.borrow_mut();
            out.write_str("Opening ");
            out.write_str(&path);
            out.write_byte(b'\n');
        }

        match self.volume.open(&path) {
            Ok(file) => {
                self.source = Some(file);
                self.next_source_byte()
            }
            Err(err) => {
                warn!("cannot open source file {path}: {err}");
                0x0D
            }
        }
    }
}
