//! Tape device: file-backed sequential storage behind two I/O ports.
//!
//! The guest saves and loads programs through these ports as though a paper
//! tape were attached. The backing file is named `tape_<LETTER>.dat` after
//! the most recent uppercase letter typed at the console, so "mount tape B"
//! is simply typing a word containing `B` before touching the tape ports.

use std::cell::RefCell;
use std::rc::Rc;

use alta_storage::{Volume, VolumeFile};
use tracing::warn;

use crate::console::{LastAlpha, SharedConsoleOutput};
use crate::io::{IoPortBus, PortIoDevice};

/// Tape status port: always 0x00, the tape is always ready.
pub const TAPE_STATUS_PORT: u8 = 0x06;
/// Tape data port: reads pull from the tape file, writes append to it.
pub const TAPE_DATA_PORT: u8 = 0x07;

/// A writer terminates its tape by emitting three consecutive zero bytes.
const END_OF_TAPE_RUN: [u8; 3] = [0, 0, 0];

enum TapeSession {
    Read(Box<dyn VolumeFile>),
    Write {
        file: Box<dyn VolumeFile>,
        /// Last three bytes the guest emitted this session.
        window: [u8; 3],
    },
}

struct Tape {
    volume: Rc<dyn Volume>,
    tape_dir: String,
    last_alpha: LastAlpha,
    out: SharedConsoleOutput,
    session: Option<TapeSession>,
}

/// The tape device behind its two ports.
#[derive(Clone)]
pub struct TapePorts {
    inner: Rc<RefCell<Tape>>,
}

impl TapePorts {
    pub fn new(
        volume: Rc<dyn Volume>,
        out: SharedConsoleOutput,
        last_alpha: LastAlpha,
        tape_dir: impl Into<String>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Tape {
                volume,
                tape_dir: tape_dir.into(),
                last_alpha,
                out,
                session: None,
            })),
        }
    }

    pub fn register(&self, bus: &mut IoPortBus) {
        for port in [TAPE_STATUS_PORT, TAPE_DATA_PORT] {
            bus.register(
                port,
                Box::new(TapePort {
                    inner: self.inner.clone(),
                }),
            );
        }
    }
}

#[derive(Clone)]
struct TapePort {
    inner: Rc<RefCell<Tape>>,
}

impl PortIoDevice for TapePort {
    fn read(&mut self, port: u8) -> u8 {
        match port {
            TAPE_STATUS_PORT => 0x00,
            TAPE_DATA_PORT => self.inner.borrow_mut().read_data(),
            _ => 0x00,
        }
    }

    fn write(&mut self, port: u8, value: u8) {
        if port == TAPE_DATA_PORT {
            self.inner.borrow_mut().write_data(value);
        }
    }

    fn reset(&mut self) {
        self.inner.borrow_mut().session = None;
    }
}

impl Tape {
    fn file_path(&self) -> String {
        format!(
            "{}tape_{}.dat",
            self.tape_dir,
            self.last_alpha.get() as char
        )
    }

    /// Next byte of the tape file, opening it on first access. Exhausting the
    /// file ends the session and yields 0; a fresh access afterwards re-opens
    /// whatever file the current last-typed letter names.
    fn read_data(&mut self) -> u8 {
        if self.session.is_none() {
            let path = self.file_path();
            match self.volume.open(&path) {
                Ok(file) => self.session = Some(TapeSession::Read(file)),
                Err(err) => {
                    warn!("cannot open {path} for tape read: {err}");
                    return 0;
                }
            }
        }

        match self.session.as_mut() {
            Some(TapeSession::Read(file)) => {
                let mut byte = [0u8; 1];
                match file.read(&mut byte) {
                    Ok(1) => byte[0],
                    Ok(_) => {
                        self.session = None;
                        0
                    }
                    Err(err) => {
                        warn!("tape read failed: {err}");
                        0
                    }
                }
            }
            Some(TapeSession::Write { .. }) => {
                warn!("tape read while a tape write is in progress");
                0
            }
            None => 0,
        }
    }

    /// Appends one byte, creating a fresh (truncated) tape file on first
    /// access. Three consecutive zero bytes are the end-of-tape marker: the
    /// file is closed and the session ends.
    fn write_data(&mut self, value: u8) {
        if self.session.is_none() {
            let path = self.file_path();
            // A previous take with the same name may exist; replace it.
            let _ = self.volume.remove(&path);
            match self.volume.create(&path) {
                Ok(file) => {
                    self.session = Some(TapeSession::Write {
                        file,
                        window: [0xFF; 3],
                    });
                }
                Err(err) => {
                    warn!("cannot create {path} for tape write: {err}");
                    return;
                }
            }
        }

        let Some(TapeSession::Write { file, window }) = self.session.as_mut() else {
            warn!("tape write while a tape read is in progress");
            return;
        };

        match file.write(&[value]) {
            Ok(1) => {}
            Ok(n) => warn!("short tape write: {n} of 1 bytes"),
            Err(err) => warn!("tape write failed: {err}"),
        }

        // The marker tracks bytes the guest emitted, whether or not they
        // landed on storage.
        *window = [window[1], window[2], value];
        if *window == END_OF_TAPE_RUN {
            self.session = None;
            self.out.borrow_mut().write_str("Wrote tape file.\n");
        }
    }
}
