//! Polled keyboard driver.
//!
//! The southbridge only supports polling, so this driver reads the key-event
//! FIFO on a fixed period, decodes press/release transitions into characters,
//! and buffers them for a blocking consumer. Urgent keys bypass the buffer:
//! the break and power keys raise [`HostSignals`] immediately from the
//! polling context.
//!
//! The driver is split along the producer/consumer boundary. A
//! [`KeyboardPoller`] owns the modifier state and runs [`KeyboardPoller::poll`]
//! once per tick (from a timer callback, or the [`KeyboardPoller::spawn`]
//! host thread); a [`Keyboard`] handle is the consumer side. The two share
//! only the atomic character ring, the signals, and an optional key-available
//! notification — no lock crosses the boundary.
#![forbid(unsafe_code)]

pub mod keys;
mod ring;
mod signals;

use std::sync::Arc;
use std::time::Duration;

use alta_southbridge::{BusIo, KeyState, Southbridge};

use crate::ring::CharRing;
pub use crate::signals::HostSignals;

/// Poll period for the key-event FIFO. Frequent enough that the southbridge's
/// own event queue cannot grow without bound under human typing.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Invoked from the polling context each time a character is buffered.
pub type KeyAvailableCallback = Box<dyn Fn() + Send + Sync>;

struct Shared {
    ring: CharRing,
    signals: Arc<HostSignals>,
    on_available: Option<KeyAvailableCallback>,
}

/// Consumer handle onto the decoded character stream.
#[derive(Clone)]
pub struct Keyboard {
    shared: Arc<Shared>,
}

/// Producer side: drains the southbridge FIFO and fills the ring.
pub struct KeyboardPoller<B: BusIo> {
    shared: Arc<Shared>,
    southbridge: Arc<Southbridge<B>>,
    control: bool,
    shift: bool,
}

impl Keyboard {
    /// Builds the consumer/producer pair.
    ///
    /// `on_available` runs in the polling context after each buffered
    /// character; keep it to a flag store.
    pub fn new<B: BusIo>(
        southbridge: Arc<Southbridge<B>>,
        signals: Arc<HostSignals>,
        on_available: Option<KeyAvailableCallback>,
    ) -> (Keyboard, KeyboardPoller<B>) {
        let shared = Arc::new(Shared {
            ring: CharRing::new(),
            signals,
            on_available,
        });
        let keyboard = Keyboard {
            shared: shared.clone(),
        };
        let poller = KeyboardPoller {
            shared,
            southbridge,
            control: false,
            shift: false,
        };
        (keyboard, poller)
    }

    /// Whether a decoded character is buffered.
    pub fn is_available(&self) -> bool {
        !self.shared.ring.is_empty()
    }

    pub fn try_read_char(&self) -> Option<u8> {
        self.shared.ring.pop()
    }

    /// Blocks until the poller decodes a character.
    ///
    /// Cooperative spin: the wait yields rather than sleeping, and there is
    /// no timeout or cancellation.
    pub fn read_char(&self) -> u8 {
        loop {
            if let Some(byte) = self.shared.ring.pop() {
                return byte;
            }
            std::thread::yield_now();
        }
    }
}

impl<B: BusIo> KeyboardPoller<B> {
    /// One timer tick: drain every queued key event, or nothing at all.
    ///
    /// If the bus is busy the whole tick is skipped — the poller must never
    /// block inside its timer context, and a partial drain would leave events
    /// queued longer than one period anyway.
    pub fn poll(&mut self) {
        if !self.southbridge.available() {
            return;
        }

        loop {
            let event = self.southbridge.read_key_event();
            match event.state {
                KeyState::Idle => break,
                KeyState::Pressed => self.on_pressed(event.code),
                KeyState::Released => self.on_released(event.code),
                KeyState::Hold => {}
            }
        }
    }

    fn on_pressed(&mut self, code: u8) {
        match code {
            keys::KEY_MOD_CTRL => self.control = true,
            keys::KEY_MOD_SHL | keys::KEY_MOD_SHR => self.shift = true,
            keys::KEY_BREAK => self.shared.signals.raise_user_break(),
            keys::KEY_POWER => self.shared.signals.raise_power_off(),
            code => {
                let ch = self.decode(code);
                self.shared.ring.push(ch);
                if let Some(notify) = &self.shared.on_available {
                    notify();
                }
            }
        }
    }

    fn on_released(&mut self, code: u8) {
        match code {
            keys::KEY_MOD_CTRL => self.control = false,
            keys::KEY_MOD_SHL | keys::KEY_MOD_SHR => self.shift = false,
            _ => {}
        }
    }

    /// Modifier folding applies to letter keys only: control masks into the
    /// 0x00..=0x1F range, shift clears bit 5 (the key caps label uppercase,
    /// so shift inverts the reported lowercase code). Enter arrives as a line
    /// feed and leaves as a carriage return.
    fn decode(&self, code: u8) -> u8 {
        let mut ch = code;
        if ch.is_ascii_lowercase() {
            if self.control {
                ch &= 0x1F;
            }
            if self.shift {
                ch &= !0x20;
            }
        } else if ch == keys::KEY_ENTER {
            ch = keys::KEY_RETURN;
        }
        ch
    }

    /// Runs the poll loop on a dedicated host thread at [`POLL_INTERVAL`],
    /// the hosted stand-in for a repeating hardware timer.
    pub fn spawn(mut self) -> std::thread::JoinHandle<()>
    where
        B: 'static,
    {
        std::thread::Builder::new()
            .name("keyboard-poll".into())
            .spawn(move || loop {
                self.poll();
                std::thread::sleep(POLL_INTERVAL);
            })
            .expect("spawn keyboard poll thread")
    }
}
