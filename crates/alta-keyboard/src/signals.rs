use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide interrupt signals raised by the keyboard poller.
///
/// The break key raises the user-break signal and the power key raises the
/// power-off signal, ahead of (and independent of) the buffered character
/// stream. The poller only ever raises; the host component that acts on a
/// signal clears it with the `take_*` methods.
#[derive(Debug, Default)]
pub struct HostSignals {
    user_break: AtomicBool,
    power_off: AtomicBool,
}

impl HostSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise_user_break(&self) {
        self.user_break.store(true, Ordering::SeqCst);
    }

    pub fn user_break_pending(&self) -> bool {
        self.user_break.load(Ordering::SeqCst)
    }

    /// Consumes the user-break signal, returning whether it was raised.
    pub fn take_user_break(&self) -> bool {
        self.user_break.swap(false, Ordering::SeqCst)
    }

    pub fn raise_power_off(&self) {
        self.power_off.store(true, Ordering::SeqCst);
    }

    pub fn power_off_pending(&self) -> bool {
        self.power_off.load(Ordering::SeqCst)
    }

    /// Consumes the power-off signal, returning whether it was raised.
    pub fn take_power_off(&self) -> bool {
        self.power_off.swap(false, Ordering::SeqCst)
    }
}
