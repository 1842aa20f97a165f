//! Type-ahead buffer shared between the polling context and the consumer.

#[cfg(all(feature = "loom", test))]
use loom::sync::atomic::{AtomicU8, AtomicUsize};
#[cfg(not(all(feature = "loom", test)))]
use std::sync::atomic::{AtomicU8, AtomicUsize};

use std::sync::atomic::Ordering;

/// Number of slots; must be a power of two.
pub const RING_CAPACITY: usize = 32;

const MASK: usize = RING_CAPACITY - 1;

/// Single-producer/single-consumer ring of decoded characters.
///
/// The poller is the only writer of `head` and the slots; the consumer is the
/// only writer of `tail`. Empty iff `head == tail`, which means at most
/// `RING_CAPACITY - 1` bytes can be unread at once. There is no full
/// detection: a producer that outruns the consumer overwrites unread bytes,
/// and lapping all the way around makes the buffer read as empty again.
pub struct CharRing {
    slots: [AtomicU8; RING_CAPACITY],
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl CharRing {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU8::new(0)),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::SeqCst) == self.tail.load(Ordering::SeqCst)
    }

    /// Producer side: store at `head`, then publish the new index.
    pub fn push(&self, byte: u8) {
        let head = self.head.load(Ordering::SeqCst);
        self.slots[head].store(byte, Ordering::SeqCst);
        self.head.store((head + 1) & MASK, Ordering::SeqCst);
    }

    /// Consumer side: `None` when `head == tail`.
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::SeqCst);
        if self.head.load(Ordering::SeqCst) == tail {
            return None;
        }
        let byte = self.slots[tail].load(Ordering::SeqCst);
        self.tail.store((tail + 1) & MASK, Ordering::SeqCst);
        Some(byte)
    }
}

impl Default for CharRing {
    fn default() -> Self {
        Self::new()
    }
}
