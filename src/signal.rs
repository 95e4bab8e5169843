//! Synchronization and interrupt services the driver consumes from its platform.

use core::cell::Cell;

use critical_section::Mutex;

use crate::registers::Interrupts;

/// Conditions a blocked side waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The RX buffer received data. Wakes blocked readers.
    RxNonEmpty,
    /// A reader drained the RX buffer. Wakes the RX handler parked on a full buffer.
    RxEmpty,
    /// The TX buffer has free space. Wakes blocked writers.
    TxHasSpace,
}

/// Interrupt sources with a handler entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Irq {
    /// TX FIFO below its watermark.
    TxWatermark,
    /// RX FIFO at its watermark.
    RxWatermark,
    /// TX FIFO empty.
    TxEmpty,
}

impl Irq {
    /// Status bit of this source.
    pub const fn mask(self) -> Interrupts {
        match self {
            Self::TxWatermark => Interrupts::TX_WATERMARK,
            Self::RxWatermark => Interrupts::RX_WATERMARK,
            Self::TxEmpty => Interrupts::TX_EMPTY,
        }
    }
}

/// Platform primitives used by [`Uart`](crate::Uart).
///
/// `wait` and `post` have counting semaphore semantics per [`Event`]: a post
/// with no waiter is remembered and satisfies the next wait. Callers always
/// recheck their condition after a wait returns.
///
/// None of these return errors. A primitive that fails is a defect in the
/// system and the implementation must panic.
pub trait Platform {
    /// Blocks until `event` is posted.
    fn wait(&self, event: Event);

    /// Posts `event`, waking one waiter.
    fn post(&self, event: Event);

    /// Tells the platform that the handler of `irq` has finished.
    fn acknowledge(&self, irq: Irq);
}

impl<T: Platform + ?Sized> Platform for &T {
    fn wait(&self, event: Event) {
        (**self).wait(event)
    }
    fn post(&self, event: Event) {
        (**self).post(event)
    }
    fn acknowledge(&self, irq: Irq) {
        (**self).acknowledge(irq)
    }
}

/// Counting semaphore guarded by a critical section.
///
/// `wait` spins, so it suits platforms where handlers run in their own
/// preemptible threads.
pub struct Semaphore {
    count: Mutex<Cell<u32>>,
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl Semaphore {
    /// Creates a semaphore with a count of zero.
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(Cell::new(0)),
        }
    }

    /// Takes one count if available.
    pub fn try_wait(&self) -> bool {
        critical_section::with(|cs| {
            let count = self.count.borrow(cs);
            match count.get() {
                0 => false,
                n => {
                    count.set(n - 1);
                    true
                }
            }
        })
    }

    /// Blocks until a count can be taken.
    pub fn wait(&self) {
        while !self.try_wait() {
            core::hint::spin_loop();
        }
    }

    /// Adds one count.
    pub fn post(&self) {
        critical_section::with(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().saturating_add(1));
        });
    }

    /// Current count.
    pub fn count(&self) -> u32 {
        critical_section::with(|cs| self.count.borrow(cs).get())
    }
}

/// One [`Semaphore`] per [`Event`].
///
/// A [`Platform`] implementation can keep one of these and delegate its
/// `wait` and `post` to it.
#[derive(Default)]
pub struct Signals {
    rx_nonempty: Semaphore,
    rx_empty: Semaphore,
    tx_has_space: Semaphore,
}

impl Signals {
    /// Creates the three semaphores, all at zero.
    pub const fn new() -> Self {
        Self {
            rx_nonempty: Semaphore::new(),
            rx_empty: Semaphore::new(),
            tx_has_space: Semaphore::new(),
        }
    }

    /// The semaphore backing `event`.
    pub fn get(&self, event: Event) -> &Semaphore {
        match event {
            Event::RxNonEmpty => &self.rx_nonempty,
            Event::RxEmpty => &self.rx_empty,
            Event::TxHasSpace => &self.tx_has_space,
        }
    }

    /// Blocks until `event` is posted.
    pub fn wait(&self, event: Event) {
        self.get(event).wait();
    }

    /// Posts `event`.
    pub fn post(&self, event: Event) {
        self.get(event).post();
    }
}
