#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

// Must come first so the logging macros are visible in the other modules.
#[macro_use]
mod fmt;

#[cfg(feature = "async-await")]
pub(crate) mod atomic_waker;
pub mod circular_buffer;
mod driver;
pub mod registers;
pub mod signal;

pub use circular_buffer::{BUFFER_CAPACITY, CircularBuffer};
pub use driver::{Uart, Writer};
pub use registers::{FIFO_CAPACITY, Interrupts, Registers, RxWatermark, TxWatermark};
pub use signal::{Event, Irq, Platform, Semaphore, Signals};

/// Error returned by the client operations of [`Uart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An internal invariant did not hold, e.g. a read finished its wait with
    /// nothing to copy. This is a defect in the driver.
    AssertionFailed,
    /// The requested transfer is empty or larger than the dataport. Nothing
    /// was transferred; retry with a valid size.
    OutOfBounds,
}

impl Error {
    /// Numeric code reported to clients over a raw interface.
    pub const fn code(self) -> isize {
        match self {
            Self::AssertionFailed => -1,
            Self::OutOfBounds => -2,
        }
    }
}

/// Error returned by [`Uart::new`] when the configuration cannot be programmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// The peripheral clock frequency is zero.
    InvalidClock,
    /// The baud divisor does not fit the 16-bit NCO field.
    DivisorOverflow,
}

/// Settings fixed when the driver is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Line rate in bits per second.
    pub baud_rate: u64,
    /// Frequency of the peripheral clock feeding the UART.
    pub clock_hz: u64,
    /// RX FIFO level that raises the RX watermark interrupt.
    ///
    /// One byte lets a reader blocked on a single keystroke return as soon as
    /// it arrives.
    pub rx_watermark: RxWatermark,
    /// TX FIFO level below which the TX watermark interrupt fires.
    pub tx_watermark: TxWatermark,
    /// Size of the shared buffer used to exchange bytes with clients.
    pub dataport_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            clock_hz: 48_000_000,
            rx_watermark: RxWatermark::Level1,
            tx_watermark: TxWatermark::Level16,
            dataport_capacity: 4096,
        }
    }
}
