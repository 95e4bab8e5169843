//! Hardware register interface of the UART peripheral.
//!
//! The driver only talks to the hardware through [`Registers`]. Address
//! arithmetic and volatile accesses stay in the implementation, see
//! [`mmio::Mmio`] for the OpenTitan register block.

use bitflags::bitflags;

use crate::InitError;

pub mod mmio;

/// Depth of each hardware FIFO in bytes.
pub const FIFO_CAPACITY: u32 = 32;

/// Width of the NCO (baud divisor) field in the control register.
const NCO_BITS: u32 = 16;

bitflags! {
    /// Interrupt sources, laid out as in the interrupt state, enable and test
    /// registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interrupts: u32 {
        /// TX FIFO level dropped below the TX watermark.
        const TX_WATERMARK = 1 << 0;
        /// RX FIFO level reached the RX watermark.
        const RX_WATERMARK = 1 << 1;
        /// TX FIFO became empty.
        const TX_EMPTY = 1 << 2;
        /// RX FIFO overflowed.
        const RX_OVERFLOW = 1 << 3;
        /// RX framing error.
        const RX_FRAME_ERR = 1 << 4;
        /// RX break condition.
        const RX_BREAK_ERR = 1 << 5;
        /// RX timeout.
        const RX_TIMEOUT = 1 << 6;
        /// RX parity error.
        const RX_PARITY_ERR = 1 << 7;
    }
}

impl Interrupts {
    /// The sources the driver enables and services.
    pub const SERVICED: Self = Self::TX_WATERMARK
        .union(Self::RX_WATERMARK)
        .union(Self::TX_EMPTY);
}

/// RX FIFO level at which the RX watermark interrupt fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum RxWatermark {
    /// 1 byte.
    Level1 = 0,
    /// 4 bytes.
    Level4 = 1,
    /// 8 bytes.
    Level8 = 2,
    /// 16 bytes.
    Level16 = 3,
    /// 30 bytes.
    Level30 = 4,
}

impl RxWatermark {
    /// Threshold in bytes.
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Level1 => 1,
            Self::Level4 => 4,
            Self::Level8 => 8,
            Self::Level16 => 16,
            Self::Level30 => 30,
        }
    }
}

/// TX FIFO level below which the TX watermark interrupt fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum TxWatermark {
    /// 1 byte.
    Level1 = 0,
    /// 4 bytes.
    Level4 = 1,
    /// 8 bytes.
    Level8 = 2,
    /// 16 bytes, half of the FIFO.
    Level16 = 3,
}

impl TxWatermark {
    /// Threshold in bytes.
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Level1 => 1,
            Self::Level4 => 4,
            Self::Level8 => 8,
            Self::Level16 => 16,
        }
    }
}

/// Values programmed into the peripheral by [`Registers::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setup {
    /// Baud divisor for the NCO field.
    pub nco: u16,
    /// RX interrupt threshold.
    pub rx_watermark: RxWatermark,
    /// TX interrupt threshold.
    pub tx_watermark: TxWatermark,
    /// Interrupt sources to enable.
    pub enable: Interrupts,
}

/// Computes the NCO baud divisor, `round(baud * 2^20 / clock_hz)`.
///
/// # Errors
///
/// - [`InitError::InvalidClock`] if `clock_hz` is zero.
/// - [`InitError::DivisorOverflow`] if the result does not fit the 16-bit field.
pub fn nco(baud: u64, clock_hz: u64) -> Result<u16, InitError> {
    if clock_hz == 0 {
        return Err(InitError::InvalidClock);
    }
    let scaled = u128::from(baud) << 20;
    let clock = u128::from(clock_hz);
    let nco = (scaled + clock / 2) / clock;
    if nco >> NCO_BITS != 0 {
        return Err(InitError::DivisorOverflow);
    }
    Ok(nco as u16)
}

/// Named accessors for the UART registers.
///
/// Implementations carry no state of their own and do no locking. The
/// single-byte transfers never block and never validate: callers check
/// [`rx_fifo_empty`](Self::rx_fifo_empty) or [`tx_fifo_full`](Self::tx_fifo_full)
/// first.
pub trait Registers {
    /// Bytes waiting in the RX FIFO, at most [`FIFO_CAPACITY`].
    fn rx_fifo_level(&self) -> u32;

    /// Bytes in the TX FIFO not yet sent, at most [`FIFO_CAPACITY`].
    fn tx_fifo_level(&self) -> u32;

    /// Whether the RX FIFO is empty.
    ///
    /// Implementations should use a dedicated empty status bit when the
    /// hardware has one; FIFO level reporting is not reliable at zero on all
    /// targets.
    fn rx_fifo_empty(&self) -> bool {
        self.rx_fifo_level() == 0
    }

    /// Whether the TX FIFO can take no more bytes.
    fn tx_fifo_full(&self) -> bool {
        self.tx_fifo_level() >= FIFO_CAPACITY
    }

    /// Takes one byte from the RX FIFO.
    fn get_byte(&self) -> u8;

    /// Puts one byte into the TX FIFO.
    fn put_byte(&self, byte: u8);

    /// Programs the divisor, resets both FIFOs, sets the watermarks and enables
    /// the given interrupt sources.
    fn configure(&self, setup: &Setup);

    /// Interrupt sources currently asserted.
    fn pending(&self) -> Interrupts;

    /// Clears status bits. The register is write-one-to-clear; a condition that
    /// is still present asserts again.
    fn clear_status(&self, irqs: Interrupts);
}

impl<T: Registers + ?Sized> Registers for &T {
    fn rx_fifo_level(&self) -> u32 {
        (**self).rx_fifo_level()
    }
    fn tx_fifo_level(&self) -> u32 {
        (**self).tx_fifo_level()
    }
    fn rx_fifo_empty(&self) -> bool {
        (**self).rx_fifo_empty()
    }
    fn tx_fifo_full(&self) -> bool {
        (**self).tx_fifo_full()
    }
    fn get_byte(&self) -> u8 {
        (**self).get_byte()
    }
    fn put_byte(&self, byte: u8) {
        (**self).put_byte(byte)
    }
    fn configure(&self, setup: &Setup) {
        (**self).configure(setup)
    }
    fn pending(&self) -> Interrupts {
        (**self).pending()
    }
    fn clear_status(&self, irqs: Interrupts) {
        (**self).clear_status(irqs)
    }
}
