//! OpenTitan UART register block accessed through volatile memory operations.

use core::ptr::{with_exposed_provenance, with_exposed_provenance_mut};

use super::{Interrupts, Registers, Setup};

const INTR_STATE: usize = 0x00;
const INTR_ENABLE: usize = 0x04;
const INTR_TEST: usize = 0x08;
const CTRL: usize = 0x10;
const STATUS: usize = 0x14;
const RDATA: usize = 0x18;
const WDATA: usize = 0x1c;
const FIFO_CTRL: usize = 0x20;
const FIFO_STATUS: usize = 0x24;

/// Size of the register block in bytes.
pub const BLOCK_SIZE: usize = 0x34;

const CTRL_TX: u32 = 1 << 0;
const CTRL_RX: u32 = 1 << 1;
const CTRL_NCO_OFFSET: u32 = 16;

const STATUS_TXFULL: u32 = 1 << 0;
const STATUS_RXEMPTY: u32 = 1 << 5;

const FIFO_CTRL_RXRST: u32 = 1 << 0;
const FIFO_CTRL_TXRST: u32 = 1 << 1;
const FIFO_CTRL_RXILVL_OFFSET: u32 = 2;
const FIFO_CTRL_TXILVL_OFFSET: u32 = 5;

const FIFO_STATUS_TXLVL_OFFSET: u32 = 0;
const FIFO_STATUS_RXLVL_OFFSET: u32 = 16;
const FIFO_STATUS_LVL_MASK: u32 = 0x3f;

const DATA_MASK: u32 = 0xff;

/// An OpenTitan UART mapped at a fixed address.
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// - `base` must be the start of a mapped OpenTitan UART register block of
    ///   at least [`BLOCK_SIZE`] bytes, 4-byte aligned, with exposed provenance.
    /// - The block must stay mapped for as long as the returned value is used,
    ///   and no other code may program the peripheral concurrently.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[inline]
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees a mapped, aligned block and all offsets are in bounds.
        unsafe { with_exposed_provenance::<u32>(self.base + offset).read_volatile() }
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        // SAFETY: `new` guarantees a mapped, aligned block and all offsets are in bounds.
        unsafe { with_exposed_provenance_mut::<u32>(self.base + offset).write_volatile(value) }
    }

    fn fifo_status(&self, offset: u32) -> u32 {
        self.read(FIFO_STATUS) >> offset & FIFO_STATUS_LVL_MASK
    }

    /// Raises interrupt sources through the test register.
    pub fn force(&self, irqs: Interrupts) {
        self.write(INTR_TEST, irqs.bits());
    }
}

impl Registers for Mmio {
    fn rx_fifo_level(&self) -> u32 {
        self.fifo_status(FIFO_STATUS_RXLVL_OFFSET)
    }

    fn tx_fifo_level(&self) -> u32 {
        self.fifo_status(FIFO_STATUS_TXLVL_OFFSET)
    }

    fn rx_fifo_empty(&self) -> bool {
        self.read(STATUS) & STATUS_RXEMPTY != 0
    }

    fn tx_fifo_full(&self) -> bool {
        self.read(STATUS) & STATUS_TXFULL != 0
    }

    fn get_byte(&self) -> u8 {
        (self.read(RDATA) & DATA_MASK) as u8
    }

    fn put_byte(&self, byte: u8) {
        self.write(WDATA, u32::from(byte));
    }

    fn configure(&self, setup: &Setup) {
        self.write(
            CTRL,
            u32::from(setup.nco) << CTRL_NCO_OFFSET | CTRL_TX | CTRL_RX,
        );

        let fifo_ctrl = self.read(FIFO_CTRL);
        self.write(FIFO_CTRL, fifo_ctrl | FIFO_CTRL_RXRST | FIFO_CTRL_TXRST);

        // The reset bits are self-clearing, only the levels are written back.
        self.write(
            FIFO_CTRL,
            (setup.rx_watermark as u32) << FIFO_CTRL_RXILVL_OFFSET
                | (setup.tx_watermark as u32) << FIFO_CTRL_TXILVL_OFFSET,
        );

        self.write(INTR_ENABLE, setup.enable.bits());
    }

    fn pending(&self) -> Interrupts {
        Interrupts::from_bits_truncate(self.read(INTR_STATE) & self.read(INTR_ENABLE))
    }

    fn clear_status(&self, irqs: Interrupts) {
        self.write(INTR_STATE, irqs.bits());
    }
}
