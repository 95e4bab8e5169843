//! Buffered, interrupt-driven UART driver.
//!
//! Bytes flow through two independent software buffers:
//!
//! - RX: hardware FIFO → [`Uart::rx_watermark_handle`] → RX buffer → [`Uart::read`].
//! - TX: [`Uart::write`] → TX buffer → [`Uart::fill_tx_fifo`] → hardware FIFO.
//!
//! Each buffer sits behind its own spin lock. The two locks are never held at
//! the same time, and no lock is held while waiting on a platform [`Event`].

use core::fmt;

use spin::Mutex;

#[cfg(feature = "async-await")]
use crate::atomic_waker::AtomicWaker;
use crate::circular_buffer::{BUFFER_CAPACITY, CircularBuffer};
use crate::registers::{self, Interrupts, Registers, Setup};
use crate::signal::{Event, Irq, Platform};
use crate::{Config, Error, InitError};


struct RxState<const N: usize> {
    buffer: CircularBuffer<N>,
    /// The RX handler found the buffer full and waits for [`Event::RxEmpty`].
    handler_parked: bool,
}

/// Driver state for one UART instance.
///
/// Construct one per peripheral with [`Uart::new`] and share it by reference
/// between the interrupt handler entry points and the client threads calling
/// [`read`](Self::read), [`write`](Self::write) and [`flush`](Self::flush).
/// `N` is the capacity of each software buffer.
pub struct Uart<R, P, const N: usize = BUFFER_CAPACITY> {
    regs: R,
    platform: P,
    rx: Mutex<RxState<N>>,
    tx: Mutex<CircularBuffer<N>>,
    dataport_capacity: usize,
    #[cfg(feature = "async-await")]
    rx_waker: AtomicWaker,
    #[cfg(feature = "async-await")]
    tx_waker: AtomicWaker,
}

impl<R: Registers, P: Platform, const N: usize> Uart<R, P, N> {
    /// Programs the peripheral and returns the driver with empty buffers.
    ///
    /// The hardware is only touched once the whole configuration is valid.
    ///
    /// # Errors
    ///
    /// Returns an [`InitError`] if the baud divisor cannot be computed. The
    /// peripheral is left unprogrammed; callers should treat this as fatal.
    pub fn new(regs: R, platform: P, config: Config) -> Result<Self, InitError> {
        let nco = registers::nco(config.baud_rate, config.clock_hz)?;
        let setup = Setup {
            nco,
            rx_watermark: config.rx_watermark,
            tx_watermark: config.tx_watermark,
            enable: Interrupts::SERVICED,
        };

        let mut rx = CircularBuffer::new();
        rx.clear();
        let mut tx = CircularBuffer::new();
        tx.clear();

        regs.configure(&setup);
        debug!(
            "uart: nco {}, rx watermark {}, tx watermark {}",
            nco,
            config.rx_watermark.bytes(),
            config.tx_watermark.bytes()
        );

        Ok(Self {
            regs,
            platform,
            rx: Mutex::new(RxState {
                buffer: rx,
                handler_parked: false,
            }),
            tx: Mutex::new(tx),
            dataport_capacity: config.dataport_capacity,
            #[cfg(feature = "async-await")]
            rx_waker: AtomicWaker::new(),
            #[cfg(feature = "async-await")]
            tx_waker: AtomicWaker::new(),
        })
    }

    /// The register interface this driver was built with.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Largest transfer accepted by `read` and `write`.
    pub fn dataport_capacity(&self) -> usize {
        self.dataport_capacity
    }

    /// Bytes received and not yet read.
    pub fn rx_buffered(&self) -> usize {
        self.rx.lock().buffer.size()
    }

    /// Bytes written and not yet handed to the hardware.
    pub fn tx_buffered(&self) -> usize {
        self.tx.lock().size()
    }

    /// Reads up to `buf.len()` bytes, blocking until at least one is available.
    ///
    /// Returns how many bytes were copied, which may be fewer than requested.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfBounds`] if `buf` is empty or longer than the dataport
    ///   capacity. Nothing is read.
    /// - [`Error::AssertionFailed`] if the wait ended without any byte copied.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() || buf.len() > self.dataport_capacity {
            warn!("uart: read of {} bytes rejected", buf.len());
            return Err(Error::OutOfBounds);
        }

        let mut rx = self.rx.lock();
        while rx.buffer.is_empty() {
            drop(rx);
            self.platform.wait(Event::RxNonEmpty);
            rx = self.rx.lock();
        }

        let mut num_read = 0;
        for slot in buf.iter_mut() {
            match rx.buffer.pop_front() {
                Some(byte) => *slot = byte,
                None => break,
            }
            num_read += 1;
        }
        // One post wakes one reader. Whoever leaves bytes behind passes the
        // wakeup on so other blocked readers see them.
        let more = !rx.buffer.is_empty();
        let resume_handler = num_read > 0 && core::mem::take(&mut rx.handler_parked);
        drop(rx);

        if more {
            self.platform.post(Event::RxNonEmpty);
        }
        if resume_handler {
            self.platform.post(Event::RxEmpty);
        }

        if num_read == 0 {
            return Err(Error::AssertionFailed);
        }
        Ok(num_read)
    }

    /// Queues as many bytes of `data` as fit in the TX buffer.
    ///
    /// Blocks only while the buffer is completely full. Returns the number of
    /// bytes queued; the caller writes the rest with further calls.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] if `data` is longer than the dataport capacity.
    /// Nothing is queued.
    pub fn write(&self, data: &[u8]) -> Result<usize, Error> {
        if data.len() > self.dataport_capacity {
            warn!("uart: write of {} bytes rejected", data.len());
            return Err(Error::OutOfBounds);
        }
        if data.is_empty() {
            return Ok(0);
        }

        let mut tx = self.tx.lock();
        while tx.is_full() {
            drop(tx);
            self.platform.wait(Event::TxHasSpace);
            tx = self.tx.lock();
        }

        let mut num_written = 0;
        for &byte in data {
            if !tx.push_back(byte) {
                break;
            }
            num_written += 1;
        }
        let more = !tx.is_full();
        drop(tx);

        if more {
            self.platform.post(Event::TxHasSpace);
        }

        // Start transmission here in case no TX interrupt is pending to do it.
        self.fill_tx_fifo();
        Ok(num_written)
    }

    /// Queues all of `data`, blocking as needed.
    ///
    /// Input longer than the dataport capacity is sent in dataport-sized pieces.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`write`](Self::write).
    pub fn write_all(&self, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }
        if self.dataport_capacity == 0 {
            return Err(Error::OutOfBounds);
        }
        for chunk in data.chunks(self.dataport_capacity) {
            let mut rest = chunk;
            while !rest.is_empty() {
                let n = self.write(rest)?;
                rest = &rest[n..];
            }
        }
        Ok(())
    }

    /// Blocks until every queued byte has been handed to the hardware FIFO.
    ///
    /// This does not wait for the bytes to leave the wire.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` matches the other client operations.
    pub fn flush(&self) -> Result<(), Error> {
        let mut tx = self.tx.lock();
        let mut moved = 0;
        while !tx.is_empty() {
            moved += self.fill_locked(&mut tx);
            core::hint::spin_loop();
        }
        drop(tx);

        #[cfg(feature = "async-await")]
        if moved > 0 {
            self.tx_waker.wake();
        }
        #[cfg(not(feature = "async-await"))]
        let _ = moved;
        Ok(())
    }

    /// Moves bytes from the TX buffer into the hardware FIFO until the FIFO is
    /// full or the buffer is empty. Returns the number of bytes moved.
    ///
    /// Shared by [`write`](Self::write) and the TX interrupt handlers.
    pub fn fill_tx_fifo(&self) -> usize {
        let mut tx = self.tx.lock();
        let moved = self.fill_locked(&mut tx);
        drop(tx);

        #[cfg(feature = "async-await")]
        if moved > 0 {
            self.tx_waker.wake();
        }
        moved
    }

    fn fill_locked(&self, tx: &mut CircularBuffer<N>) -> usize {
        let mut moved = 0;
        while !self.regs.tx_fifo_full() {
            let Some(byte) = tx.pop_front() else {
                break;
            };
            self.regs.put_byte(byte);
            moved += 1;
        }
        if moved > 0 {
            self.platform.post(Event::TxHasSpace);
        }
        moved
    }

    /// Handles the TX watermark interrupt: the hardware FIFO dropped below its
    /// watermark.
    pub fn tx_watermark_handle(&self) {
        self.fill_tx_fifo();

        // Anything still queued goes out on the following tx_empty.
        self.regs.clear_status(Irq::TxWatermark.mask());
        self.platform.acknowledge(Irq::TxWatermark);
    }

    /// Handles the TX empty interrupt: the hardware FIFO ran dry.
    pub fn tx_empty_handle(&self) {
        self.fill_tx_fifo();

        let tx = self.tx.lock();
        if tx.is_empty() {
            self.regs.clear_status(Irq::TxEmpty.mask());
        } else {
            // A writer queued more bytes after the fill. Leave the status set so
            // the interrupt fires again once the FIFO drains.
            trace!("uart: tx_empty kept, {} bytes queued", tx.size());
        }
        drop(tx);

        self.platform.acknowledge(Irq::TxEmpty);
    }

    /// Handles the RX watermark interrupt: bytes arrived in the hardware FIFO.
    ///
    /// Drains the FIFO completely. When the RX buffer is full the handler wakes
    /// the readers and waits for one of them to make room, so no byte is dropped.
    pub fn rx_watermark_handle(&self) {
        let mut rx = self.rx.lock();
        while !self.regs.rx_fifo_empty() {
            if rx.buffer.is_full() {
                // The watermark interrupt does not fire again until the FIFO
                // level crosses it anew, so drain everything in this invocation.
                rx.handler_parked = true;
                drop(rx);
                trace!("uart: rx buffer full, waiting for a reader");
                self.signal_readable();
                self.platform.wait(Event::RxEmpty);
                trace!("uart: rx handler resumed");
                rx = self.rx.lock();
                continue;
            }
            let pushed = rx.buffer.push_back(self.regs.get_byte());
            debug_assert!(pushed);
        }
        // Unlock before waking readers so they do not spin on the lock.
        drop(rx);
        self.signal_readable();

        self.regs.clear_status(Irq::RxWatermark.mask());
        self.platform.acknowledge(Irq::RxWatermark);
    }

    fn signal_readable(&self) {
        self.platform.post(Event::RxNonEmpty);
        #[cfg(feature = "async-await")]
        self.rx_waker.wake();
    }

    /// Runs the handler of every serviced source asserted in the interrupt
    /// status register, for platforms that deliver all sources on one line.
    ///
    /// Returns the sources that were handled.
    pub fn handle_pending(&self) -> Interrupts {
        let pending = self.regs.pending() & Interrupts::SERVICED;
        for irq in [Irq::TxWatermark, Irq::RxWatermark, Irq::TxEmpty] {
            if !pending.contains(irq.mask()) {
                continue;
            }
            match irq {
                Irq::TxWatermark => self.tx_watermark_handle(),
                Irq::RxWatermark => self.rx_watermark_handle(),
                Irq::TxEmpty => self.tx_empty_handle(),
            }
        }
        pending
    }

    /// Returns a [`fmt::Write`] adapter that sends formatted text.
    pub fn writer(&self) -> Writer<'_, R, P, N> {
        Writer { uart: self }
    }

    #[cfg(test)]
    pub(crate) fn rx_handler_parked(&self) -> bool {
        self.rx.lock().handler_parked
    }
}

#[cfg(feature = "async-await")]
impl<R: Registers, P: Platform, const N: usize> Uart<R, P, N> {
    /// Waits until the RX buffer holds data, so that [`read`](Self::read)
    /// returns without blocking unless another reader gets there first.
    pub async fn readable(&self) {
        core::future::poll_fn(|cx| {
            self.rx_waker.register(cx.waker());
            if self.rx.lock().buffer.is_empty() {
                core::task::Poll::Pending
            } else {
                core::task::Poll::Ready(())
            }
        })
        .await
    }

    /// Waits until the TX buffer has space, so that [`write`](Self::write)
    /// returns without blocking unless another writer gets there first.
    pub async fn writable(&self) {
        core::future::poll_fn(|cx| {
            self.tx_waker.register(cx.waker());
            if self.tx.lock().is_full() {
                core::task::Poll::Pending
            } else {
                core::task::Poll::Ready(())
            }
        })
        .await
    }
}

/// Formatted output through [`Uart::write_all`].
pub struct Writer<'a, R, P, const N: usize> {
    uart: &'a Uart<R, P, N>,
}

impl<R: Registers, P: Platform, const N: usize> fmt::Write for Writer<'_, R, P, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.uart.write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
