//! A fixed-capacity byte FIFO.

/// Default capacity of the software RX and TX buffers.
pub const BUFFER_CAPACITY: usize = 512;

/// A fixed-capacity FIFO of bytes, storing up to `N` bytes.
///
/// The size is tracked explicitly, so the backing array is exactly `N` bytes and
/// `begin == end` is ambiguous on its own (empty or full). `size` resolves it.
///
/// The buffer is not internally synchronized. Shared use from an interrupt
/// handler and a blocking call goes through the lock that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularBuffer<const N: usize = BUFFER_CAPACITY> {
    /// Where the next pop reads. Always `< N`.
    begin: usize,
    /// Where the next push writes. Always `< N`.
    end: usize,
    size: usize,
    data: [u8; N],
}

impl<const N: usize> Default for CircularBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CircularBuffer<N> {
    /// Creates an empty buffer.
    pub const fn new() -> Self {
        const { assert!(N > 0, "CircularBuffer capacity must be non-zero") };
        Self {
            begin: 0,
            end: 0,
            size: 0,
            data: [0; N],
        }
    }

    /// Resets the cursors to the empty state.
    pub fn init(&mut self) {
        self.begin = 0;
        self.end = 0;
        self.size = 0;
    }

    /// Discards all queued bytes.
    ///
    /// The stored bytes are not zeroed, only forgotten.
    pub fn clear(&mut self) {
        self.init();
    }

    /// Total number of bytes the buffer can hold.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns `true` if no bytes are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns `true` if no more bytes can be pushed.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.size == N
    }

    /// Number of queued bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of bytes that can be pushed before the buffer is full.
    #[inline]
    pub fn remaining(&self) -> usize {
        N - self.size
    }

    /// Removes and returns the oldest byte, or `None` if the buffer is empty.
    #[must_use]
    pub fn pop_front(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.data[self.begin];
        self.begin = Self::advance(self.begin);
        self.size -= 1;
        Some(byte)
    }

    /// Appends a byte.
    ///
    /// Returns `false` and leaves the buffer untouched if it is full.
    #[must_use]
    pub fn push_back(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.data[self.end] = byte;
        self.end = Self::advance(self.end);
        self.size += 1;
        true
    }

    #[inline]
    fn advance(position: usize) -> usize {
        (position + 1) % N
    }
}
