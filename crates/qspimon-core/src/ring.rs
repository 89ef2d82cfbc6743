//! Fixed-capacity FIFO queue
//!
//! The console receives bytes from the UART interrupt and consumes them from
//! the main loop. [`RingBuffer`] sits between the two: its storage is
//! reserved once at construction and never grows, so a burst of input either
//! fits or is rejected with [`RingError::Full`].

use alloc::vec::Vec;
use core::fmt;

/// Errors returned by [`RingBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// Every slot is occupied
    Full,
    /// No value is queued
    Empty,
    /// Storage for the requested capacity could not be reserved
    AllocationFailed,
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::Full => write!(f, "ring buffer full"),
            RingError::Empty => write!(f, "ring buffer empty"),
            RingError::AllocationFailed => write!(f, "ring buffer allocation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RingError {}

/// Circular queue holding at most `capacity` values
///
/// Read and write indices advance modulo the capacity. An explicit occupied
/// count distinguishes full from empty, so every slot is usable.
///
/// Values are moved in and moved out; the queue never looks behind them.
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    read: usize,
    write: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Reserve storage for `capacity` values
    ///
    /// A zero capacity is accepted; such a buffer rejects every `add`.
    pub fn with_capacity(capacity: usize) -> Result<Self, RingError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| RingError::AllocationFailed)?;
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            read: 0,
            write: 0,
            len: 0,
        })
    }

    /// Append a value at the tail
    ///
    /// On [`RingError::Full`] the value is dropped and the buffer is left
    /// untouched.
    pub fn add(&mut self, value: T) -> Result<(), RingError> {
        if self.is_full() {
            return Err(RingError::Full);
        }
        self.slots[self.write] = Some(value);
        self.write = (self.write + 1) % self.slots.len();
        self.len += 1;
        Ok(())
    }

    /// Remove the value at the head
    pub fn get(&mut self) -> Result<T, RingError> {
        if self.len == 0 {
            return Err(RingError::Empty);
        }
        let value = self.slots[self.read].take().ok_or(RingError::Empty)?;
        self.read = (self.read + 1) % self.slots.len();
        self.len -= 1;
        Ok(value)
    }

    /// Number of queued values
    pub fn len(&self) -> usize {
        self.len
    }

    /// Maximum number of values the buffer can hold
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if `add` would fail
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Drop every queued value and rewind both indices
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.read = 0;
        self.write = 0;
        self.len = 0;
    }

    /// Release the storage
    ///
    /// Queued values are dropped with it.
    pub fn destroy(self) {}
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("read", &self.read)
            .field("write", &self.write)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn test_fifo_order() {
        let mut ring = RingBuffer::with_capacity(8).unwrap();
        for b in b"hello" {
            ring.add(*b).unwrap();
        }
        let mut out = Vec::new();
        while let Ok(b) = ring.get() {
            out.push(b);
        }
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_capacity_four_scenario() {
        let mut ring = RingBuffer::with_capacity(4).unwrap();
        for v in 1..=4 {
            ring.add(v).unwrap();
        }
        assert!(ring.is_full());
        assert_eq!(ring.add(5), Err(RingError::Full));
        assert_eq!(ring.len(), 4);

        assert_eq!(ring.get(), Ok(1));
        ring.add(5).unwrap();
        assert_eq!(ring.get(), Ok(2));
        assert_eq!(ring.get(), Ok(3));
        assert_eq!(ring.get(), Ok(4));
        assert_eq!(ring.get(), Ok(5));
        assert_eq!(ring.get(), Err(RingError::Empty));
    }

    #[test]
    fn test_empty_get_does_not_move_read_index() {
        let mut ring = RingBuffer::with_capacity(2).unwrap();
        assert_eq!(ring.get(), Err(RingError::Empty));
        ring.add('a').unwrap();
        assert_eq!(ring.get(), Ok('a'));
        assert_eq!(ring.get(), Err(RingError::Empty));
        ring.add('b').unwrap();
        ring.add('c').unwrap();
        assert_eq!(ring.get(), Ok('b'));
        assert_eq!(ring.get(), Ok('c'));
    }

    #[test]
    fn test_wraparound_keeps_count() {
        let mut ring = RingBuffer::with_capacity(3).unwrap();
        for round in 0..10u32 {
            ring.add(round).unwrap();
            ring.add(round + 100).unwrap();
            assert_eq!(ring.len(), 2);
            assert_eq!(ring.get(), Ok(round));
            assert_eq!(ring.get(), Ok(round + 100));
            assert!(ring.is_empty());
        }
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut ring: RingBuffer<u8> = RingBuffer::with_capacity(0).unwrap();
        assert_eq!(ring.capacity(), 0);
        assert_eq!(ring.add(1), Err(RingError::Full));
        assert_eq!(ring.get(), Err(RingError::Empty));
    }

    #[test]
    fn test_oversized_capacity_fails_allocation() {
        let result: Result<RingBuffer<u64>, _> = RingBuffer::with_capacity(usize::MAX / 2);
        assert!(matches!(result, Err(RingError::AllocationFailed)));
    }

    #[test]
    fn test_clear_and_destroy() {
        let mut ring = RingBuffer::with_capacity(2).unwrap();
        ring.add(String::from("a")).unwrap();
        ring.add(String::from("b")).unwrap();
        ring.clear();
        assert!(ring.is_empty());
        ring.add(String::from("c")).unwrap();
        assert_eq!(ring.get().unwrap(), "c");
        ring.add(String::from("d")).unwrap();
        ring.destroy();
    }
}
