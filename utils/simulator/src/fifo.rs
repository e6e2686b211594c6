/// Fixed-depth byte FIFO between the framer and the RX register.
///
/// A push into a full FIFO is refused and the byte is lost; whatever is
/// already buffered stays untouched.
#[derive(Debug, Clone)]
pub struct SyncFifo<const N: usize> {
    buffer: [u8; N],
    head: usize,
    len: usize,
}

impl<const N: usize> SyncFifo<N> {
    pub fn new() -> Self {
        Self {
            buffer: [0; N],
            head: 0,
            len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Returns `false` if the FIFO was full and `byte` was dropped
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buffer[(self.head + self.len) % N] = byte;
        self.len += 1;
        true
    }

    pub fn front(&self) -> Option<u8> {
        (!self.is_empty()).then(|| self.buffer[self.head])
    }

    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.front()?;
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(byte)
    }

    /// Buffered bytes, oldest first
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |i| self.buffer[(self.head + i) % N])
    }
}

impl<const N: usize> Default for SyncFifo<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut fifo = SyncFifo::<4>::new();
        assert_eq!(fifo.pop(), None);
        for byte in [1, 2, 3] {
            assert!(fifo.push(byte));
        }
        assert_eq!(fifo.front(), Some(1));
        assert_eq!(fifo.pop(), Some(1));
        assert!(fifo.push(4));
        assert!(fifo.push(5));
        assert_eq!(fifo.iter().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_full_drops_newest() {
        let mut fifo = SyncFifo::<16>::new();
        for byte in 0..16 {
            assert!(fifo.push(byte));
        }
        assert!(fifo.is_full());
        assert!(!fifo.push(0xff));
        assert_eq!(fifo.len(), 16);
        assert_eq!(fifo.iter().collect::<Vec<_>>(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_pop_empty_is_noop() {
        let mut fifo = SyncFifo::<2>::new();
        assert_eq!(fifo.pop(), None);
        assert!(fifo.is_empty());
        assert_eq!(fifo.capacity(), 2);
    }
}
