//! Sequential nonce allocation for the deployer account

/// Hands out nonces for the deployer, starting at the account's transaction
/// count when the run began.
///
/// Every deployment and configuration call takes exactly one value, so the
/// nonces of a run are `base, base + 1, ...` with no gaps or repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceAllocator {
    /// The transaction count of the deployer when the run began
    base: u64,
    /// The number of nonces handed out so far
    offset: u64,
}

impl NonceAllocator {
    /// Create an allocator seeded with the deployer's transaction count
    pub fn new(base: u64) -> Self {
        Self { base, offset: 0 }
    }

    /// Take the next nonce
    pub fn next(&mut self) -> u64 {
        let nonce = self.peek();
        self.offset += 1;
        nonce
    }

    /// The nonce the next call to [`NonceAllocator::next`] will return
    pub fn peek(&self) -> u64 {
        self.base + self.offset
    }

    /// The nonce the allocator was seeded with
    pub fn base(&self) -> u64 {
        self.base
    }

    /// The number of nonces handed out so far
    pub fn consumed(&self) -> u64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::NonceAllocator;

    #[test]
    fn test_sequential_nonces() {
        let mut nonces = NonceAllocator::new(5);
        let taken: Vec<u64> = (0..8).map(|_| nonces.next()).collect();

        assert_eq!(taken, (5..13).collect::<Vec<_>>());
        assert_eq!(nonces.peek(), 13);
        assert_eq!(nonces.consumed(), 8);
        assert_eq!(nonces.base(), 5);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut nonces = NonceAllocator::new(0);
        assert_eq!(nonces.peek(), 0);
        assert_eq!(nonces.peek(), 0);
        assert_eq!(nonces.next(), 0);
        assert_eq!(nonces.consumed(), 1);
    }
}
