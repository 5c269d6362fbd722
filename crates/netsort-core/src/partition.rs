//! Key-range partitioning.
//!
//! With `n` nodes (a power of two, at most 256) the top `log2(n)` bits of
//! the first key byte name the owning node. Node `i` therefore owns one
//! contiguous block of leading bytes, and the blocks appear in node-id
//! order, so concatenating every node's sorted output in id order yields a
//! globally sorted file.

use std::ops::RangeInclusive;

use crate::record::Key;

/// Largest cluster the first-byte scheme can address.
pub const MAX_NODES: usize = 256;

/// Maps keys to owning node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    n_servers: usize,
    n_msb: u32,
}

impl Partitioner {
    /// Build a partitioner for `n_servers` nodes.
    ///
    /// Rejects zero, more than 256, and anything that is not a power of
    /// two: the bit-shift scheme has no defined routing for those.
    pub fn new(n_servers: usize) -> Result<Self, PartitionError> {
        if n_servers == 0 {
            return Err(PartitionError::Empty);
        }
        if n_servers > MAX_NODES {
            return Err(PartitionError::TooManyNodes(n_servers));
        }
        if !n_servers.is_power_of_two() {
            return Err(PartitionError::NotPowerOfTwo(n_servers));
        }
        Ok(Self {
            n_servers,
            n_msb: n_servers.trailing_zeros(),
        })
    }

    pub fn n_servers(&self) -> usize {
        self.n_servers
    }

    /// Number of leading key bits used for routing.
    pub fn n_msb(&self) -> u32 {
        self.n_msb
    }

    /// Owning node for `key`.
    pub fn owner(&self, key: &Key) -> usize {
        // A single node owns everything; shifting a u8 by 8 would overflow.
        if self.n_msb == 0 {
            return 0;
        }
        (key[0] >> (8 - self.n_msb)) as usize
    }

    /// Leading key bytes owned by `node`. Panics if `node` is out of range.
    pub fn first_byte_range(&self, node: usize) -> RangeInclusive<u8> {
        assert!(node < self.n_servers, "node {node} out of range");
        let width = 256 / self.n_servers;
        let lo = node * width;
        let hi = lo + width - 1;
        (lo as u8)..=(hi as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    #[error("cluster has no nodes")]
    Empty,

    #[error("node count {0} is not a power of two")]
    NotPowerOfTwo(usize),

    #[error("node count {0} exceeds maximum {}", MAX_NODES)]
    TooManyNodes(usize),
}
