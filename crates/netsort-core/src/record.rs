//! Fixed-layout records — the unit of data on disk and on the wire.
//!
//! A record is 100 bytes: a 10-byte key followed by a 90-byte value.
//! Input and output shards are nothing but records laid end to end.
//! The value is opaque; only the key is ever compared.

use std::cmp::Ordering;

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Key length in bytes.
pub const KEY_SIZE: usize = 10;

/// Value length in bytes.
pub const VALUE_SIZE: usize = 90;

/// Size of one record on disk (key || value, no header).
pub const RECORD_SIZE: usize = KEY_SIZE + VALUE_SIZE;

pub type Key = [u8; KEY_SIZE];

/// One key/value record.
///
/// The byte image of this struct is the on-disk format, so a shard can be
/// reinterpreted record by record without parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Record {
    pub key: Key,
    pub value: [u8; VALUE_SIZE],
}

assert_eq_size!(Record, [u8; RECORD_SIZE]);

impl Record {
    pub fn new(key: Key, value: [u8; VALUE_SIZE]) -> Self {
        Self { key, value }
    }

    /// Read one record from exactly `RECORD_SIZE` bytes.
    /// Returns None on any other length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        Self::read_from(bytes)
    }

    /// Order two records by key only.
    pub fn cmp_key(&self, other: &Self) -> Ordering {
        compare_keys(&self.key, &other.key)
    }
}

/// Unsigned byte-wise comparison, most significant byte first.
///
/// Equivalent to comparing the keys as 80-bit big-endian integers.
pub fn compare_keys(a: &Key, b: &Key) -> Ordering {
    a.as_slice().cmp(b.as_slice())
}
