//! Key-level helpers shared by the trie and range layers

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{Add, Sub};

use crate::errors::Error;

/// Fixed-width lookup key a trie can branch on, bit 0 being the most
/// significant. Implemented for `u32` (IPv4 and numeric fields) and `u128`
/// (IPv6).
pub trait TrieKey:
    Copy + Eq + Ord + Hash + Debug + Add<Output = Self> + Sub<Output = Self>
{
    const WIDTH: u8;
    const ZERO: Self;
    const MAX: Self;

    /// Bit at `index`, counting from the most significant bit.
    fn bit(self, index: u8) -> u8;

    /// Mask keeping the `len` most significant bits.
    fn mask(len: u8) -> Self;

    /// Zero all host bits beyond `len`.
    fn canonical(self, len: u8) -> Self;

    /// Length of the shared leading bit run, capped at `max_len`.
    fn common_prefix_len(self, other: Self, max_len: u8) -> u8;

    fn leading_zeros(self) -> u32;

    fn trailing_zeros(self) -> u32;

    /// `2^exp` as a key value; `exp` must be below `WIDTH`.
    fn pow2(exp: u8) -> Self;
}

impl TrieKey for u32 {
    const WIDTH: u8 = 32;
    const ZERO: Self = 0;
    const MAX: Self = u32::MAX;

    #[inline]
    fn bit(self, index: u8) -> u8 {
        debug_assert!(index <= 31);
        ((self >> (31 - index)) & 1) as u8
    }

    #[inline]
    fn mask(len: u8) -> Self {
        if len == 0 {
            0
        } else if len >= 32 {
            !0u32
        } else {
            !(!0u32 >> len)
        }
    }

    #[inline]
    fn canonical(self, len: u8) -> Self {
        self & Self::mask(len)
    }

    fn common_prefix_len(self, other: Self, max_len: u8) -> u8 {
        if max_len == 0 {
            return 0;
        }
        let diff = self.canonical(max_len) ^ other.canonical(max_len);
        if diff == 0 {
            return max_len;
        }
        let lz = diff.leading_zeros().min(32) as u8;
        lz.min(max_len)
    }

    #[inline]
    fn leading_zeros(self) -> u32 {
        u32::leading_zeros(self)
    }

    #[inline]
    fn trailing_zeros(self) -> u32 {
        u32::trailing_zeros(self)
    }

    #[inline]
    fn pow2(exp: u8) -> Self {
        debug_assert!(exp < 32);
        1u32 << exp
    }
}

impl TrieKey for u128 {
    const WIDTH: u8 = 128;
    const ZERO: Self = 0;
    const MAX: Self = u128::MAX;

    #[inline]
    fn bit(self, index: u8) -> u8 {
        debug_assert!(index <= 127);
        ((self >> (127 - index)) & 1) as u8
    }

    #[inline]
    fn mask(len: u8) -> Self {
        if len == 0 {
            0
        } else if len >= 128 {
            !0u128
        } else {
            !(!0u128 >> len)
        }
    }

    #[inline]
    fn canonical(self, len: u8) -> Self {
        self & Self::mask(len)
    }

    fn common_prefix_len(self, other: Self, max_len: u8) -> u8 {
        if max_len == 0 {
            return 0;
        }
        let diff = self.canonical(max_len) ^ other.canonical(max_len);
        if diff == 0 {
            return max_len;
        }
        let lz = diff.leading_zeros().min(128) as u8;
        lz.min(max_len)
    }

    #[inline]
    fn leading_zeros(self) -> u32 {
        u128::leading_zeros(self)
    }

    #[inline]
    fn trailing_zeros(self) -> u32 {
        u128::trailing_zeros(self)
    }

    #[inline]
    fn pow2(exp: u8) -> Self {
        debug_assert!(exp < 128);
        1u128 << exp
    }
}

/// Left-align a 16-bit field value into the 32-bit key space.
#[inline]
pub fn u16_key(value: u16) -> u32 {
    (value as u32) << 16
}

/// Canonical prefix over a fixed-width key: the `plen` leading bits of `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix<K: TrieKey> {
    key: K,
    plen: u8,
}

impl<K: TrieKey> Prefix<K> {
    /// Canonicalize `key` to `plen` bits; `plen` must fit the key width.
    pub fn new(key: K, plen: u8) -> Result<Prefix<K>, Error> {
        if plen > K::WIDTH {
            return Err(Error::InvalidPrefix {
                len: plen,
                width: K::WIDTH,
            });
        }
        Ok(Prefix {
            key: key.canonical(plen),
            plen,
        })
    }

    /// Full-width prefix for a single key.
    pub fn host(key: K) -> Prefix<K> {
        Prefix {
            key,
            plen: K::WIDTH,
        }
    }

    // For keys already canonical by construction.
    pub(crate) fn from_raw(key: K, plen: u8) -> Prefix<K> {
        debug_assert!(plen <= K::WIDTH);
        debug_assert!(key == key.canonical(plen));
        Prefix { key, plen }
    }

    #[inline]
    pub fn key(&self) -> K {
        self.key
    }

    #[inline]
    pub fn plen(&self) -> u8 {
        self.plen
    }
}
