//! Bounded rule bitset, the value type threaded through every index

use std::fmt;

use crate::constants::{BITSET_WORDS, RULE_CAPACITY};
use crate::types::RuleIndex;

/// Fixed-capacity set of rule indices, one bit per rule.
///
/// A plain value type: comparable, hashable and `Copy`, so it can be embedded
/// in bulk-allocated trie nodes and used as a map key for deduplicating
/// identical attribute-value sets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RuleBitset {
    words: [u64; BITSET_WORDS],
}

impl RuleBitset {
    /// The empty set.
    pub const EMPTY: RuleBitset = RuleBitset {
        words: [0; BITSET_WORDS],
    };

    /// Set holding rules `0..n` — the intersection identity over `n` live
    /// rules.
    pub fn first_n(n: usize) -> RuleBitset {
        debug_assert!(n <= RULE_CAPACITY);
        let mut set = RuleBitset::EMPTY;
        let full = n / 64;
        for word in set.words.iter_mut().take(full) {
            *word = !0;
        }
        let rest = n % 64;
        if rest != 0 {
            set.words[full] = (1u64 << rest) - 1;
        }
        set
    }

    /// Add `rule` to the set.
    ///
    /// Rule counts are validated against `RULE_CAPACITY` before any index is
    /// built, so an out-of-capacity index here is a programming error and
    /// traps.
    #[inline]
    pub fn insert(&mut self, rule: RuleIndex) {
        debug_assert!(
            (rule as usize) < RULE_CAPACITY,
            "rule index {rule} out of capacity"
        );
        self.words[(rule / 64) as usize] |= 1u64 << (rule % 64);
    }

    #[inline]
    pub fn contains(&self, rule: RuleIndex) -> bool {
        if (rule as usize) >= RULE_CAPACITY {
            return false;
        }
        self.words[(rule / 64) as usize] & (1u64 << (rule % 64)) != 0
    }

    /// In-place union.
    #[inline]
    pub fn union_with(&mut self, other: &RuleBitset) {
        for (word, other_word) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= other_word;
        }
    }

    /// In-place intersection; allocation-free, safe for the query path.
    #[inline]
    pub fn intersect_with(&mut self, other: &RuleBitset) {
        for (word, other_word) in self.words.iter_mut().zip(other.words.iter()) {
            *word &= other_word;
        }
    }

    /// Pure intersection, leaving both operands untouched.
    #[inline]
    pub fn intersect(&self, other: &RuleBitset) -> RuleBitset {
        let mut out = *self;
        out.intersect_with(other);
        out
    }

    /// Number of rules in the set.
    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Lowest rule index in the set.
    pub fn first(&self) -> Option<RuleIndex> {
        self.iter().next()
    }

    /// Iterate set rule indices in ascending order.
    pub fn iter(&self) -> SetBits<'_> {
        SetBits {
            words: &self.words,
            word: self.words[0],
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &'a RuleBitset {
    type Item = RuleIndex;
    type IntoIter = SetBits<'a>;

    fn into_iter(self) -> SetBits<'a> {
        self.iter()
    }
}

impl fmt::Debug for RuleBitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Ascending iterator over set bits. Each step isolates the lowest set bit
/// of the current word, so early termination costs nothing beyond the bits
/// already yielded.
pub struct SetBits<'a> {
    words: &'a [u64; BITSET_WORDS],
    word: u64,
    index: usize,
}

impl Iterator for SetBits<'_> {
    type Item = RuleIndex;

    fn next(&mut self) -> Option<RuleIndex> {
        while self.word == 0 {
            self.index += 1;
            if self.index >= BITSET_WORDS {
                return None;
            }
            self.word = self.words[self.index];
        }
        let low = self.word & self.word.wrapping_neg();
        self.word ^= low;
        Some((self.index as u32) * 64 + low.trailing_zeros())
    }
}
