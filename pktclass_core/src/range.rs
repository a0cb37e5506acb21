//! Range-to-prefix decomposition and the 16-bit range index

use crate::arena::Arena;
use crate::bitset::RuleBitset;
use crate::errors::Error;
use crate::helpers::{u16_key, Prefix, TrieKey};
use crate::trie::LpmTrie;
use crate::types::RuleIndex;

/// Decompose the inclusive `[from, to]` range into the minimal run of
/// canonical prefixes covering exactly its keys, appended to `out` in
/// ascending key order.
///
/// Greedy alignment scan: each step takes the largest power-of-two block
/// that is aligned at `from` and does not overrun `to`. A range over the
/// whole key space collapses to the single length-0 prefix; any other
/// range yields at most `2 * WIDTH - 2` prefixes.
pub fn decompose<K: TrieKey>(from: K, to: K, out: &mut Vec<Prefix<K>>) {
    debug_assert!(from <= to);
    if from > to {
        return;
    }
    if from == K::ZERO && to == K::MAX {
        out.push(Prefix::from_raw(K::ZERO, 0));
        return;
    }
    let mut from = from;
    loop {
        // Largest block aligned at `from`, capped by the span left to cover.
        // The whole-space case is gone, so the span fits the key type.
        let align = from.trailing_zeros();
        let span = (to - from) + K::pow2(0);
        let span_exp = K::WIDTH as u32 - 1 - span.leading_zeros();
        let exp = align.min(span_exp) as u8;

        out.push(Prefix::from_raw(from, K::WIDTH - exp));

        let end = from + (K::pow2(exp) - K::pow2(0));
        if end >= to {
            return;
        }
        from = end + K::pow2(0);
    }
}

/// Range index over 16-bit field domains (ports, protocol numbers, VLAN
/// ids): ranges become cover prefixes in an LPM trie over left-aligned
/// 32-bit keys, so containment lookups reuse the trie walk unchanged.
#[derive(Debug, Default)]
pub struct RangeIndex {
    trie: LpmTrie<u32>,
}

impl RangeIndex {
    pub fn new() -> RangeIndex {
        RangeIndex {
            trie: LpmTrie::new(),
        }
    }

    /// Store the inclusive `[from, to]` range for `rule`. The typed range
    /// constructors guarantee `from <= to` upstream.
    pub fn insert(
        &mut self,
        arena: &mut Arena,
        from: u16,
        to: u16,
        rule: RuleIndex,
    ) -> Result<(), Error> {
        let lo = u16_key(from);
        let hi = u16_key(to) | 0xFFFF;
        self.trie.insert_range(arena, lo, hi, rule)
    }

    /// Every rule whose stored range contains `value`.
    #[inline]
    pub fn lookup(&self, value: u16) -> &RuleBitset {
        self.trie.lookup(u16_key(value))
    }
}
