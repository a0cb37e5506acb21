//! Arena-indexed longest-prefix-match trie carrying covering rule sets

use std::mem::size_of;

use log::{debug, trace};

use crate::arena::Arena;
use crate::bitset::RuleBitset;
use crate::constants::NIL;
use crate::errors::Error;
use crate::helpers::{Prefix, TrieKey};
use crate::range::decompose;
use crate::types::RuleIndex;

/// Trie node; children are pool indices, `NIL` when absent.
#[derive(Debug)]
struct Node<K: TrieKey> {
    key: K,
    plen: u8,
    left: u32,
    right: u32,
    /// Every rule whose stored prefix covers this node's bit-path.
    rules: RuleBitset,
    /// Most recently stored exact value, for single-result lookups.
    value: Option<RuleIndex>,
}

/// Which child slot of a node a link goes through.
#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Longest-prefix-match trie over `K`-bit keys.
///
/// Nodes live in one contiguous pool and reference each other by `u32`
/// index, so a built trie is a single bulk allocation with no pointer
/// chasing across the heap. Built single-threaded against an [`Arena`]
/// budget, then queried immutably: lookups take `&self`, never allocate
/// and never lock.
///
/// Each node accumulates the bitset of *all* rules whose stored prefix
/// covers its bit-path, so the deepest node matched by a key already holds
/// the complete covering-rule set — longest-match and range-union lookups
/// read the same field.
#[derive(Debug)]
pub struct LpmTrie<K: TrieKey> {
    nodes: Vec<Node<K>>,
    root: u32,
}

impl<K: TrieKey> LpmTrie<K> {
    pub fn new() -> LpmTrie<K> {
        LpmTrie {
            nodes: Vec::new(),
            root: NIL,
        }
    }

    /// Number of nodes in the pool.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    fn link(&self, parent: u32, side: Side) -> u32 {
        if parent == NIL {
            return self.root;
        }
        let node = &self.nodes[parent as usize];
        match side {
            Side::Left => node.left,
            Side::Right => node.right,
        }
    }

    #[inline]
    fn set_link(&mut self, parent: u32, side: Side, target: u32) {
        if parent == NIL {
            self.root = target;
            return;
        }
        let node = &mut self.nodes[parent as usize];
        match side {
            Side::Left => node.left = target,
            Side::Right => node.right = target,
        }
    }

    /// Covering set a new node created below `parent` starts from.
    #[inline]
    fn inherited(&self, parent: u32) -> RuleBitset {
        if parent == NIL {
            RuleBitset::EMPTY
        } else {
            self.nodes[parent as usize].rules
        }
    }

    /// Charge the arena and push a fresh unlinked node.
    fn alloc_node(
        &mut self,
        arena: &mut Arena,
        key: K,
        plen: u8,
        rules: RuleBitset,
        value: Option<RuleIndex>,
    ) -> Result<u32, Error> {
        arena.charge(size_of::<Node<K>>())?;
        debug_assert!(self.nodes.len() < NIL as usize);
        let index = self.nodes.len() as u32;
        self.nodes.push(Node {
            key,
            plen,
            left: NIL,
            right: NIL,
            rules,
            value,
        });
        Ok(index)
    }

    /// Add `rule` to `start` and every node below it; all of them sit inside
    /// the key range of the prefix just stored at or above `start`.
    fn propagate(&mut self, start: u32, rule: RuleIndex) {
        let mut stack = vec![start];
        while let Some(index) = stack.pop() {
            let node = &mut self.nodes[index as usize];
            node.rules.insert(rule);
            if node.left != NIL {
                stack.push(node.left);
            }
            if node.right != NIL {
                stack.push(node.right);
            }
        }
    }

    /// Insert `prefix` tagged with `rule`.
    ///
    /// Any canonical prefix is structurally valid, so the only failure mode
    /// is arena exhaustion, which aborts the surrounding build. Re-inserting
    /// an identical prefix overwrites the stored value (last write wins) and
    /// extends the covering set. Links are wired only after every allocation
    /// for the step has succeeded, so a failed insert leaves the reachable
    /// trie untouched.
    pub fn insert(
        &mut self,
        arena: &mut Arena,
        prefix: Prefix<K>,
        rule: RuleIndex,
    ) -> Result<(), Error> {
        let stored_key = prefix.key();
        let plen = prefix.plen();
        trace!("[INSERT] key={:?}, plen={}, rule={}", stored_key, plen, rule);

        let mut parent = NIL;
        let mut side = Side::Left;

        loop {
            let current = self.link(parent, side);

            // --- Case 1: empty link ---
            if current == NIL {
                let mut rules = self.inherited(parent);
                rules.insert(rule);
                let leaf = self.alloc_node(arena, stored_key, plen, rules, Some(rule))?;
                self.set_link(parent, side, leaf);
                trace!("[INSERT] new leaf at index={}", leaf);
                return Ok(());
            }

            let node = &self.nodes[current as usize];
            let (node_key, node_plen) = (node.key, node.plen);

            let max_cmp_len = plen.min(node_plen);
            let cpl = stored_key.common_prefix_len(node_key, max_cmp_len);

            // --- Case 2a: exact match, overwrite value and widen the set ---
            if cpl == plen && plen == node_plen {
                debug_assert!(stored_key == node_key);
                debug!("[INSERT] exact match at index={}, last write wins", current);
                self.nodes[current as usize].value = Some(rule);
                self.propagate(current, rule);
                return Ok(());
            }

            // --- Case 2b: shorter prefix covering the node, insert above ---
            if cpl == plen && plen < node_plen {
                let mut rules = self.inherited(parent);
                rules.insert(rule);
                let above = self.alloc_node(arena, stored_key, plen, rules, Some(rule))?;
                let existing_bit = node_key.bit(plen);
                {
                    let above_node = &mut self.nodes[above as usize];
                    if existing_bit == 0 {
                        above_node.left = current;
                    } else {
                        above_node.right = current;
                    }
                }
                self.set_link(parent, side, above);
                self.propagate(current, rule);
                debug!(
                    "[INSERT] insert-above at index={}, adopted index={}",
                    above, current
                );
                return Ok(());
            }

            // --- Case 2c: keys diverge, split at the common prefix ---
            if cpl < plen && cpl < node_plen {
                // The branch node sits above the new prefix, so it inherits
                // the parent's covering set and carries no stored value.
                let inherited = self.inherited(parent);
                let branch =
                    self.alloc_node(arena, stored_key.canonical(cpl), cpl, inherited, None)?;
                let mut leaf_rules = inherited;
                leaf_rules.insert(rule);
                let leaf = self.alloc_node(arena, stored_key, plen, leaf_rules, Some(rule))?;
                {
                    let branch_node = &mut self.nodes[branch as usize];
                    if stored_key.bit(cpl) == 0 {
                        branch_node.left = leaf;
                        branch_node.right = current;
                    } else {
                        branch_node.left = current;
                        branch_node.right = leaf;
                    }
                }
                self.set_link(parent, side, branch);
                debug!(
                    "[INSERT] split at plen={}, branch index={}, leaf index={}",
                    cpl, branch, leaf
                );
                return Ok(());
            }

            // --- Case 2d: node covers the prefix, descend ---
            debug_assert!(cpl == node_plen && node_plen < plen);
            parent = current;
            side = if stored_key.bit(node_plen) == 0 {
                Side::Left
            } else {
                Side::Right
            };
            trace!("[INSERT] descend through index={}", current);
        }
    }

    /// Insert every canonical cover prefix of the inclusive `[from, to]`
    /// range, all tagged with `rule`. The caller guarantees `from <= to`;
    /// the typed range constructors enforce it upstream.
    pub fn insert_range(
        &mut self,
        arena: &mut Arena,
        from: K,
        to: K,
        rule: RuleIndex,
    ) -> Result<(), Error> {
        let mut covers = Vec::new();
        decompose(from, to, &mut covers);
        debug!(
            "[INSERT] range {:?}..={:?} decomposed into {} prefixes",
            from,
            to,
            covers.len()
        );
        for prefix in covers {
            self.insert(arena, prefix, rule)?;
        }
        Ok(())
    }

    /// Aggregate lookup: the bitset of every rule whose stored prefix covers
    /// `key`, read at the deepest matched node.
    #[inline]
    pub fn lookup(&self, key: K) -> &RuleBitset {
        match self.deepest_match(key) {
            Some(index) => &self.nodes[index as usize].rules,
            None => &RuleBitset::EMPTY,
        }
    }

    /// Single-result lookup: the value of the most specific stored prefix
    /// covering `key`. Identical prefixes overwrite on insert, so ties go to
    /// the last insert.
    pub fn lookup_single(&self, key: K) -> Option<RuleIndex> {
        let mut current = self.root;
        let mut best = None;
        while current != NIL {
            let node = &self.nodes[current as usize];
            if key.common_prefix_len(node.key, node.plen) < node.plen {
                break;
            }
            if node.value.is_some() {
                best = node.value;
            }
            if node.plen >= K::WIDTH {
                break;
            }
            current = if key.bit(node.plen) == 0 {
                node.left
            } else {
                node.right
            };
        }
        best
    }

    fn deepest_match(&self, key: K) -> Option<u32> {
        let mut current = self.root;
        let mut deepest = None;
        while current != NIL {
            let node = &self.nodes[current as usize];
            if key.common_prefix_len(node.key, node.plen) < node.plen {
                break;
            }
            deepest = Some(current);
            if node.plen >= K::WIDTH {
                break;
            }
            current = if key.bit(node.plen) == 0 {
                node.left
            } else {
                node.right
            };
        }
        deepest
    }
}

impl<K: TrieKey> Default for LpmTrie<K> {
    fn default() -> LpmTrie<K> {
        LpmTrie::new()
    }
}
