//! Dimension-intersection classifier over per-attribute indexes

use std::mem::size_of;

use log::{debug, info, warn};
use metrics::{counter, gauge};

use crate::arena::Arena;
use crate::attribute::{AttributeIndex, AttributeKind};
use crate::bitset::RuleBitset;
use crate::constants::RULE_CAPACITY;
use crate::ensure_logging;
use crate::errors::Error;
use crate::types::{ActionId, PacketFields, Rule, RuleIndex};

/// Immutable multi-field classifier for one configuration generation.
///
/// Built single-threaded by [`Classifier::build`], then shared read-only:
/// [`Classifier::query`] takes `&self`, allocates nothing and takes no
/// locks, so any number of worker threads may classify against the same
/// instance concurrently. A rebuild always produces a fresh instance; the
/// surrounding swap mechanism decides when workers see it.
#[derive(Debug)]
pub struct Classifier {
    signature: Vec<AttributeKind>,
    indices: Vec<AttributeIndex>,
    actions: Vec<ActionId>,
}

impl Classifier {
    /// Build a classifier over `signature` from `rules`, charging every
    /// allocation against `arena`.
    ///
    /// All-or-nothing: on error no classifier exists and the caller keeps
    /// serving the previous generation, discarding or resetting the arena
    /// with the failed attempt's charges. `capacity` is the generation's
    /// declared rule budget and must not exceed [`RULE_CAPACITY`].
    pub fn build(
        signature: &[AttributeKind],
        rules: &[Rule],
        capacity: usize,
        arena: &mut Arena,
    ) -> Result<Classifier, Error> {
        ensure_logging();
        counter!("pktclass_builds_total").increment(1);
        info!(
            "[BUILD] {} rules over {} dimensions, capacity {}",
            rules.len(),
            signature.len(),
            capacity
        );
        match Classifier::build_inner(signature, rules, capacity, arena) {
            Ok(classifier) => {
                debug!("[BUILD] done, arena used {} bytes", arena.used());
                gauge!("pktclass_arena_used_bytes").set(arena.used() as f64);
                Ok(classifier)
            }
            Err(err) => {
                counter!("pktclass_build_failures_total").increment(1);
                warn!("[BUILD] failed: {}", err);
                Err(err)
            }
        }
    }

    fn build_inner(
        signature: &[AttributeKind],
        rules: &[Rule],
        capacity: usize,
        arena: &mut Arena,
    ) -> Result<Classifier, Error> {
        if capacity > RULE_CAPACITY {
            return Err(Error::CapacityExceeded {
                requested: capacity,
                limit: RULE_CAPACITY,
            });
        }
        if rules.len() > capacity {
            return Err(Error::CapacityExceeded {
                requested: rules.len(),
                limit: capacity,
            });
        }

        let mut indices: Vec<AttributeIndex> = signature
            .iter()
            .map(|kind| AttributeIndex::new(*kind))
            .collect();

        for (rule_index, rule) in rules.iter().enumerate() {
            let rule_index = rule_index as RuleIndex;
            if rule.values.len() != signature.len() {
                return Err(Error::DimensionMismatch {
                    rule: rule_index,
                    expected: signature.len(),
                    found: rule.values.len(),
                });
            }
            for (index, value) in indices.iter_mut().zip(&rule.values) {
                index.insert(arena, value, rule_index)?;
            }
        }

        arena.charge(rules.len() * size_of::<ActionId>())?;
        let actions = rules.iter().map(|rule| rule.action).collect();

        Ok(Classifier {
            signature: signature.to_vec(),
            indices,
            actions,
        })
    }

    /// Classify one packet.
    ///
    /// Never fails: an empty result is the normal negative. Each dimension
    /// yields the rules matching its field; the intersection of all of them
    /// is the match set. A zero-dimension signature matches every stored
    /// rule, the identity element of the intersection.
    #[inline]
    pub fn query(&self, fields: &PacketFields) -> Matches<'_> {
        let mut rules = RuleBitset::first_n(self.actions.len());
        for index in &self.indices {
            rules.intersect_with(index.query(fields));
            if rules.is_empty() {
                break;
            }
        }
        Matches {
            rules,
            actions: &self.actions,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.actions.len()
    }

    pub fn signature(&self) -> &[AttributeKind] {
        &self.signature
    }

    /// Action stored for `rule`, if the index is in range.
    pub fn action(&self, rule: RuleIndex) -> Option<ActionId> {
        self.actions.get(rule as usize).copied()
    }
}

/// Result of one classification: the matched-rule set plus the action
/// table to resolve it against.
#[derive(Debug, Clone, Copy)]
pub struct Matches<'a> {
    rules: RuleBitset,
    actions: &'a [ActionId],
}

impl<'a> Matches<'a> {
    /// The matched rules as a bitset.
    pub fn rules(&self) -> &RuleBitset {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.count()
    }

    /// Matched actions in ascending rule-index order. Callers may rely on
    /// this order for first-match-wins policies.
    pub fn actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.rules.iter().map(|rule| self.actions[rule as usize])
    }

    /// The lowest-indexed matched action.
    pub fn first_action(&self) -> Option<ActionId> {
        self.rules.first().map(|rule| self.actions[rule as usize])
    }
}
