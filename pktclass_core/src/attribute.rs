//! Per-dimension attribute indexes behind a uniform bitset query

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::mem::size_of;

use crate::arena::Arena;
use crate::bitset::RuleBitset;
use crate::constants::VLAN_MAX;
use crate::errors::Error;
use crate::range::RangeIndex;
use crate::trie::LpmTrie;
use crate::types::{
    DeviceId, Net4, Net6, PacketFields, PortRange, ProtoRange, RuleIndex, VlanRange,
};

/// Which packet field a classifier dimension matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Device,
    Vlan,
    SrcNet4,
    DstNet4,
    SrcNet6,
    DstNet6,
    Proto,
    SrcPort,
    DstPort,
}

impl AttributeKind {
    /// Whether `value` has the right shape for this dimension.
    pub fn accepts(&self, value: &MatchValue) -> bool {
        matches!(
            (self, value),
            (AttributeKind::Device, MatchValue::Device(_))
                | (AttributeKind::Vlan, MatchValue::Vlan(_))
                | (
                    AttributeKind::SrcNet4 | AttributeKind::DstNet4,
                    MatchValue::Net4(_)
                )
                | (
                    AttributeKind::SrcNet6 | AttributeKind::DstNet6,
                    MatchValue::Net6(_)
                )
                | (AttributeKind::Proto, MatchValue::Proto(_))
                | (
                    AttributeKind::SrcPort | AttributeKind::DstPort,
                    MatchValue::Port(_)
                )
        )
    }
}

/// A rule's match value on one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchValue {
    Device(DeviceId),
    Vlan(VlanRange),
    Net4(Net4),
    Net6(Net6),
    Proto(ProtoRange),
    Port(PortRange),
}

/// Backend storage, picked by the dimension's attribute kind. Device ids
/// have no prefix structure, so they match by exact value only.
#[derive(Debug)]
enum Backend {
    Device(HashMap<DeviceId, RuleBitset>),
    Range(RangeIndex),
    Net4(LpmTrie<u32>),
    Net6(LpmTrie<u128>),
}

/// One classifier dimension: an attribute kind plus the index over every
/// rule's match value on that dimension.
#[derive(Debug)]
pub struct AttributeIndex {
    kind: AttributeKind,
    backend: Backend,
}

impl AttributeIndex {
    pub fn new(kind: AttributeKind) -> AttributeIndex {
        let backend = match kind {
            AttributeKind::Device => Backend::Device(HashMap::new()),
            AttributeKind::Vlan
            | AttributeKind::Proto
            | AttributeKind::SrcPort
            | AttributeKind::DstPort => Backend::Range(RangeIndex::new()),
            AttributeKind::SrcNet4 | AttributeKind::DstNet4 => Backend::Net4(LpmTrie::new()),
            AttributeKind::SrcNet6 | AttributeKind::DstNet6 => Backend::Net6(LpmTrie::new()),
        };
        AttributeIndex { kind, backend }
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Index `rule`'s match value on this dimension.
    pub fn insert(
        &mut self,
        arena: &mut Arena,
        value: &MatchValue,
        rule: RuleIndex,
    ) -> Result<(), Error> {
        match (&mut self.backend, value) {
            (Backend::Device(map), MatchValue::Device(device)) => {
                match map.entry(*device) {
                    Entry::Vacant(slot) => {
                        arena.charge(size_of::<(DeviceId, RuleBitset)>())?;
                        let mut rules = RuleBitset::EMPTY;
                        rules.insert(rule);
                        slot.insert(rules);
                    }
                    Entry::Occupied(mut slot) => {
                        slot.get_mut().insert(rule);
                    }
                }
                Ok(())
            }
            (Backend::Range(index), MatchValue::Vlan(range)) => {
                let (from, to) = range.bounds();
                index.insert(arena, from, to, rule)
            }
            (Backend::Range(index), MatchValue::Proto(range)) => {
                let (from, to) = range.bounds();
                index.insert(arena, from, to, rule)
            }
            (Backend::Range(index), MatchValue::Port(range)) => {
                let (from, to) = range.bounds();
                index.insert(arena, from, to, rule)
            }
            (Backend::Net4(trie), MatchValue::Net4(net)) => trie.insert(arena, net.prefix(), rule),
            (Backend::Net6(trie), MatchValue::Net6(net)) => trie.insert(arena, net.prefix(), rule),
            _ => Err(Error::AttributeMismatch {
                kind: self.kind,
                rule,
            }),
        }
    }

    /// Rules whose stored value on this dimension matches the relevant
    /// field of `fields`. VLAN tags are masked to the 12-bit id domain,
    /// so out-of-domain inputs alias their low bits instead of trapping.
    pub fn query(&self, fields: &PacketFields) -> &RuleBitset {
        match (&self.backend, self.kind) {
            (Backend::Device(map), AttributeKind::Device) => {
                map.get(&fields.device).unwrap_or(&RuleBitset::EMPTY)
            }
            (Backend::Range(index), AttributeKind::Vlan) => index.lookup(fields.vlan & VLAN_MAX),
            (Backend::Range(index), AttributeKind::Proto) => index.lookup(fields.proto),
            (Backend::Range(index), AttributeKind::SrcPort) => index.lookup(fields.src_port),
            (Backend::Range(index), AttributeKind::DstPort) => index.lookup(fields.dst_port),
            (Backend::Net4(trie), AttributeKind::SrcNet4) => trie.lookup(u32::from(fields.src4)),
            (Backend::Net4(trie), AttributeKind::DstNet4) => trie.lookup(u32::from(fields.dst4)),
            (Backend::Net6(trie), AttributeKind::SrcNet6) => trie.lookup(u128::from(fields.src6)),
            (Backend::Net6(trie), AttributeKind::DstNet6) => trie.lookup(u128::from(fields.dst6)),
            // Kind and backend are paired at construction.
            _ => &RuleBitset::EMPTY,
        }
    }
}
