//! Multi-field packet classification: arena-built LPM tries and range
//! indexes, intersected per dimension into ordered rule matches.

pub mod arena;
pub mod attribute;
pub mod bitset;
pub mod classifier;
pub mod constants;
pub mod errors;
pub mod helpers;
pub mod range;
pub mod trie;
pub mod types;

use once_cell::sync::OnceCell;

pub use arena::Arena;
pub use attribute::{AttributeIndex, AttributeKind, MatchValue};
pub use bitset::RuleBitset;
pub use classifier::{Classifier, Matches};
pub use constants::{RULE_CAPACITY, VLAN_MAX};
pub use errors::Error;
pub use helpers::{Prefix, TrieKey};
pub use range::{decompose, RangeIndex};
pub use trie::LpmTrie;
pub use types::{
    ActionId, DeviceId, Net4, Net6, PacketFields, PortRange, ProtoRange, Rule, RuleIndex,
    VlanRange,
};

// Bitset geometry must stay in lockstep with the rule capacity.
const _: () = assert!(constants::RULE_CAPACITY % 64 == 0);
const _: () = assert!(constants::BITSET_WORDS * 64 == constants::RULE_CAPACITY);

// ---- logging bootstrap ---------------------------------------------------
pub(crate) fn ensure_logging() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        let _ = env_logger::builder()
            .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
            .try_init();
    });
}
