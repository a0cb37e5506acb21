//! Constants and compile-time bounds for the classification engine

pub const RULE_CAPACITY: usize = 1024; // rules per classifier generation

pub const BITSET_WORDS: usize = RULE_CAPACITY / 64;

pub const NIL: u32 = u32::MAX; // empty child slot in node pools

pub const VLAN_MAX: u16 = 4095; // 12-bit 802.1Q VID
