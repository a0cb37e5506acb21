use std::net::{Ipv4Addr, Ipv6Addr};

use proptest::collection::vec as pvec;
use proptest::prelude::*;

use pktclass_core::arena::Arena;
use pktclass_core::helpers::{u16_key, Prefix};
use pktclass_core::range::{decompose, RangeIndex};
use pktclass_core::trie::LpmTrie;

fn v4(addr: &str) -> u32 {
    u32::from(addr.parse::<Ipv4Addr>().unwrap())
}

fn v6(addr: &str) -> u128 {
    u128::from(addr.parse::<Ipv6Addr>().unwrap())
}

fn p4(addr: &str, plen: u8) -> Prefix<u32> {
    Prefix::new(v4(addr), plen).unwrap()
}

#[test]
fn empty_trie_matches_nothing() {
    let trie: LpmTrie<u32> = LpmTrie::new();
    assert!(trie.is_empty());
    assert_eq!(trie.len(), 0);
    assert!(trie.lookup(v4("10.0.0.1")).is_empty());
    assert_eq!(trie.lookup_single(v4("10.0.0.1")), None);
}

#[test]
fn longer_prefix_wins_single_lookup() {
    let mut arena = Arena::unbounded();
    let mut trie = LpmTrie::new();
    trie.insert(&mut arena, p4("10.0.0.0", 24), 0).unwrap();
    trie.insert(&mut arena, p4("10.0.0.0", 25), 1).unwrap();

    assert_eq!(trie.lookup_single(v4("10.0.0.5")), Some(1));
    assert_eq!(trie.lookup_single(v4("10.0.0.200")), Some(0));

    // The aggregate lookup sees every covering prefix.
    assert_eq!(trie.lookup(v4("10.0.0.5")).iter().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(trie.lookup(v4("10.0.0.200")).iter().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn covering_set_survives_reverse_insert_order() {
    let mut arena = Arena::unbounded();
    let mut trie = LpmTrie::new();
    // More specific prefix first: the later /24 must still cover it.
    trie.insert(&mut arena, p4("10.0.0.0", 25), 0).unwrap();
    trie.insert(&mut arena, p4("10.0.0.0", 24), 1).unwrap();

    assert_eq!(trie.lookup(v4("10.0.0.5")).iter().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(trie.lookup(v4("10.0.0.200")).iter().collect::<Vec<_>>(), vec![1]);
    assert_eq!(trie.lookup_single(v4("10.0.0.5")), Some(0));
    assert_eq!(trie.lookup_single(v4("10.0.0.200")), Some(1));
}

#[test]
fn nested_prefixes_accumulate() {
    let mut arena = Arena::unbounded();
    let mut trie = LpmTrie::new();
    trie.insert(&mut arena, p4("10.0.0.0", 8), 0).unwrap();
    trie.insert(&mut arena, p4("10.1.0.0", 16), 1).unwrap();
    trie.insert(&mut arena, p4("10.1.2.0", 24), 2).unwrap();

    assert_eq!(trie.lookup(v4("10.1.2.3")).iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(trie.lookup(v4("10.1.9.1")).iter().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(trie.lookup(v4("10.9.9.9")).iter().collect::<Vec<_>>(), vec![0]);
    assert!(trie.lookup(v4("11.0.0.1")).is_empty());
}

#[test]
fn equal_prefix_last_insert_wins() {
    let mut arena = Arena::unbounded();
    let mut trie = LpmTrie::new();
    trie.insert(&mut arena, p4("192.168.0.0", 16), 3).unwrap();
    trie.insert(&mut arena, p4("192.168.0.0", 16), 9).unwrap();

    assert_eq!(trie.lookup_single(v4("192.168.4.4")), Some(9));
    // Both rules keep covering the key.
    assert_eq!(trie.lookup(v4("192.168.4.4")).iter().collect::<Vec<_>>(), vec![3, 9]);
}

#[test]
fn divergent_key_stops_at_branch() {
    let mut arena = Arena::unbounded();
    let mut trie = LpmTrie::new();
    trie.insert(&mut arena, p4("10.0.0.0", 24), 0).unwrap();
    trie.insert(&mut arena, p4("10.0.1.0", 24), 1).unwrap();

    // The split branch covers neither /24, so a key under it alone matches
    // nothing.
    assert!(trie.lookup(v4("10.0.2.5")).is_empty());
    assert_eq!(trie.lookup_single(v4("10.0.2.5")), None);
    assert_eq!(trie.lookup(v4("10.0.0.5")).iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(trie.lookup(v4("10.0.1.7")).iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn zero_length_prefix_covers_everything() {
    let mut arena = Arena::unbounded();
    let mut trie = LpmTrie::new();
    trie.insert(&mut arena, p4("10.0.0.0", 32), 0).unwrap();
    trie.insert(&mut arena, Prefix::new(0, 0).unwrap(), 1).unwrap();

    assert_eq!(trie.lookup(v4("203.0.113.9")).iter().collect::<Vec<_>>(), vec![1]);
    assert_eq!(trie.lookup(v4("10.0.0.0")).iter().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(trie.lookup_single(v4("10.0.0.0")), Some(0));
    assert_eq!(trie.lookup_single(v4("203.0.113.9")), Some(1));
}

#[test]
fn ipv6_longest_match() {
    let mut arena = Arena::unbounded();
    let mut trie: LpmTrie<u128> = LpmTrie::new();
    trie.insert(&mut arena, Prefix::new(v6("2001:db8::"), 32).unwrap(), 0)
        .unwrap();
    trie.insert(&mut arena, Prefix::new(v6("2001:db8:1::"), 48).unwrap(), 1)
        .unwrap();

    assert_eq!(trie.lookup_single(v6("2001:db8:1::1")), Some(1));
    assert_eq!(trie.lookup_single(v6("2001:db8:ffff::1")), Some(0));
    assert_eq!(trie.lookup_single(v6("2001:db9::1")), None);
    assert_eq!(trie.lookup(v6("2001:db8:1::1")).iter().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn full_width_host_prefix() {
    let mut arena = Arena::unbounded();
    let mut trie = LpmTrie::new();
    trie.insert(&mut arena, Prefix::host(v4("10.0.0.1")), 0).unwrap();

    assert_eq!(trie.lookup_single(v4("10.0.0.1")), Some(0));
    assert_eq!(trie.lookup_single(v4("10.0.0.2")), None);
}

#[test]
fn prefix_rejects_oversized_length() {
    assert!(Prefix::new(0u32, 33).is_err());
    assert!(Prefix::new(0u128, 129).is_err());
    // Host bits are dropped on construction.
    let canonical = Prefix::new(v4("10.0.0.77"), 24).unwrap();
    assert_eq!(canonical.key(), v4("10.0.0.0"));
    assert_eq!(canonical.plen(), 24);
}

#[test]
fn decompose_full_range_is_root_prefix() {
    let mut covers = Vec::new();
    decompose(0u32, u32::MAX, &mut covers);
    assert_eq!(covers.len(), 1);
    assert_eq!(covers[0].plen(), 0);
}

#[test]
fn decompose_single_value_is_host_prefix() {
    let mut covers = Vec::new();
    decompose(5u32, 5, &mut covers);
    assert_eq!(covers, vec![Prefix::new(5, 32).unwrap()]);
}

#[test]
fn decompose_aligned_block_is_one_prefix() {
    let mut covers = Vec::new();
    decompose(16u32, 23, &mut covers);
    assert_eq!(covers, vec![Prefix::new(16, 29).unwrap()]);
}

#[test]
fn decompose_vlan_block() {
    // [100, 103] in the left-aligned 16-bit key space collapses to one
    // 14-bit prefix.
    let mut covers = Vec::new();
    decompose(u16_key(100), u16_key(103) | 0xFFFF, &mut covers);
    assert_eq!(covers.len(), 1);
    assert_eq!(covers[0].key(), u16_key(100));
    assert_eq!(covers[0].plen(), 14);
}

#[test]
fn decompose_worst_case_is_bounded() {
    // [1, MAX-1] needs the full 2*W - 2 prefixes; they must tile the range
    // exactly, in ascending order.
    let mut covers = Vec::new();
    decompose(1u32, u32::MAX - 1, &mut covers);
    assert_eq!(covers.len(), 62);

    let mut next: u64 = 1;
    for cover in &covers {
        assert_eq!(cover.key() as u64, next);
        next += 1u64 << (32 - cover.plen());
    }
    assert_eq!(next, u32::MAX as u64);
}

#[test]
fn range_index_port_interval() {
    let mut arena = Arena::unbounded();
    let mut index = RangeIndex::new();
    index.insert(&mut arena, 80, 443, 0).unwrap();

    for port in [80u16, 200, 443] {
        assert!(index.lookup(port).contains(0), "port {port}");
    }
    for port in [0u16, 79, 444, 8080, u16::MAX] {
        assert!(index.lookup(port).is_empty(), "port {port}");
    }
}

#[test]
fn range_index_full_domain() {
    let mut arena = Arena::unbounded();
    let mut index = RangeIndex::new();
    index.insert(&mut arena, 0, u16::MAX, 1).unwrap();
    assert!(index.lookup(0).contains(1));
    assert!(index.lookup(u16::MAX).contains(1));
}

#[test]
fn overlapping_ranges_union() {
    let mut arena = Arena::unbounded();
    let mut index = RangeIndex::new();
    index.insert(&mut arena, 100, 200, 0).unwrap();
    index.insert(&mut arena, 150, 300, 1).unwrap();

    assert_eq!(index.lookup(175).iter().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(index.lookup(120).iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(index.lookup(250).iter().collect::<Vec<_>>(), vec![1]);
    assert!(index.lookup(301).is_empty());
}

fn mask32(plen: u8) -> u32 {
    if plen == 0 {
        0
    } else {
        !0u32 << (32 - plen)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn trie_matches_linear_scan(
        prefixes in pvec((any::<u32>(), 0u8..=32), 1..24),
        keys in pvec(any::<u32>(), 16)
    ) {
        let mut arena = Arena::unbounded();
        let mut trie = LpmTrie::new();

        let canon: Vec<(u32, u8)> = prefixes
            .iter()
            .map(|&(key, plen)| (key & mask32(plen), plen))
            .collect();
        for (rule, &(key, plen)) in canon.iter().enumerate() {
            trie.insert(&mut arena, Prefix::new(key, plen).unwrap(), rule as u32).unwrap();
        }

        for &key in &keys {
            let mut expect = Vec::new();
            let mut best: Option<(u8, u32)> = None;
            for (rule, &(pkey, plen)) in canon.iter().enumerate() {
                if key & mask32(plen) == pkey {
                    expect.push(rule as u32);
                    // Equal length re-covers the same prefix, so the later
                    // rule wins.
                    if best.map_or(true, |(len, _)| plen >= len) {
                        best = Some((plen, rule as u32));
                    }
                }
            }
            prop_assert_eq!(trie.lookup(key).iter().collect::<Vec<_>>(), expect);
            prop_assert_eq!(trie.lookup_single(key), best.map(|(_, rule)| rule));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn range_membership_matches_interval(a in any::<u16>(), b in any::<u16>()) {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        let mut arena = Arena::unbounded();
        let mut index = RangeIndex::new();
        index.insert(&mut arena, from, to, 0).unwrap();

        for value in 0..=u16::MAX {
            let hit = index.lookup(value).contains(0);
            prop_assert_eq!(hit, value >= from && value <= to, "value {}", value);
        }
    }
}
