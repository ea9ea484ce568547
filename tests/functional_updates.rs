// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! `with`/`withPairs`/`withKeys`/`without`/`withoutKeys`/`withoutRange`/
//! `filter`/`mapValues` (spec.md §6's functional-update family).

use std::ops::Bound;

use cow_btree::ord::Comparator;
use cow_btree::tree::Tree;

fn small_tree() -> Tree<i32, i32> {
    let mut t = Tree::with_comparator_and_max_node_size(Comparator::natural(), 4);
    for k in 0..20 {
        t.set(k, k * 10, true).unwrap();
    }
    t
}

#[test]
fn with_leaves_the_source_untouched() {
    let t = small_tree();
    let t2 = t.with(100, 1000, true).unwrap();

    assert!(!t.has(&100).unwrap());
    assert!(t2.has(&100).unwrap());
    assert_eq!(t2.get(&100).unwrap(), Some(1000));
    assert_eq!(t2.len(), t.len() + 1);
    t2.check_valid().unwrap();
}

#[test]
fn with_pairs_and_with_keys() {
    let t = small_tree();
    let t2 = t.with_pairs([(100, 1), (101, 2)]).unwrap();
    assert_eq!(t2.get(&100).unwrap(), Some(1));
    assert_eq!(t2.get(&101).unwrap(), Some(2));
    assert_eq!(t2.len(), t.len() + 2);

    let t3 = t.with_keys([100, 101, 102], -1).unwrap();
    for k in [100, 101, 102] {
        assert_eq!(t3.get(&k).unwrap(), Some(-1));
    }
    t2.check_valid().unwrap();
    t3.check_valid().unwrap();
}

#[test]
fn without_and_without_keys_leave_the_source_untouched() {
    let t = small_tree();
    let t2 = t.without(&5).unwrap();
    assert!(t.has(&5).unwrap());
    assert!(!t2.has(&5).unwrap());
    assert_eq!(t2.len(), t.len() - 1);

    let t3 = t.without_keys([&1, &2, &3]).unwrap();
    for k in [1, 2, 3] {
        assert!(!t3.has(&k).unwrap());
    }
    assert_eq!(t3.len(), t.len() - 3);
    t2.check_valid().unwrap();
    t3.check_valid().unwrap();
}

#[test]
fn without_range_removes_exactly_the_half_open_interval() {
    let t = small_tree();
    let t2 = t.without_range(Bound::Included(&5), Bound::Excluded(&10)).unwrap();

    let expected: Vec<i32> = (0..20).filter(|k| !(5..10).contains(k)).collect();
    let got: Vec<i32> = t2.iter().map(|(k, _)| k).collect();
    assert_eq!(got, expected);
    assert_eq!(t.len(), 20, "source tree must be unaffected");
    t2.check_valid().unwrap();
}

#[test]
fn filter_keeps_only_matching_pairs() {
    let t = small_tree();
    let evens = t.filter(|k, _v| k % 2 == 0).unwrap();

    let expected: Vec<i32> = (0..20).filter(|k| k % 2 == 0).collect();
    let got: Vec<i32> = evens.iter().map(|(k, _)| k).collect();
    assert_eq!(got, expected);
    assert_eq!(t.len(), 20, "source tree must be unaffected");
    evens.check_valid().unwrap();
}

#[test]
fn map_values_preserves_keys_and_transforms_values() {
    let t = small_tree();
    let doubled = t.map_values(|_k, v| v * 2).unwrap();

    let original_keys: Vec<i32> = t.iter().map(|(k, _)| k).collect();
    let mapped_keys: Vec<i32> = doubled.iter().map(|(k, _)| k).collect();
    assert_eq!(mapped_keys, original_keys);

    for (k, v) in doubled.iter() {
        assert_eq!(v, k * 20);
    }
    doubled.check_valid().unwrap();
    assert_eq!(t.get(&3).unwrap(), Some(30), "source tree must be unaffected");
}
