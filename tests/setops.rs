// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Set-algebra properties: `union`, `intersect`, `subtract`, `bulk_load`
//! (spec.md §4.6).

use cow_btree::ord::Comparator;
use cow_btree::tree::Tree;
use cow_btree::{bulk_load, intersect, subtract, union};

fn tree_from(max_node_size: usize, pairs: impl IntoIterator<Item = (i32, i32)>) -> Tree<i32, i32> {
    let mut t = Tree::with_comparator_and_max_node_size(Comparator::natural(), max_node_size);
    for (k, v) in pairs {
        t.set(k, v, true).unwrap();
    }
    t
}

fn keep_left(_k: &i32, a: &i32, _b: &i32) -> i32 {
    *a
}

fn sum(_k: &i32, a: &i32, b: &i32) -> i32 {
    a + b
}

#[test]
fn union_of_disjoint_trees_contains_every_pair() {
    let a = tree_from(4, (0..20).step_by(2).map(|k| (k, k)));
    let b = tree_from(4, (1..20).step_by(2).map(|k| (k, k)));
    let u = union(&a, &b, &keep_left).unwrap();
    u.check_valid().unwrap();
    let got: Vec<(i32, i32)> = u.iter().collect();
    let expected: Vec<(i32, i32)> = (0..20).map(|k| (k, k)).collect();
    assert_eq!(got, expected);
}

#[test]
fn union_with_empty_tree_is_the_other_tree() {
    let a = tree_from(8, (0..30).map(|k| (k, k)));
    let empty: Tree<i32, i32> = Tree::with_comparator_and_max_node_size(a.comparator().clone(), a.max_node_size());
    let u1 = union(&a, &empty, &keep_left).unwrap();
    let u2 = union(&empty, &a, &keep_left).unwrap();
    let expected: Vec<(i32, i32)> = a.iter().collect();
    assert_eq!(u1.iter().collect::<Vec<_>>(), expected);
    assert_eq!(u2.iter().collect::<Vec<_>>(), expected);
}

#[test]
fn union_resolves_overlap_with_the_merge_callback() {
    let a = tree_from(4, (0..10).map(|k| (k, 1)));
    let b = tree_from(4, (5..15).map(|k| (k, 100)));
    let u = union(&a, &b, &sum).unwrap();
    u.check_valid().unwrap();
    for k in 0..15 {
        let expected = if k < 5 {
            1
        } else if k < 10 {
            101
        } else {
            100
        };
        assert_eq!(u.get(&k).unwrap(), Some(expected), "k={k}");
    }
}

#[test]
fn subtract_of_self_is_empty() {
    let a = tree_from(4, (0..50).map(|k| (k, k)));
    let diff = subtract(&a, &a).unwrap();
    assert!(diff.is_empty());
    diff.check_valid().unwrap();
}

#[test]
fn subtract_disjoint_is_unchanged() {
    let a = tree_from(4, (0..20).map(|k| (k, k)));
    let b = tree_from(4, (100..120).map(|k| (k, k)));
    let diff = subtract(&a, &b).unwrap();
    let got: Vec<(i32, i32)> = diff.iter().collect();
    let expected: Vec<(i32, i32)> = (0..20).map(|k| (k, k)).collect();
    assert_eq!(got, expected);
}

#[test]
fn subtract_removes_exactly_the_shared_keys() {
    let a = tree_from(4, (0..40).map(|k| (k, k)));
    let b = tree_from(4, (10..30).map(|k| (k, -1)));
    let diff = subtract(&a, &b).unwrap();
    diff.check_valid().unwrap();
    let got: Vec<i32> = diff.iter().map(|(k, _)| k).collect();
    let expected: Vec<i32> = (0..10).chain(30..40).collect();
    assert_eq!(got, expected);
}

#[test]
fn intersect_of_disjoint_trees_is_empty() {
    let a = tree_from(4, (0..20).map(|k| (k, k)));
    let b = tree_from(4, (100..120).map(|k| (k, k)));
    let i = intersect(&a, &b, &sum).unwrap();
    assert!(i.is_empty());
}

#[test]
fn intersect_combines_matching_keys() {
    let a = tree_from(4, (0..30).map(|k| (k, 1)));
    let b = tree_from(4, (20..50).map(|k| (k, 100)));
    let i = intersect(&a, &b, &sum).unwrap();
    i.check_valid().unwrap();
    let got: Vec<(i32, i32)> = i.iter().collect();
    let expected: Vec<(i32, i32)> = (20..30).map(|k| (k, 101)).collect();
    assert_eq!(got, expected);
}

#[test]
fn branching_mismatch_is_rejected_for_every_set_operation() {
    let a = tree_from(4, (0..10).map(|k| (k, k)));
    let b = tree_from(8, (0..10).map(|k| (k, k)));
    assert!(matches!(union(&a, &b, &keep_left), Err(cow_btree::TreeError::BranchingMismatch { .. })));
    assert!(matches!(subtract(&a, &b), Err(cow_btree::TreeError::BranchingMismatch { .. })));
    assert!(matches!(intersect(&a, &b, &keep_left), Err(cow_btree::TreeError::BranchingMismatch { .. })));
}

#[test]
fn bulk_load_round_trips_a_sorted_stream_and_stays_more_than_half_full() {
    let pairs: Vec<(i32, i32)> = (0..500).map(|k| (k, k * 2)).collect();
    let t = bulk_load(pairs.clone(), Comparator::natural(), 16).unwrap();
    t.check_valid().unwrap();
    assert_eq!(t.len(), pairs.len());
    let got: Vec<(i32, i32)> = t.iter().collect();
    assert_eq!(got, pairs);
}

#[test]
fn bulk_load_rejects_unsorted_input() {
    let pairs = vec![(1, 1), (3, 3), (2, 2)];
    let err = bulk_load(pairs, Comparator::natural(), 8).unwrap_err();
    assert!(matches!(err, cow_btree::TreeError::Unsorted { at_index: 2 }));
}

#[test]
fn bulk_load_rejects_duplicate_keys() {
    let pairs = vec![(1, 1), (1, 2)];
    let err = bulk_load(pairs, Comparator::natural(), 8).unwrap_err();
    assert!(matches!(err, cow_btree::TreeError::Unsorted { at_index: 1 }));
}

#[test]
fn union_reuses_shared_subtrees_without_reporting_them_as_different() {
    let base = tree_from(4, (0..200).map(|k| (k, k)));
    let mut derived = base.clone();
    derived.set(1000, 1000, true).unwrap();

    let u = union(&base, &derived, &keep_left).unwrap();
    u.check_valid().unwrap();
    assert_eq!(u.len(), 201);
    for k in 0..200 {
        assert_eq!(u.get(&k).unwrap(), Some(k));
    }
    assert_eq!(u.get(&1000).unwrap(), Some(1000));
}
