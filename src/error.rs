// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the tree core.
//!
//! Every fallible operation on [`crate::Tree`] returns a [`TreeResult`].
//! Errors are fatal to the operation that raised them: nothing is retried
//! internally and the tree's state is left unmodified except where noted
//! on the individual variant below.

use std::fmt;

/// Standard `Result` type for all tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Error conditions a tree operation can raise.
///
/// ## Rollback guarantees
/// - `BadKey`, `ComparatorMismatch`, `BranchingMismatch`, `Unsorted` are
///   always raised before any write takes place; the tree (or trees) are
///   left exactly as they were.
/// - `IllegalMutation` can no longer actually be raised by this crate: the
///   callback passed to [`crate::range::edit_range`] only ever receives
///   shared references, so there is no way for it to reach back into the
///   tree it is scanning and invalidate the scan. The variant is kept so
///   that a language-binding wrapper with a looser callback contract has
///   somewhere to report the condition spec.md describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The comparator returned a non-finite ordering (a NaN-equivalent key
    /// was compared).
    BadKey,
    /// Set-algebra or diff invoked on two trees whose comparators are not
    /// the same reference.
    ComparatorMismatch,
    /// A tree-building set operation (`union`, `intersect`-build,
    /// `subtract`) was invoked on trees with different `max_node_size`.
    BranchingMismatch { left: usize, right: usize },
    /// `bulk_load` was given entries that are not strictly ascending by
    /// key.
    Unsorted { at_index: usize },
    /// A range-edit callback mutated or cloned the tree mid-scan. See the
    /// type-level note above: this crate's API makes the condition
    /// unreachable, so the variant is never constructed internally.
    IllegalMutation,
    /// `check_valid` found a structural invariant violation.
    InvariantViolation { reason: String },
    /// A mutator was invoked on a tree frozen by an out-of-scope wrapper.
    /// Never constructed by this crate.
    Frozen,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::BadKey => write!(f, "comparator returned a non-finite ordering (NaN-like key)"),
            TreeError::ComparatorMismatch => {
                write!(f, "operation requires both trees to share the same comparator")
            }
            TreeError::BranchingMismatch { left, right } => write!(
                f,
                "trees have different max_node_size ({left} vs {right}) and cannot be combined structurally"
            ),
            TreeError::Unsorted { at_index } => {
                write!(f, "bulk_load entries are not strictly ascending at index {at_index}")
            }
            TreeError::IllegalMutation => {
                write!(f, "tree was mutated while a range edit was in progress")
            }
            TreeError::InvariantViolation { reason } => write!(f, "invariant violation: {reason}"),
            TreeError::Frozen => write!(f, "mutator invoked on a frozen tree"),
        }
    }
}

impl std::error::Error for TreeError {}
