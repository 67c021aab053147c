// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Join Strategy
//!
//! The five build/probe variants named in `spec.md` §9's design note,
//! modeled as a tagged enum with a common probe contract rather than a
//! class hierarchy. The variants differ only in *concurrency discipline*
//! of the build side (per `spec.md` §4.6): `Nlj` and the `Hash*` variants
//! all probe by evaluating the same predicate over both build sides once
//! an interval is `ReadyProbe`.

use crate::join::hash::{GlobalLockTable, LocalTable, ShardedLockTable};

/// Dispatch tag selected at pipeline compile time. `Nlj` always scans
/// `left x right`; the `Hash*` variants differ only in how the build side
/// is organized and synchronized - `GlobalLock` behind one mutex,
/// `GlobalLockFree` as a lock-free concurrent map, `Local` partitioned per
/// worker (cheapest build, probe must fan out across partitions),
/// `VarSized` like `Local` but tolerating variable-length keys/payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    Nlj,
    HashGlobalLock,
    HashGlobalLockFree,
    HashLocal,
    HashVarSized,
}

impl JoinStrategy {
    /// Whether build-side inserts for this variant require no cross-worker
    /// synchronization (true for the per-worker-partitioned variants).
    pub fn build_is_lock_free(self) -> bool {
        matches!(self, JoinStrategy::Nlj | JoinStrategy::HashGlobalLockFree | JoinStrategy::HashLocal | JoinStrategy::HashVarSized)
    }
}

/// One worker's build-side hash table for a `Hash*` strategy, keyed by a
/// fixed-width `u64` join key. `Nlj` has no table - its build side is the
/// interval's raw `PagedVector`s, scanned directly by
/// [`nested_loop_probe`]. `HashVarSized` is intentionally excluded here;
/// it keys by raw bytes instead, see [`crate::join::hash::VarSizedLocalTable`].
pub enum HashBuildSide {
    GlobalLock(GlobalLockTable),
    GlobalLockFree(ShardedLockTable),
    Local(LocalTable),
}

impl HashBuildSide {
    pub fn new(strategy: JoinStrategy) -> Option<Self> {
        match strategy {
            JoinStrategy::HashGlobalLock => Some(HashBuildSide::GlobalLock(GlobalLockTable::new())),
            JoinStrategy::HashGlobalLockFree => Some(HashBuildSide::GlobalLockFree(ShardedLockTable::new())),
            JoinStrategy::HashLocal => Some(HashBuildSide::Local(LocalTable::new())),
            JoinStrategy::Nlj | JoinStrategy::HashVarSized => None,
        }
    }

    pub fn insert(&mut self, key: u64, tuple: Vec<u8>) {
        match self {
            HashBuildSide::GlobalLock(t) => t.insert(key, tuple),
            HashBuildSide::GlobalLockFree(t) => t.insert(key, tuple),
            HashBuildSide::Local(t) => t.insert(key, tuple),
        }
    }

    pub fn probe(&self, key: u64, visit: impl FnMut(&[u8])) {
        match self {
            HashBuildSide::GlobalLock(t) => t.probe(key, visit),
            HashBuildSide::GlobalLockFree(t) => t.probe(key, visit),
            HashBuildSide::Local(t) => t.probe(key, visit),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HashBuildSide::GlobalLock(t) => t.len(),
            HashBuildSide::GlobalLockFree(t) => t.len(),
            HashBuildSide::Local(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Probes a build-side hash table with every right-side tuple's key,
/// re-checking the full predicate on each bucket hit - the bucket narrows
/// candidates, it does not replace the predicate (keys can collide with
/// tuples the predicate rejects for other reasons).
pub fn hash_probe<'a>(
    build: &HashBuildSide,
    right: impl Iterator<Item = (&'a u64, &'a [u8])>,
    pred: impl Fn(&[u8], &[u8]) -> bool,
    mut emit: impl FnMut(&[u8], &[u8]),
) {
    for (key, r) in right {
        build.probe(*key, |l| {
            if pred(l, r) {
                emit(l, r);
            }
        });
    }
}

/// Scans `left x right` evaluating `pred` on raw tuple byte slices, the
/// contract every strategy variant reduces to at probe time - nested-loop
/// literally, hash variants after a bucket lookup narrows the candidate
/// set. Kept as a free function (rather than a method per variant) because
/// every variant in this engine shares one predicate-evaluation core; only
/// the build-side bucketing differs, and that lives in [`crate::join::handler`].
pub fn nested_loop_probe<'a>(
    left: impl Iterator<Item = &'a [u8]> + Clone,
    right: impl Iterator<Item = &'a [u8]>,
    pred: impl Fn(&[u8], &[u8]) -> bool,
    mut emit: impl FnMut(&[u8], &[u8]),
) {
    for r in right {
        for l in left.clone() {
            if pred(l, r) {
                emit(l, r);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_build_side_dispatches_by_strategy() {
        assert!(matches!(HashBuildSide::new(JoinStrategy::HashGlobalLock), Some(HashBuildSide::GlobalLock(_))));
        assert!(matches!(HashBuildSide::new(JoinStrategy::HashGlobalLockFree), Some(HashBuildSide::GlobalLockFree(_))));
        assert!(matches!(HashBuildSide::new(JoinStrategy::HashLocal), Some(HashBuildSide::Local(_))));
        assert!(HashBuildSide::new(JoinStrategy::Nlj).is_none(), "Nlj has no hash table, it scans PagedVectors directly");
        assert!(HashBuildSide::new(JoinStrategy::HashVarSized).is_none(), "HashVarSized keys by raw bytes, see VarSizedLocalTable");
    }

    #[test]
    fn hash_probe_only_checks_predicate_within_matching_buckets() {
        let mut build = HashBuildSide::new(JoinStrategy::HashGlobalLock).unwrap();
        build.insert(1, b"l1a".to_vec());
        build.insert(1, b"l1b".to_vec());
        build.insert(2, b"l2".to_vec());
        assert_eq!(build.len(), 3);

        let right_keys = [1u64, 2, 3];
        let right_tuples: Vec<&[u8]> = vec![b"r1", b"r2", b"r3"];
        let right: Vec<(&u64, &[u8])> = right_keys.iter().zip(right_tuples.into_iter()).collect();

        let mut matches = Vec::new();
        hash_probe(&build, right.into_iter(), |_, _| true, |l, r| matches.push((l.to_vec(), r.to_vec())));
        assert_eq!(matches.len(), 3, "key=1 bucket contributes two matches, key=2 one, key=3 misses entirely");
    }

    #[test]
    fn nested_loop_emits_every_matching_pair() {
        let left: Vec<Vec<u8>> = vec![vec![1], vec![2]];
        let right: Vec<Vec<u8>> = vec![vec![1], vec![1], vec![3]];
        let mut matches = 0;
        nested_loop_probe(
            left.iter().map(|v| v.as_slice()),
            right.iter().map(|v| v.as_slice()),
            |l, r| l == r,
            |_, _| matches += 1,
        );
        assert_eq!(matches, 2, "left=1 matches both right=1 entries");
    }
}
