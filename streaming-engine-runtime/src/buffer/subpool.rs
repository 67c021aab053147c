// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Fixed / Local Sub-Pools
//!
//! A sub-pool reserves a slice of segments out of the global pool once, at
//! creation, and then recycles within that slice: a segment checked out of
//! a sub-pool is returned to that same sub-pool, never back to the global
//! pool, so steady-state reuse inside one worker never touches the
//! contended global queue. `Fixed` and `Local` sub-pools (`spec.md` §4.1)
//! differ only in the caller's intent - this type models both, the
//! distinction is the [`SegmentOrigin`] tag carried by its segments.

use crossbeam::queue::ArrayQueue;
use streaming_engine_domain::entities::{Segment, SegmentOrigin, SegmentRecycler};
use streaming_engine_domain::error::EngineError;

use crate::buffer::pool::Pool;

/// A worker-reserved slice of the global pool.
pub struct SubPool {
    origin: SegmentOrigin,
    free: ArrayQueue<Segment>,
    reserved: usize,
}

impl SubPool {
    /// Carves `reserved` segments out of `global`, tagging them with
    /// `origin` (`Fixed(id)` or `Local(id)`). Returns
    /// [`EngineError::AllocationExhausted`] if the global pool cannot
    /// supply that many segments right now.
    pub fn carve(global: &Pool, origin: SegmentOrigin, reserved: usize) -> Result<Self, EngineError> {
        let mut taken = Vec::with_capacity(reserved);
        for _ in 0..reserved {
            match global.try_take() {
                Some(segment) => taken.push(segment),
                None => {
                    // Don't leak the segments already taken out of the
                    // global pool on a partial, failed reservation.
                    for segment in taken {
                        global.give_back(segment);
                    }
                    return Err(EngineError::allocation_exhausted("global pool cannot supply sub-pool reservation"));
                }
            }
        }
        let free = ArrayQueue::new(reserved.max(1));
        for mut segment in taken {
            segment.origin = origin;
            // `free`'s capacity is exactly `reserved` and we push at most
            // `reserved` times, so this can never fail.
            let _ = free.push(segment);
        }
        Ok(SubPool { origin, free, reserved })
    }

    pub fn origin(&self) -> SegmentOrigin {
        self.origin
    }

    pub fn reserved(&self) -> usize {
        self.reserved
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn try_take(&self) -> Option<Segment> {
        self.free.pop()
    }
}

impl SegmentRecycler for SubPool {
    fn recycle(&self, segment: Segment) {
        if self.free.push(segment).is_err() {
            panic!("fatal invariant violated: sub-pool at capacity {} received an extra segment back", self.reserved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streaming_engine_domain::value_objects::Alignment;

    #[test]
    fn carve_reduces_global_availability() {
        let global = Pool::new(SegmentOrigin::Global, 8, 64, Alignment::default());
        let sub = SubPool::carve(&global, SegmentOrigin::Local(0), 3).unwrap();
        assert_eq!(global.available(), 5);
        assert_eq!(sub.available(), 3);
    }

    #[test]
    fn recycle_returns_to_self_not_global() {
        let global = Pool::new(SegmentOrigin::Global, 4, 64, Alignment::default());
        let sub = SubPool::carve(&global, SegmentOrigin::Fixed(0), 2).unwrap();
        let segment = sub.try_take().unwrap();
        assert_eq!(global.available(), 2);
        sub.recycle(segment);
        assert_eq!(sub.available(), 2);
        assert_eq!(global.available(), 2, "recycled segment must not leak back to the global pool");
    }

    #[test]
    fn over_reservation_fails_cleanly() {
        let global = Pool::new(SegmentOrigin::Global, 2, 64, Alignment::default());
        assert!(SubPool::carve(&global, SegmentOrigin::Local(0), 3).is_err());
        assert_eq!(global.available(), 2, "failed carve must not leak partially-taken segments");
    }
}
