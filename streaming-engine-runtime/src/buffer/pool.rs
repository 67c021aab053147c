// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Global Pool
//!
//! A bounded array of uniformly-sized segments, with the available subset
//! tracked by a lock-free MPMC queue (`crossbeam::queue::ArrayQueue`). This
//! is the backing store both the global pool and every fixed/local
//! sub-pool carve their reserved slice from.
//!
//! ## Refcount transition
//!
//! The spec requires that popping a segment atomically bump its control
//! block's refcount from 0 to 1, and that a failed transition is fatal.
//! Here that transition is enforced by the type system rather than a
//! runtime CAS: a [`Segment`](streaming_engine_domain::entities::Segment)
//! is a plain, non-`Clone` value, so it exists in exactly one place at a
//! time - either sitting in this queue (refcount conceptually 0) or moved
//! into a fresh `Arc` inside a `TupleBuffer` (refcount 1, by construction
//! of `Arc::new`). There is no code path that can observe a segment in
//! both places at once, so the "transition fails" branch the spec
//! describes is unreachable rather than merely unlikely.

use crossbeam::queue::ArrayQueue;
use streaming_engine_domain::entities::{Segment, SegmentOrigin};
use streaming_engine_domain::value_objects::Alignment;

/// A bounded array of same-size segments plus the free list of currently
/// available ones.
pub struct Pool {
    origin: SegmentOrigin,
    segment_size: usize,
    alignment: Alignment,
    capacity: usize,
    free: ArrayQueue<Segment>,
}

impl Pool {
    /// Allocates `capacity` segments of `segment_size` bytes (rounded up to
    /// `alignment`) up front and seeds the free list with all of them.
    pub fn new(origin: SegmentOrigin, capacity: usize, segment_size: usize, alignment: Alignment) -> Self {
        let aligned_size = alignment.align_up(segment_size);
        let free = ArrayQueue::new(capacity);
        for _ in 0..capacity {
            // Capacity was just reserved above; push can only fail if the
            // queue is full, which cannot happen while filling it for the
            // first time.
            let _ = free.push(Segment::new(origin, aligned_size));
        }
        Pool { origin, segment_size: aligned_size, alignment, capacity, free }
    }

    pub fn origin(&self) -> SegmentOrigin {
        self.origin
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of segments presently sitting in the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of segments presently checked out (in flight).
    pub fn in_flight(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Non-blocking pop. `None` means the pool is exhausted.
    pub fn try_take(&self) -> Option<Segment> {
        self.free.pop()
    }

    /// Returns a segment to this pool's free list. Panics (a fatal
    /// invariant, per `spec.md` §7) if the pool is already at capacity,
    /// since that can only happen if a segment not originally drawn from
    /// this pool was recycled into it.
    pub fn give_back(&self, segment: Segment) {
        if self.free.push(segment).is_err() {
            panic!("fatal invariant violated: pool at capacity {} received an extra segment back", self.capacity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_full_capacity() {
        let pool = Pool::new(SegmentOrigin::Global, 4, 64, Alignment::default());
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn take_and_give_back_conserves_total() {
        let pool = Pool::new(SegmentOrigin::Global, 4, 64, Alignment::default());
        let a = pool.try_take().unwrap();
        let b = pool.try_take().unwrap();
        assert_eq!(pool.available() + pool.in_flight(), 4);
        pool.give_back(a);
        pool.give_back(b);
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let pool = Pool::new(SegmentOrigin::Global, 1, 64, Alignment::default());
        let seg = pool.try_take().unwrap();
        assert!(pool.try_take().is_none());
        pool.give_back(seg);
        assert!(pool.try_take().is_some());
    }

    #[test]
    fn segment_size_respects_alignment() {
        let pool = Pool::new(SegmentOrigin::Global, 1, 100, Alignment::new(64).unwrap());
        assert_eq!(pool.segment_size(), 128);
    }
}
