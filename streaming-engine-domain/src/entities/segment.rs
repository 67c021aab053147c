// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Memory Segment
//!
//! Raw payload plus the identity the buffer manager needs to return a
//! segment to the pool it came from. A `Segment` is deliberately not
//! `Clone`: ownership of the backing bytes is unique by construction, so
//! "a segment is either exclusively owned by one `TupleBuffer` handle or
//! sits in exactly one free list" is a property the type system enforces
//! rather than one a runtime check has to verify.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(u64);

impl SegmentId {
    pub fn fresh() -> Self {
        Self(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Which pool a segment must be returned to on recycle. Global-pool
/// segments are also eligible for sub-pool carve-out; unpooled segments
/// are oversize allocations tracked by size class instead of a pool id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentOrigin {
    Global,
    Fixed(u32),
    Local(u32),
    Unpooled,
}

/// A fixed-size (or, for the unpooled path, oversize) byte region.
pub struct Segment {
    pub id: SegmentId,
    pub origin: SegmentOrigin,
    data: Box<[u8]>,
}

impl Segment {
    pub fn new(origin: SegmentOrigin, capacity: usize) -> Self {
        Self { id: SegmentId::fresh(), origin, data: vec![0u8; capacity].into_boxed_slice() }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("capacity", &self.data.len())
            .finish()
    }
}

/// Implemented by whatever pool issued a segment; invoked exactly once, when
/// the last `TupleBuffer` handle referencing the segment is dropped.
pub trait SegmentRecycler: Send + Sync {
    fn recycle(&self, segment: Segment);
}
