// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Integration tests for the domain layer's universal invariants
//! (`spec.md` §8): a `TupleBuffer` becomes immutable the moment it is
//! shared, sequence numbers never regress, and `PagedVector` indices
//! never move once assigned.

use std::sync::Arc;

use proptest::prelude::*;

use streaming_engine_domain::entities::paged_vector::PagedVector;
use streaming_engine_domain::entities::segment::{Segment, SegmentOrigin, SegmentRecycler};
use streaming_engine_domain::entities::tuple_buffer::TupleBuffer;
use streaming_engine_domain::value_objects::{ChunkNumber, OriginId, SequenceNumber, Watermark};

struct DiscardRecycler;
impl SegmentRecycler for DiscardRecycler {
    fn recycle(&self, _segment: Segment) {}
}

fn fresh_buffer(capacity: usize) -> TupleBuffer {
    let segment = Segment::new(SegmentOrigin::Global, capacity);
    TupleBuffer::new(segment, Arc::new(DiscardRecycler), OriginId::new(0))
}

#[test]
fn buffer_mutators_fail_once_a_second_handle_exists() {
    let mut buf = fresh_buffer(64);
    assert!(buf.data_mut().is_some(), "sole owner can still write");

    let _second_handle = buf.clone();
    assert!(buf.data_mut().is_none(), "a second handle makes the buffer immutable to its producer too");
    assert!(!buf.set_tuple_count(1), "set_tuple_count must report the failure, not silently no-op");
    assert!(!buf.stamp(OriginId::new(1), SequenceNumber::ZERO, ChunkNumber::FIRST, true, Watermark::new(0)));
}

#[test]
fn dropping_the_extra_handle_restores_unique_ownership() {
    let mut buf = fresh_buffer(64);
    {
        let _second_handle = buf.clone();
        assert!(buf.data_mut().is_none());
    }
    assert!(buf.data_mut().is_some(), "unique ownership returns once the clone is dropped");
}

proptest! {
    #[test]
    fn sequence_numbers_only_ever_increase(steps in 1u64..500) {
        let mut seq = SequenceNumber::ZERO;
        for _ in 0..steps {
            let next = seq.next();
            prop_assert!(next > seq);
            seq = next;
        }
    }

    #[test]
    fn paged_vector_indices_are_stable_across_growth(page_size in 1usize..8, count in 0usize..200) {
        let mut pv: PagedVector<usize> = PagedVector::new(page_size);
        for i in 0..count {
            pv.push(i);
        }
        for i in 0..count {
            prop_assert_eq!(pv.get(i), Some(&i));
        }
        prop_assert_eq!(pv.len(), count);
    }

    #[test]
    fn evicting_a_page_never_changes_the_index_of_a_later_element(page_size in 1usize..6, count in 0usize..100) {
        let mut pv: PagedVector<usize> = PagedVector::new(page_size);
        for i in 0..count {
            pv.push(i);
        }
        if let Some(full) = pv.first_full_page_index() {
            let before = (0..count).map(|i| pv.get(i).copied()).collect::<Vec<_>>();
            pv.evict_page(full);
            for (i, original) in before.iter().enumerate() {
                if i / page_size != full {
                    prop_assert_eq!(pv.get(i).copied(), *original, "only the evicted page's own slots may change");
                }
            }
        }
    }
}
