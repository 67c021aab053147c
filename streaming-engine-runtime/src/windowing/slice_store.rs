// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Slice Store
//!
//! Per-worker store of slice descriptors ordered by start (`spec.md`
//! §4.5). Records are lifted into the covering slice's cell; once the
//! watermark passes a slice's end it becomes eligible for the aggregation
//! trigger to finalize.

use streaming_engine_domain::entities::{Slice, SliceState};

/// Owns every open slice for one operator instance, ordered by `start`.
pub struct SliceStore<P> {
    slice_size: i64,
    slices: Vec<Slice<P>>,
    last_watermark: i64,
}

impl<P: Default> SliceStore<P> {
    pub fn new(slice_size: i64) -> Self {
        assert!(slice_size > 0, "slice size must be positive");
        SliceStore { slice_size, slices: Vec::new(), last_watermark: 0 }
    }

    fn slice_start_for(&self, ts: i64) -> i64 {
        ts.div_euclid(self.slice_size) * self.slice_size
    }

    /// Lifts one record into its covering slice's cell for `key`, creating
    /// the slice and/or cell on first touch. Records with `ts` before the
    /// last-observed watermark are silently dropped - allowed lateness is
    /// not supported (`spec.md` §4.5).
    pub fn record(&mut self, ts: i64, key: u64, lift: impl FnOnce(&mut P)) -> bool {
        if ts < self.last_watermark {
            return false;
        }
        let start = self.slice_start_for(ts);
        let end = start + self.slice_size;
        let idx = match self.slices.binary_search_by_key(&start, |s| s.start) {
            Ok(i) => i,
            Err(i) => {
                self.slices.insert(i, Slice::new(start, end));
                i
            }
        };
        let cell = self.slices[idx].cell_mut(key, P::default);
        lift(cell);
        true
    }

    /// Advances the watermark this store has observed. Never moves
    /// backward.
    pub fn advance_watermark(&mut self, watermark: i64) {
        self.last_watermark = self.last_watermark.max(watermark);
    }

    pub fn watermark(&self) -> i64 {
        self.last_watermark
    }

    /// Removes and returns every slice whose `end <= last_watermark`, in
    /// ascending `start` order, marking each `Emitted` first.
    pub fn take_ready_slices(&mut self) -> Vec<Slice<P>> {
        let watermark = self.last_watermark;
        let cut = self.slices.partition_point(|s| s.end <= watermark);
        self.slices.drain(0..cut).map(|mut s| {
            s.mark_emitted();
            s
        }).collect()
    }

    pub fn open_slice_count(&self) -> usize {
        self.slices.iter().filter(|s| s.state != SliceState::Emitted).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_land_in_covering_slice() {
        let mut store: SliceStore<i64> = SliceStore::new(1000);
        store.record(100, 0, |c| *c += 1);
        store.record(400, 0, |c| *c += 1);
        store.record(1100, 0, |c| *c += 1);
        store.advance_watermark(2000);
        let ready = store.take_ready_slices();
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].start, 0);
        assert_eq!(*ready[0].cells().next().unwrap().1, 2);
        assert_eq!(ready[1].start, 1000);
        assert_eq!(*ready[1].cells().next().unwrap().1, 1);
    }

    #[test]
    fn late_record_is_dropped() {
        let mut store: SliceStore<i64> = SliceStore::new(1000);
        store.advance_watermark(5000);
        assert!(!store.record(100, 0, |c| *c += 1));
        assert_eq!(store.open_slice_count(), 0);
    }

    #[test]
    fn only_slices_fully_below_watermark_are_ready() {
        let mut store: SliceStore<i64> = SliceStore::new(1000);
        store.record(100, 0, |c| *c += 1);
        store.record(1100, 0, |c| *c += 1);
        store.advance_watermark(1000);
        let ready = store.take_ready_slices();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].start, 0);
        assert_eq!(store.open_slice_count(), 1);
    }
}
