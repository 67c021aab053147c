// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Join Handler
//!
//! The windowed stream join's operator handler (`spec.md` §4.6): owns the
//! interval list, accumulates raw build-side tuples per interval per
//! worker, and drives the `LeftFilled -> ReadyProbe -> EmittedToProbe`
//! lifecycle from watermark advances, plus the two-pass graceful
//! termination protocol.

use std::collections::HashMap;
use std::sync::Arc;

use streaming_engine_domain::entities::{Interval, IntervalId, IntervalState, JoinSide};
use streaming_engine_domain::value_objects::OriginId;

use crate::join::memory_controller::{MemoryController, SpillKey};

/// Per-pipeline mutable state for one join operator instance. Registered in
/// a `HandlerTable` and looked up by `HandlerIndex`; build-side inserts from
/// different workers only contend on the `intervals` map itself (per-worker
/// paged vectors inside an interval never do, per [`crate::join::strategy::JoinStrategy`]).
pub struct JoinHandler {
    window_size: i64,
    page_size: usize,
    intervals: HashMap<i64, Interval>,
    next_interval_id: u64,
    memory: Option<(Arc<MemoryController>, u64, OriginId)>,
}

impl JoinHandler {
    pub fn new(window_size: i64, page_size: usize) -> Self {
        assert!(window_size > 0, "join window size must be positive");
        JoinHandler { window_size, page_size, intervals: HashMap::new(), next_interval_id: 0, memory: None }
    }

    /// Wires a shared memory controller into the build path (`spec.md`
    /// §4.6a). `query`/`origin` identify this operator's spill files.
    pub fn with_memory_controller(mut self, memory: Arc<MemoryController>, query: u64, origin: OriginId) -> Self {
        self.memory = Some((memory, query, origin));
        self
    }

    fn bounds(&self, ts: i64) -> (i64, i64) {
        let start = ts.div_euclid(self.window_size) * self.window_size;
        (start, start + self.window_size)
    }

    /// Locates (creating if needed) the interval covering `ts` and appends
    /// `tuple` to its `(worker, side)` paged vector. Returns the interval's
    /// id so the caller can correlate the append with a probe descriptor
    /// later. If a memory controller is attached and the budget is over
    /// after this insert, the oldest full page for this build side is
    /// spilled to disk and evicted from memory.
    pub fn build(&mut self, worker: u32, side: JoinSide, ts: i64, tuple: Vec<u8>) -> IntervalId {
        let (start, end) = self.bounds(ts);
        let next_id = &mut self.next_interval_id;
        let interval = self.intervals.entry(start).or_insert_with(|| {
            let id = IntervalId(*next_id);
            *next_id += 1;
            Interval::new(id, start, end)
        });
        let interval_id = interval.id;
        let tuple_len = tuple.len();
        let pv = interval.build_side_mut(worker, side, self.page_size);
        pv.push(tuple);

        if let Some((memory, query, origin)) = &self.memory {
            memory.account(tuple_len);
            if memory.over_budget(0) {
                if let Some(page_index) = pv.first_full_page_index() {
                    let bytes: Vec<u8> = pv.page(page_index).iter().flatten().copied().collect();
                    let key = SpillKey { query: *query, origin: *origin, side, slice_end: end, worker };
                    if memory.spill_page(key, &bytes).is_ok() {
                        let freed: usize = pv.evict_page(page_index).iter().map(Vec::len).sum();
                        memory.release(freed);
                    } else {
                        tracing::warn!(interval = interval_id.0, worker, ?side, "failed to spill build-side page, keeping it resident");
                    }
                }
            }
        }

        interval_id
    }

    /// Advances every `LeftFilled` interval whose `end <= watermark`: to
    /// `Tombstone` if either build side never received a tuple, else to
    /// `ReadyProbe`. Returns the ids that became ready to probe, in no
    /// particular order - callers typically probe each independently.
    pub fn mark_ready(&mut self, watermark: i64) -> Vec<IntervalId> {
        let mut ready = Vec::new();
        for interval in self.intervals.values_mut() {
            if interval.state == IntervalState::LeftFilled && interval.end <= watermark {
                if interval.is_side_empty(JoinSide::Left) || interval.is_side_empty(JoinSide::Right) {
                    interval.state = IntervalState::Tombstone;
                } else {
                    interval.state = IntervalState::ReadyProbe;
                    ready.push(interval.id);
                }
            }
        }
        ready
    }

    pub fn interval(&self, id: IntervalId) -> Option<&Interval> {
        self.intervals.values().find(|i| i.id == id)
    }

    pub fn mark_emitted(&mut self, id: IntervalId) {
        if let Some(interval) = self.intervals.values_mut().find(|i| i.id == id) {
            interval.state = IntervalState::EmittedToProbe;
        }
    }

    /// Drops every interval in a terminal state (`EmittedToProbe` or
    /// `Tombstone`), freeing its paged vectors.
    pub fn retire_finished(&mut self) {
        self.intervals.retain(|_, i| !matches!(i.state, IntervalState::EmittedToProbe | IntervalState::Tombstone));
    }

    /// Graceful-stop two-pass drain (`spec.md` §4.6 "Termination"): first
    /// call moves every still-building interval to
    /// `OnceSeenDuringTermination`, giving in-flight builds on the other
    /// side one more task-queue cycle to land; the second call promotes
    /// those to `ReadyProbe` and returns their ids for a final probe pass.
    pub fn termination_pass(&mut self) -> Vec<IntervalId> {
        let mut ready = Vec::new();
        for interval in self.intervals.values_mut() {
            match interval.state {
                IntervalState::LeftFilled => interval.state = IntervalState::OnceSeenDuringTermination,
                IntervalState::OnceSeenDuringTermination => {
                    interval.state = IntervalState::ReadyProbe;
                    ready.push(interval.id);
                }
                _ => {}
            }
        }
        ready
    }

    pub fn open_interval_count(&self) -> usize {
        self.intervals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_3_inner_join_single_window() {
        // spec.md §8 scenario 3: left (id=4, ts=500), right (id=4, ts=600),
        // right (id=4, ts=1500). Predicate left.id == right.id evaluated at
        // probe time, outside this handler - here we only check interval
        // bucketing and readiness.
        let mut handler = JoinHandler::new(1000, 8);
        let left_id = handler.build(0, JoinSide::Left, 500, b"l4".to_vec());
        let right_id = handler.build(0, JoinSide::Right, 600, b"r4".to_vec());
        assert_eq!(left_id, right_id, "both land in the same [0,1000) interval");
        let other_id = handler.build(0, JoinSide::Right, 1500, b"r4-late".to_vec());
        assert_ne!(other_id, left_id, "ts=1500 belongs to the next window");

        let ready = handler.mark_ready(1000);
        assert_eq!(ready, vec![left_id]);
        let interval = handler.interval(left_id).unwrap();
        assert_eq!(interval.iter_side(JoinSide::Left).count(), 1);
        assert_eq!(interval.iter_side(JoinSide::Right).count(), 1);
    }

    #[test]
    fn interval_with_empty_side_becomes_tombstone_not_ready() {
        let mut handler = JoinHandler::new(1000, 8);
        handler.build(0, JoinSide::Left, 100, b"l".to_vec());
        let ready = handler.mark_ready(1000);
        assert!(ready.is_empty(), "right side never received a tuple");
        assert_eq!(handler.open_interval_count(), 1);
        handler.retire_finished();
        assert_eq!(handler.open_interval_count(), 0);
    }

    #[test]
    fn termination_pass_requires_two_calls_before_ready() {
        let mut handler = JoinHandler::new(1000, 8);
        handler.build(0, JoinSide::Left, 100, b"l".to_vec());
        handler.build(0, JoinSide::Right, 200, b"r".to_vec());
        assert!(handler.termination_pass().is_empty(), "first pass only observes, does not ready");
        let ready = handler.termination_pass();
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn over_budget_build_spills_the_oldest_full_page() {
        let dir = std::env::temp_dir().join(format!("streaming-engine-join-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let memory = Arc::new(MemoryController::new(&dir, 4, 4));
        let mut handler = JoinHandler::new(1000, 2).with_memory_controller(memory.clone(), 1, OriginId::new(9));

        handler.build(0, JoinSide::Left, 100, vec![1, 2]);
        handler.build(0, JoinSide::Left, 200, vec![3, 4]);
        handler.build(0, JoinSide::Left, 300, vec![5, 6]);

        let interval = handler.interval(IntervalId(0)).unwrap();
        assert_eq!(interval.iter_side(JoinSide::Left).count(), 1, "the full first page was evicted, only the half-open second page remains in memory");

        let key = SpillKey { query: 1, origin: OriginId::new(9), side: JoinSide::Left, slice_end: 1000, worker: 0 };
        let spilled = memory.read_spilled(&key).unwrap();
        assert_eq!(spilled, vec![1, 2, 3, 4]);

        memory.delete(&key).unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }
}
