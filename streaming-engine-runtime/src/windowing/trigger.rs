// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Aggregation Trigger
//!
//! Folds finalized slices into the windows they belong to and reports a
//! window ready exactly once every one of its constituent slices has
//! landed (`spec.md` §4.5's trigger action). Sliding windows fold more than
//! one slice per window; tumbling windows fold exactly one.

use std::collections::HashMap;

use streaming_engine_domain::entities::Slice;

use crate::windowing::window::WindowSpec;

/// One finalized window's partial-aggregate cells, ready to be materialized
/// into output tuples by the caller.
pub struct WindowResult<P> {
    pub start: i64,
    pub end: i64,
    pub cells: HashMap<u64, P>,
}

struct Accumulator<P> {
    end: i64,
    remaining: usize,
    cells: HashMap<u64, P>,
}

/// Combines consecutive slices into complete windows as they become
/// available. One instance per operator; slices are fed in ascending
/// `start` order (the order [`crate::windowing::SliceStore::take_ready_slices`]
/// returns them in).
pub struct WindowTrigger<P> {
    window: WindowSpec,
    pending: HashMap<i64, Accumulator<P>>,
}

impl<P: Default + Clone> WindowTrigger<P> {
    pub fn new(window: WindowSpec) -> Self {
        WindowTrigger { window, pending: HashMap::new() }
    }

    /// Folds `slice` into every window it contributes to via `merge`.
    /// Returns the starts of windows that just received their last
    /// constituent slice, in ascending order - callers should immediately
    /// call [`Self::take_window`] for each and emit.
    pub fn absorb(&mut self, slice: &Slice<P>, merge: impl Fn(&mut P, &P)) -> Vec<i64> {
        let needed = self.window.slices_per_window();
        let mut ready = Vec::new();
        for window_start in self.window.windows_for_slice(slice.start) {
            let window_end = window_start + self.window.size;
            let acc = self
                .pending
                .entry(window_start)
                .or_insert_with(|| Accumulator { end: window_end, remaining: needed, cells: HashMap::new() });
            for (key, value) in slice.cells() {
                let cell = acc.cells.entry(*key).or_insert_with(P::default);
                merge(cell, value);
            }
            acc.remaining -= 1;
            if acc.remaining == 0 {
                ready.push(window_start);
            }
        }
        ready.sort_unstable();
        ready
    }

    /// Removes and returns a finished window's accumulated cells. Panics if
    /// `window_start` was not reported ready by [`Self::absorb`] - that
    /// would indicate a caller bug, not a recoverable condition.
    pub fn take_window(&mut self, window_start: i64) -> WindowResult<P> {
        let acc = self.pending.remove(&window_start).expect("take_window called on a window that was never finished");
        WindowResult { start: window_start, end: acc.end, cells: acc.cells }
    }

    pub fn pending_window_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streaming_engine_domain::entities::UNKEYED;

    fn slice(start: i64, end: i64, values: &[(u64, i64)]) -> Slice<i64> {
        let mut s = Slice::new(start, end);
        for (k, v) in values {
            *s.cell_mut(*k, || 0) = *v;
        }
        s
    }

    fn sum(a: &mut i64, b: &i64) {
        *a += b;
    }

    #[test]
    fn tumbling_window_finishes_after_one_slice() {
        let mut trigger: WindowTrigger<i64> = WindowTrigger::new(WindowSpec::tumbling(1000));
        let s = slice(0, 1000, &[(UNKEYED, 2)]);
        let ready = trigger.absorb(&s, sum);
        assert_eq!(ready, vec![0]);
        let result = trigger.take_window(0);
        assert_eq!(result.end, 1000);
        assert_eq!(result.cells[&UNKEYED], 2);
    }

    #[test]
    fn sliding_window_scenario_2() {
        let mut trigger: WindowTrigger<i64> = WindowTrigger::new(WindowSpec::sliding(1000, 500));
        // id=1 ts100 v10 and ts400(not used) -> slice[0,500) cell1=10
        let slice0 = slice(0, 500, &[(1, 10)]);
        // ts600 v20, ts700 id2 v5 -> slice[500,1000)
        let slice500 = slice(500, 1000, &[(1, 20), (2, 5)]);
        // ts1100 id1 v30 -> slice[1000,1500)
        let slice1000 = slice(1000, 1500, &[(1, 30)]);

        let r0 = trigger.absorb(&slice0, sum);
        assert!(r0.is_empty(), "window [0,1000) needs both slice 0 and 500");

        let r500 = trigger.absorb(&slice500, sum);
        assert_eq!(r500, vec![0]);
        let w0 = trigger.take_window(0);
        assert_eq!(w0.cells[&1], 30);
        assert_eq!(w0.cells[&2], 5);

        let r1000 = trigger.absorb(&slice1000, sum);
        assert_eq!(r1000, vec![500]);
        let w500 = trigger.take_window(500);
        assert_eq!(w500.cells[&1], 50);
        assert_eq!(w500.cells[&2], 5);
        assert_eq!(trigger.pending_window_count(), 1, "window [1000,2000) still waits on slice [1500,2000)");
    }
}
