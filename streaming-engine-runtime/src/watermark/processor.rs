// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Watermark Processor
//!
//! Merges per-origin watermarks into a global watermark used to trigger
//! time-based operators. Each origin owns a [`SequenceQueue`] of
//! `(seq -> event-time)` pairs; the origin's watermark is the event-time at
//! its current contiguous-seq head. The global watermark is the minimum
//! across every registered origin - there is no background thread, calling
//! [`WatermarkProcessor::update`] is the only way to advance it.

use std::collections::HashMap;

use streaming_engine_domain::value_objects::{OriginId, SequenceNumber, Watermark};

use crate::task::SequenceQueue;

struct OriginTracker {
    queue: SequenceQueue<i64>,
    watermark: Watermark,
}

impl OriginTracker {
    fn new() -> Self {
        OriginTracker { queue: SequenceQueue::new(SequenceNumber::ZERO), watermark: Watermark::MIN }
    }
}

/// Tracks one global watermark across a fixed set of registered origins.
pub struct WatermarkProcessor {
    origins: HashMap<OriginId, OriginTracker>,
}

impl WatermarkProcessor {
    pub fn new(origins: impl IntoIterator<Item = OriginId>) -> Self {
        WatermarkProcessor { origins: origins.into_iter().map(|o| (o, OriginTracker::new())).collect() }
    }

    /// Feeds one observation from `origin` and returns the resulting global
    /// watermark. An origin not supplied at construction is registered on
    /// first use, starting from the sentinel.
    pub fn update(&mut self, ts: i64, seq: SequenceNumber, origin: OriginId) -> Watermark {
        let tracker = self.origins.entry(origin).or_insert_with(OriginTracker::new);
        if tracker.queue.insert(seq, ts) {
            for (_, observed_ts) in tracker.queue.drain_ready() {
                tracker.watermark = tracker.watermark.advance(Watermark::new(observed_ts));
            }
        }
        self.global()
    }

    /// The minimum watermark across every registered origin. An origin that
    /// has not yet produced a buffer contributes [`Watermark::MIN`].
    pub fn global(&self) -> Watermark {
        if self.origins.is_empty() {
            return Watermark::MIN;
        }
        Watermark::min_of(self.origins.values().map(|t| t.watermark))
    }

    pub fn origin_watermark(&self, origin: OriginId) -> Watermark {
        self.origins.get(&origin).map(|t| t.watermark).unwrap_or(Watermark::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_is_minimum_across_origins() {
        let mut wp = WatermarkProcessor::new([OriginId::new(1), OriginId::new(2)]);
        assert_eq!(wp.update(100, SequenceNumber(0), OriginId::new(1)), Watermark::MIN, "origin 2 has not produced yet");
        assert_eq!(wp.update(50, SequenceNumber(0), OriginId::new(2)), Watermark::new(50));
    }

    #[test]
    fn out_of_order_seq_does_not_advance_watermark_early() {
        let mut wp = WatermarkProcessor::new([OriginId::new(1)]);
        // seq 1 arrives before seq 0: no contiguous prefix yet.
        assert_eq!(wp.update(500, SequenceNumber(1), OriginId::new(1)), Watermark::MIN);
        assert_eq!(wp.update(100, SequenceNumber(0), OriginId::new(1)), Watermark::new(500));
    }

    #[test]
    fn monotonic_non_decreasing() {
        let mut wp = WatermarkProcessor::new([OriginId::new(1)]);
        let w1 = wp.update(100, SequenceNumber(0), OriginId::new(1));
        let w2 = wp.update(200, SequenceNumber(1), OriginId::new(1));
        assert!(w2 >= w1);
    }
}
