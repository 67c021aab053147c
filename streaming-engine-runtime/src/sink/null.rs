// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Null Sink
//!
//! Discards every buffer. Used for benchmarking the rest of the pipeline
//! without I/O in the way, and in tests that only care about upstream
//! behavior (`SPEC_FULL.md` §4.3a).

use std::sync::atomic::{AtomicU64, Ordering};

use streaming_engine_domain::entities::TupleBuffer;
use streaming_engine_domain::error::EngineResult;
use streaming_engine_domain::ports::{Sink, SinkContext};

#[derive(Default)]
pub struct NullSink {
    received: AtomicU64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received_count(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl Sink for NullSink {
    fn start(&mut self, _ctx: &dyn SinkContext) -> EngineResult<()> {
        Ok(())
    }

    fn execute(&mut self, _buffer: TupleBuffer, _ctx: &dyn SinkContext) -> EngineResult<()> {
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self, _ctx: &dyn SinkContext) -> EngineResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use streaming_engine_domain::entities::{Segment, SegmentOrigin, SegmentRecycler};
    use streaming_engine_domain::value_objects::OriginId;

    struct NoopRecycler;
    impl SegmentRecycler for NoopRecycler {
        fn recycle(&self, _segment: Segment) {}
    }

    struct NoopSinkContext;
    impl SinkContext for NoopSinkContext {
        fn repeat_task(&self, _buffer: TupleBuffer, _delay: Duration) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn counts_and_discards_every_buffer() {
        let ctx = NoopSinkContext;
        let mut sink = NullSink::new();
        sink.start(&ctx).unwrap();
        for _ in 0..5 {
            let segment = Segment::new(SegmentOrigin::Global, 8);
            let buf = TupleBuffer::new(segment, Arc::new(NoopRecycler), OriginId::new(0));
            sink.execute(buf, &ctx).unwrap();
        }
        sink.stop(&ctx).unwrap();
        assert_eq!(sink.received_count(), 5);
    }
}
