// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Runtime
//!
//! `spec.md` §4.3: "The source runtime wraps [the source's pull] loop: it
//! pulls a fresh buffer from the buffer manager, calls `fill_buffer`,
//! stamps metadata (origin id, next sequence number, ingestion time), and
//! emits the task."

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex};
use streaming_engine_domain::error::EngineResult;
use streaming_engine_domain::ports::Source;
use streaming_engine_domain::value_objects::{ChunkNumber, OriginId, PipelineId, SequenceNumber, Watermark};

use crate::buffer::BufferManager;
use crate::source::rate_limiter::RateLimiter;
use crate::task::{Task, TaskQueue};

#[derive(Default)]
struct Backpressure {
    paused: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

/// A clone-able handle a downstream sink (or its context) uses to pause and
/// resume a source runtime's pull loop (`spec.md` §4.3: "a backpressure
/// signal from a downstream sink pauses the pull loop").
#[derive(Clone)]
pub struct SourceBackpressure(Arc<Backpressure>);

impl SourceBackpressure {
    fn new() -> Self {
        SourceBackpressure(Arc::new(Backpressure::default()))
    }

    pub fn pause(&self) {
        self.0.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.0.paused.store(false, Ordering::SeqCst);
        let _guard = self.0.lock.lock();
        self.0.condvar.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.0.paused.load(Ordering::SeqCst)
    }

    fn wait_while_paused(&self) {
        if !self.is_paused() {
            return;
        }
        let mut guard = self.0.lock.lock();
        while self.0.paused.load(Ordering::SeqCst) {
            self.0.condvar.wait(&mut guard);
        }
    }
}

fn ingestion_time_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Wraps a domain [`Source`] with buffer allocation, rate control,
/// backpressure, metadata stamping, and task emission.
pub struct SourceRuntime {
    source: Box<dyn Source>,
    buffers: Arc<BufferManager>,
    queue: Arc<TaskQueue>,
    target_pipeline: PipelineId,
    origin: OriginId,
    rate_limiter: RateLimiter,
    backpressure: SourceBackpressure,
    next_sequence: SequenceNumber,
}

impl SourceRuntime {
    pub fn new(
        source: Box<dyn Source>,
        buffers: Arc<BufferManager>,
        queue: Arc<TaskQueue>,
        target_pipeline: PipelineId,
        origin: OriginId,
        rate_limiter: RateLimiter,
    ) -> Self {
        SourceRuntime {
            source,
            buffers,
            queue,
            target_pipeline,
            origin,
            rate_limiter,
            backpressure: SourceBackpressure::new(),
            next_sequence: SequenceNumber::ZERO,
        }
    }

    pub fn backpressure_handle(&self) -> SourceBackpressure {
        self.backpressure.clone()
    }

    /// Runs the pull loop until the source reports end of stream or the
    /// task queue starts draining. Intended to run on its own OS thread;
    /// callers needing an async-friendly source (the TCP source) wrap this
    /// in `tokio::task::spawn_blocking`.
    pub fn run(&mut self) -> EngineResult<()> {
        self.source.open()?;
        loop {
            if self.queue.is_draining() {
                break;
            }
            self.backpressure.wait_while_paused();
            self.rate_limiter.gate();

            let mut buffer = self.buffers.get_buffer_blocking();
            let more = self.source.fill_buffer(&mut buffer)?;

            let seq = self.next_sequence;
            self.next_sequence = seq.next();
            let watermark = Watermark::new(ingestion_time_millis());
            buffer.stamp(self.origin, seq, ChunkNumber::FIRST, true, watermark);

            self.queue.push(Task { buffer, pipeline: self.target_pipeline })?;

            if !more {
                break;
            }
        }
        self.source.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streaming_engine_domain::entities::TupleBuffer;
    use streaming_engine_domain::value_objects::BufferPoolConfig;

    struct CountingSource {
        remaining: usize,
        opened: bool,
        closed: bool,
    }

    impl Source for CountingSource {
        fn open(&mut self) -> EngineResult<()> {
            self.opened = true;
            Ok(())
        }

        fn fill_buffer(&mut self, buffer: &mut TupleBuffer) -> EngineResult<bool> {
            buffer.set_tuple_count(1);
            self.remaining = self.remaining.saturating_sub(1);
            Ok(self.remaining > 0)
        }

        fn close(&mut self) -> EngineResult<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn manager() -> Arc<BufferManager> {
        Arc::new(BufferManager::new(BufferPoolConfig { pool_capacity: 16, ..Default::default() }, OriginId::new(0)).unwrap())
    }

    #[test]
    fn stamps_increasing_sequence_numbers_and_emits_one_task_per_fill() {
        let buffers = manager();
        let queue = TaskQueue::new();
        let source = Box::new(CountingSource { remaining: 3, opened: false, closed: false });
        let mut runtime =
            SourceRuntime::new(source, buffers, queue.clone(), PipelineId::new(1), OriginId::new(7), RateLimiter::unlimited());

        runtime.run().unwrap();

        let mut seqs = Vec::new();
        while let Some(task) = queue.pop_timeout(std::time::Duration::from_millis(50)) {
            assert_eq!(task.buffer.meta().origin, OriginId::new(7));
            seqs.push(task.buffer.meta().sequence_number);
        }
        assert_eq!(seqs, vec![SequenceNumber(0), SequenceNumber(1), SequenceNumber(2)]);
    }

    #[test]
    fn backpressure_pause_blocks_the_pull_loop() {
        let buffers = manager();
        let queue = TaskQueue::new();
        let source = Box::new(CountingSource { remaining: 1, opened: false, closed: false });
        let runtime =
            SourceRuntime::new(source, buffers, queue, PipelineId::new(1), OriginId::new(1), RateLimiter::unlimited());

        let handle = runtime.backpressure_handle();
        handle.pause();
        assert!(handle.is_paused());
        handle.resume();
        assert!(!handle.is_paused());
    }

    #[test]
    fn draining_queue_stops_the_pull_loop_without_error() {
        let buffers = manager();
        let queue = TaskQueue::new();
        queue.begin_drain();
        let source = Box::new(CountingSource { remaining: 5, opened: false, closed: false });
        let mut runtime =
            SourceRuntime::new(source, buffers, queue, PipelineId::new(1), OriginId::new(1), RateLimiter::unlimited());
        runtime.run().unwrap();
    }
}
