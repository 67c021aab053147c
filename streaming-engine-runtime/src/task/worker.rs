// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Pool
//!
//! A fixed pool of OS threads (`spec.md` §4.2, §5 - "fixed pool of OS
//! threads", CPU-bound execution, not `tokio` tasks). Each thread owns a
//! [`WorkerContextImpl`] and repeatedly pops a task from the shared
//! [`TaskQueue`], looks its pipeline up in the [`PipelineRegistry`], and
//! runs `Pipeline::execute` synchronously against it.

use std::sync::Arc;
use std::time::Duration;

use streaming_engine_domain::error::EngineError;
use streaming_engine_domain::ports::WorkerContext;

use crate::pipeline::PipelineRegistry;
use crate::task::queue::TaskQueue;

/// Per-thread state a worker carries across every task it executes.
pub struct WorkerContextImpl {
    worker_id: u32,
    scratch: Vec<u8>,
}

impl WorkerContextImpl {
    pub fn new(worker_id: u32) -> Self {
        WorkerContextImpl { worker_id, scratch: Vec::new() }
    }
}

impl WorkerContext for WorkerContextImpl {
    fn worker_id(&self) -> u32 {
        self.worker_id
    }

    fn scratch_mut(&mut self) -> &mut Vec<u8> {
        &mut self.scratch
    }
}

/// Owns the worker threads for one engine instance. Dropping the pool
/// (after [`Self::join`]) is the only way its threads stop.
pub struct WorkerPool {
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `num_workers` threads, each draining `queue` against
    /// `registry` until the queue is closed (all senders dropped) or
    /// `pop_timeout` repeatedly times out after draining begins and the
    /// queue has emptied.
    pub fn start(num_workers: usize, queue: Arc<TaskQueue>, registry: Arc<PipelineRegistry>) -> Self {
        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers as u32 {
            let queue = queue.clone();
            let registry = registry.clone();
            let handle = std::thread::Builder::new()
                .name(format!("engine-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, queue, registry))
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
        WorkerPool { handles }
    }

    /// Blocks until every worker thread has exited. Callers typically call
    /// this after `TaskQueue::begin_drain` and the queue has emptied.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop(worker_id: u32, queue: Arc<TaskQueue>, registry: Arc<PipelineRegistry>) {
    let mut worker_ctx = WorkerContextImpl::new(worker_id);
    loop {
        let task = if queue.is_draining() {
            // Draining: keep pulling whatever is already queued, but don't
            // block forever once it empties - the pool is shutting down.
            match queue.pop_timeout(Duration::from_millis(20)) {
                Some(task) => task,
                None => return,
            }
        } else {
            match queue.pop_blocking() {
                Some(task) => task,
                None => return, // all senders dropped: queue is gone.
            }
        };

        let Some((pipeline, context)) = registry.get(task.pipeline) else {
            tracing::warn!(target: "worker", worker_id, pipeline = %task.pipeline, "task referenced an unregistered pipeline, dropping");
            continue;
        };

        match pipeline.execute(context.as_ref(), &mut worker_ctx, task.buffer) {
            Ok(()) => {}
            Err(EngineError::EndOfStream(reason)) => {
                tracing::debug!(target: "worker", worker_id, pipeline = %task.pipeline, reason, "end of stream");
            }
            Err(err) if err.is_recoverable() => {
                tracing::debug!(target: "worker", worker_id, pipeline = %task.pipeline, error = %err, "recoverable error, dropping task");
            }
            Err(EngineError::FatalInvariant(msg)) => {
                tracing::error!(target: "worker", worker_id, pipeline = %task.pipeline, %msg, "fatal invariant violated, aborting");
                std::process::abort();
            }
            Err(err) => {
                tracing::error!(target: "worker", worker_id, pipeline = %task.pipeline, error = %err, "pipeline execute failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferManager;
    use crate::pipeline::PipelineContextImpl;
    use crate::task::queue::Task;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use streaming_engine_domain::entities::{HandlerTable, TupleBuffer};
    use streaming_engine_domain::error::EngineResult;
    use streaming_engine_domain::ports::{Pipeline, PipelineContext};
    use streaming_engine_domain::value_objects::{BufferPoolConfig, OriginId, PipelineId};

    struct CountingPipeline(Arc<AtomicUsize>);
    impl Pipeline for CountingPipeline {
        fn setup(&self, _ctx: &dyn PipelineContext) -> EngineResult<()> {
            Ok(())
        }
        fn execute(&self, _ctx: &dyn PipelineContext, worker: &mut dyn WorkerContext, _buffer: TupleBuffer) -> EngineResult<()> {
            assert!(worker.worker_id() < 4);
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn terminate(&self, _ctx: &dyn PipelineContext) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn executes_every_dispatched_task_then_drains_cleanly() {
        let buffers = Arc::new(BufferManager::new(BufferPoolConfig { pool_capacity: 16, ..Default::default() }, OriginId::new(0)).unwrap());
        let queue = TaskQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = PipelineId::new(1);

        let mut registry = PipelineRegistry::new();
        let ctx = Arc::new(PipelineContextImpl::new(buffers.clone(), queue.clone(), OriginId::new(1), id));
        ctx.install_handlers(HandlerTable::new());
        registry.register(id, Arc::new(CountingPipeline(counter.clone())), ctx);
        let registry = Arc::new(registry);

        let pool = WorkerPool::start(2, queue.clone(), registry);
        for _ in 0..10 {
            queue.push(Task { buffer: buffers.get_buffer_nowait().unwrap(), pipeline: id }).unwrap();
        }

        // Give the workers time to drain, then stop admitting new tasks
        // and join.
        std::thread::sleep(Duration::from_millis(100));
        queue.begin_drain();
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
