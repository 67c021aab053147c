// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Registry
//!
//! Maps a query's dataflow graph of `PipelineId`s to their compiled
//! `Pipeline` and owning `PipelineContextImpl`, and drives the two stop
//! protocols `spec.md` §4.2/§5 describe: a graceful stop that issues
//! `terminate` in topological order source -> sink and blocks until every
//! pipeline has returned, and a forced stop that signals cancellation and
//! returns immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use streaming_engine_domain::error::EngineResult;
use streaming_engine_domain::ports::Pipeline;
use streaming_engine_domain::value_objects::PipelineId;

use crate::pipeline::context::PipelineContextImpl;

struct Entry {
    pipeline: Arc<dyn Pipeline>,
    context: Arc<PipelineContextImpl>,
}

/// The dataflow graph of one running query.
pub struct PipelineRegistry {
    entries: HashMap<PipelineId, Entry>,
    /// Source -> sink topological order, used by graceful stop.
    topo_order: Vec<PipelineId>,
    stopped: AtomicBool,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        PipelineRegistry { entries: HashMap::new(), topo_order: Vec::new(), stopped: AtomicBool::new(false) }
    }

    /// Registers a pipeline. `topo_order` must list every registered id
    /// exactly once, source-first, before [`Self::setup_all`] is called.
    pub fn register(&mut self, id: PipelineId, pipeline: Arc<dyn Pipeline>, context: Arc<PipelineContextImpl>) {
        self.entries.insert(id, Entry { pipeline, context });
    }

    pub fn set_topological_order(&mut self, order: Vec<PipelineId>) {
        self.topo_order = order;
    }

    pub fn get(&self, id: PipelineId) -> Option<(&Arc<dyn Pipeline>, &Arc<PipelineContextImpl>)> {
        self.entries.get(&id).map(|e| (&e.pipeline, &e.context))
    }

    pub fn setup_all(&self) -> EngineResult<()> {
        for id in &self.topo_order {
            let entry = self.entries.get(id).expect("topo_order must only name registered pipelines");
            entry.pipeline.setup(entry.context.as_ref())?;
        }
        Ok(())
    }

    /// Graceful stop: `terminate` in topological order, source then sink,
    /// so upstream pipelines finish draining before downstream ones tear
    /// down their state. Idempotent - a second call is a no-op
    /// (`spec.md` §8's "idempotent stop" invariant).
    pub fn graceful_stop(&self) -> EngineResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for id in &self.topo_order {
            let entry = self.entries.get(id).expect("topo_order must only name registered pipelines");
            entry.pipeline.terminate(entry.context.as_ref())?;
        }
        Ok(())
    }

    /// Forced stop: marks the registry stopped without calling
    /// `terminate` on any pipeline. Pipelines observe cancellation at
    /// their next suspension point via the shared task queue's drain flag
    /// instead.
    pub fn forced_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferManager;
    use crate::task::TaskQueue;
    use std::sync::atomic::AtomicU32;
    use streaming_engine_domain::entities::{HandlerTable, TupleBuffer};
    use streaming_engine_domain::ports::{PipelineContext, WorkerContext};
    use streaming_engine_domain::value_objects::{BufferPoolConfig, OriginId};

    struct CountingPipeline {
        terminated: Arc<AtomicU32>,
    }

    impl Pipeline for CountingPipeline {
        fn setup(&self, ctx: &dyn PipelineContext) -> EngineResult<()> {
            let _ = ctx;
            Ok(())
        }
        fn execute(&self, _ctx: &dyn PipelineContext, _worker: &mut dyn WorkerContext, _buffer: TupleBuffer) -> EngineResult<()> {
            Ok(())
        }
        fn terminate(&self, _ctx: &dyn PipelineContext) -> EngineResult<()> {
            self.terminated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context(buffers: &Arc<BufferManager>, queue: &Arc<TaskQueue>, id: PipelineId) -> Arc<PipelineContextImpl> {
        let ctx = Arc::new(PipelineContextImpl::new(buffers.clone(), queue.clone(), OriginId::new(1), id));
        ctx.install_handlers(HandlerTable::new());
        ctx
    }

    #[test]
    fn stop_is_idempotent() {
        let buffers = Arc::new(BufferManager::new(BufferPoolConfig::default(), OriginId::new(0)).unwrap());
        let queue = TaskQueue::new();
        let terminated = Arc::new(AtomicU32::new(0));
        let mut registry = PipelineRegistry::new();
        let id = PipelineId::new(1);
        registry.register(id, Arc::new(CountingPipeline { terminated: terminated.clone() }), context(&buffers, &queue, id));
        registry.set_topological_order(vec![id]);

        registry.graceful_stop().unwrap();
        registry.graceful_stop().unwrap();
        assert_eq!(terminated.load(Ordering::SeqCst), 1, "second stop must be a no-op");
    }

    #[test]
    fn terminate_runs_source_before_sink() {
        use parking_lot::Mutex;

        let buffers = Arc::new(BufferManager::new(BufferPoolConfig::default(), OriginId::new(0)).unwrap());
        let queue = TaskQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        struct OrderRecording {
            id: u64,
            order: Arc<Mutex<Vec<u64>>>,
        }
        impl Pipeline for OrderRecording {
            fn setup(&self, _ctx: &dyn PipelineContext) -> EngineResult<()> {
                Ok(())
            }
            fn execute(&self, _ctx: &dyn PipelineContext, _worker: &mut dyn WorkerContext, _buffer: TupleBuffer) -> EngineResult<()> {
                Ok(())
            }
            fn terminate(&self, _ctx: &dyn PipelineContext) -> EngineResult<()> {
                self.order.lock().push(self.id);
                Ok(())
            }
        }

        let mut registry = PipelineRegistry::new();
        let source_id = PipelineId::new(1);
        let sink_id = PipelineId::new(2);
        registry.register(source_id, Arc::new(OrderRecording { id: 1, order: order.clone() }), context(&buffers, &queue, source_id));
        registry.register(sink_id, Arc::new(OrderRecording { id: 2, order: order.clone() }), context(&buffers, &queue, sink_id));
        registry.set_topological_order(vec![source_id, sink_id]);

        registry.graceful_stop().unwrap();
        assert_eq!(*order.lock(), vec![1, 2]);
    }
}
