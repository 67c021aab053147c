// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Context
//!
//! The concrete implementation of [`PipelineContext`] a running pipeline
//! calls into: its own handler table, a buffer allocator, and the two ways
//! of reaching the rest of the dataflow graph - `emit` (enqueue downstream)
//! and `repeat_task` (reschedule the current task, used by backpressured
//! sinks).
//!
//! ## Breaking the handler/context cycle
//!
//! `spec.md` §9 calls out that a handler conceptually wants to reference
//! the context that owns it, and the context owns the handler array - a
//! cycle. We avoid it exactly as the design notes prescribe: handlers are
//! looked up by [`HandlerIndex`], never by holding a reference back to the
//! context past the call that needed it.
//!
//! ## Handler table mutability
//!
//! The table itself is built exactly once, during `setup` (single-writer,
//! before any worker calls `execute`), and installed into a `OnceLock`. At
//! execute time every access is a shared `&HandlerTable` lookup; mutable
//! state inside a handler - a slice store, a join's interval list - is the
//! handler's own responsibility to synchronize, per the per-operator
//! discipline `spec.md` §4 describes (single-writer partitioning for local
//! variants, an internal lock for global-locking variants).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use streaming_engine_domain::entities::{HandlerTable, TupleBuffer};
use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::ports::{PipelineContext, SinkContext};
use streaming_engine_domain::value_objects::{OriginId, PipelineId, SequenceNumber};

use crate::buffer::BufferManager;
use crate::task::{Task, TaskQueue};

/// Owns one pipeline's handler table and wires it to the shared buffer
/// manager and task queue. One instance per `PipelineId`, constructed at
/// query setup and dropped at `terminate`.
pub struct PipelineContextImpl {
    handlers: OnceLock<HandlerTable>,
    buffers: Arc<BufferManager>,
    queue: Arc<TaskQueue>,
    operator_origin: OriginId,
    self_pipeline: PipelineId,
    next_sequence: AtomicU64,
}

impl PipelineContextImpl {
    pub fn new(buffers: Arc<BufferManager>, queue: Arc<TaskQueue>, operator_origin: OriginId, self_pipeline: PipelineId) -> Self {
        PipelineContextImpl {
            handlers: OnceLock::new(),
            buffers,
            queue,
            operator_origin,
            self_pipeline,
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Installs the handler table built during `Pipeline::setup`. Must be
    /// called at most once; a second call is a setup bug and panics rather
    /// than silently discarding the first table.
    pub fn install_handlers(&self, table: HandlerTable) {
        self.handlers.set(table).unwrap_or_else(|_| panic!("handlers already installed for pipeline {}", self.self_pipeline));
    }

    /// The next strictly-increasing sequence number this operator should
    /// stamp on a buffer it originates (window/join output). Sequence
    /// numbers increase strictly per operator per `spec.md` §4.5's trigger
    /// action.
    pub fn next_sequence_number(&self) -> SequenceNumber {
        SequenceNumber(self.next_sequence.fetch_add(1, Ordering::Relaxed))
    }

    pub fn buffer_manager(&self) -> &Arc<BufferManager> {
        &self.buffers
    }

    pub fn self_pipeline(&self) -> PipelineId {
        self.self_pipeline
    }
}

impl PipelineContext for PipelineContextImpl {
    fn handlers(&self) -> &HandlerTable {
        self.handlers.get().expect("handlers must be installed during Pipeline::setup before execute runs")
    }

    fn get_buffer(&self) -> TupleBuffer {
        self.buffers.get_buffer_blocking()
    }

    fn emit(&self, buffer: TupleBuffer, next_pipeline: PipelineId) -> EngineResult<()> {
        self.queue.push(Task { buffer, pipeline: next_pipeline })
    }

    fn repeat_task(&self, buffer: TupleBuffer, delay: Duration) -> EngineResult<()> {
        self.queue.push_delayed(Task { buffer, pipeline: self.self_pipeline }, delay)
    }

    fn operator_origin(&self) -> OriginId {
        self.operator_origin
    }

    fn next_sequence_number(&self) -> SequenceNumber {
        SequenceNumber(self.next_sequence.fetch_add(1, Ordering::Relaxed))
    }
}

/// A sink pipeline's `execute` is handed a `&dyn SinkContext` so a
/// backpressured sink can reschedule itself without depending on the
/// broader `PipelineContext` surface; `PipelineContextImpl` satisfies both.
impl SinkContext for PipelineContextImpl {
    fn repeat_task(&self, buffer: TupleBuffer, delay: Duration) -> EngineResult<()> {
        PipelineContext::repeat_task(self, buffer, delay)
    }
}

/// Guard against calling `handlers()` before `install_handlers` - surfaced
/// as a configuration error rather than a panic when the caller can
/// recover (e.g. the registry validating setup order).
pub fn ensure_handlers_installed(ctx: &PipelineContextImpl) -> EngineResult<()> {
    if ctx.handlers.get().is_none() {
        return Err(EngineError::invalid_configuration("pipeline executed before its handlers were installed"));
    }
    Ok(())
}
