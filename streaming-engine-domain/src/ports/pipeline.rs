// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Port
//!
//! A pipeline is a compiled callable exposing `setup`/`execute`/`terminate`.
//! The core treats it as an opaque pipeline; query compilation, the logical
//! plan, and the codegen backends that produce a `Pipeline` implementation
//! (interpreter / C++ / LLVM / CUDA) are external collaborators (see
//! `spec.md` §1) - here we reproduce the three-entry-point ABI as a safe
//! trait object instead of `extern "C"` functions, which is the one
//! Rust-native substitution this core makes for §6's C-linkage description.

use crate::entities::{HandlerTable, TupleBuffer};
use crate::error::EngineResult;
use crate::value_objects::{OriginId, PipelineId, SequenceNumber};
use std::time::Duration;

/// Everything a running pipeline can do to the rest of the engine: look up
/// its own handlers, allocate an output buffer, emit downstream, or ask to
/// be retried later (used by backpressured sinks).
pub trait PipelineContext: Send + Sync {
    fn handlers(&self) -> &HandlerTable;

    /// Allocates a fresh buffer from the engine's buffer manager, blocking
    /// if the pool is currently exhausted.
    fn get_buffer(&self) -> TupleBuffer;

    /// Enqueues `(buffer, next_pipeline)` onto the task queue.
    fn emit(&self, buffer: TupleBuffer, next_pipeline: PipelineId) -> EngineResult<()>;

    /// Re-enqueues the *current* task after `delay`. Used by backpressured
    /// sinks and by operators retrying a pending buffer-manager wait.
    fn repeat_task(&self, buffer: TupleBuffer, delay: Duration) -> EngineResult<()>;

    /// The origin id this pipeline stamps on buffers it originates (as
    /// opposed to buffers it merely forwards), e.g. window/join output.
    fn operator_origin(&self) -> OriginId;

    /// The next strictly-increasing sequence number this operator should
    /// stamp on a buffer it originates. Needed by any operator that
    /// materializes new buffers rather than forwarding an input one
    /// (window trigger, join probe emission) - `spec.md` §4.5's trigger
    /// action requires sequence numbers to increase strictly per operator.
    fn next_sequence_number(&self) -> SequenceNumber;
}

/// Per-thread state a worker carries across every task it executes:
/// identity, scratch space, and (in the runtime crate) a buffer sub-pool.
pub trait WorkerContext: Send {
    fn worker_id(&self) -> u32;
    fn scratch_mut(&mut self) -> &mut Vec<u8>;
}

/// A compiled, opaque dataflow stage.
///
/// Implementations are free to run concurrently: `execute` may be called by
/// multiple workers at once against different buffers. Any mutable state
/// that must outlive a single `execute` call belongs in a handler accessed
/// through `ctx.handlers()`, not in `&mut self` on the pipeline itself -
/// `Pipeline` methods take `&self` for exactly this reason.
pub trait Pipeline: Send + Sync {
    fn setup(&self, ctx: &dyn PipelineContext) -> EngineResult<()>;
    fn execute(&self, ctx: &dyn PipelineContext, worker: &mut dyn WorkerContext, buffer: TupleBuffer) -> EngineResult<()>;
    fn terminate(&self, ctx: &dyn PipelineContext) -> EngineResult<()>;
}
