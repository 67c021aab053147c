// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sink Port
//!
//! A sink consumes tuple buffers: writing them to a file, a network
//! channel, or discarding them. `execute` may call
//! [`SinkContext::repeat_task`] to reschedule itself when backpressured
//! instead of blocking the worker thread.

use crate::entities::TupleBuffer;
use crate::error::EngineResult;
use std::time::Duration;

/// What a sink can do to the rest of the engine without holding a full
/// `PipelineContext`: reschedule its own task after a backpressure delay.
pub trait SinkContext: Send + Sync {
    fn repeat_task(&self, buffer: TupleBuffer, delay: Duration) -> EngineResult<()>;
}

pub trait Sink: Send {
    fn start(&mut self, ctx: &dyn SinkContext) -> EngineResult<()>;

    /// May call `ctx.repeat_task` instead of returning an error when the
    /// sink is temporarily backpressured (network full, file write
    /// pending).
    fn execute(&mut self, buffer: TupleBuffer, ctx: &dyn SinkContext) -> EngineResult<()>;

    /// May also call `ctx.repeat_task` if a drain is still pending.
    fn stop(&mut self, ctx: &dyn SinkContext) -> EngineResult<()>;
}
