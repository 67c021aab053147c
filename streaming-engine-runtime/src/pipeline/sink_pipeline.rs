// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sink Pipeline Adapter
//!
//! `spec.md`'s §4.2 worker loop only knows how to run a [`Pipeline`]; a
//! [`Sink`] is a narrower trait driven through [`SinkContext`]. This
//! adapter lets any sink be registered as the terminal stage of a
//! dataflow graph without the worker pool needing to know sinks exist.

use parking_lot::Mutex;

use streaming_engine_domain::entities::TupleBuffer;
use streaming_engine_domain::error::EngineResult;
use streaming_engine_domain::ports::{Pipeline, PipelineContext, Sink, SinkContext, WorkerContext};
use std::time::Duration;

/// Narrows a `&dyn PipelineContext` down to the `repeat_task`-only surface
/// a `Sink` needs, since `PipelineContext` is already a superset.
struct AsSinkContext<'a>(&'a dyn PipelineContext);

impl SinkContext for AsSinkContext<'_> {
    fn repeat_task(&self, buffer: TupleBuffer, delay: Duration) -> EngineResult<()> {
        self.0.repeat_task(buffer, delay)
    }
}

pub struct SinkPipeline<S> {
    sink: Mutex<S>,
}

impl<S: Sink> SinkPipeline<S> {
    pub fn new(sink: S) -> Self {
        SinkPipeline { sink: Mutex::new(sink) }
    }
}

impl<S: Sink> Pipeline for SinkPipeline<S> {
    fn setup(&self, ctx: &dyn PipelineContext) -> EngineResult<()> {
        self.sink.lock().start(&AsSinkContext(ctx))
    }

    fn execute(&self, ctx: &dyn PipelineContext, _worker: &mut dyn WorkerContext, buffer: TupleBuffer) -> EngineResult<()> {
        self.sink.lock().execute(buffer, &AsSinkContext(ctx))
    }

    fn terminate(&self, ctx: &dyn PipelineContext) -> EngineResult<()> {
        self.sink.lock().stop(&AsSinkContext(ctx))
    }
}
