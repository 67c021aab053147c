// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Window Pipeline
//!
//! Drives a [`SliceStore`]/[`WindowTrigger`] pair through the `Pipeline`
//! trait: absorbs input tuples, advances the watermark, and runs `spec.md`
//! §4.5's trigger action once a window becomes ready. The slice store and
//! trigger are the handler's own mutable state, reached through
//! `ctx.handlers()` and guarded by a `parking_lot::Mutex` per the
//! single-writer-or-internal-lock discipline `PipelineContext` documents -
//! nothing about `execute`'s `&self` rules out multiple workers calling in
//! concurrently, even though in practice one worker owns this operator at a
//! time.
//!
//! Input tuples are `{ts: i64, key: u64, value: i64}` (24 bytes, LE). Output
//! tuples are `{start: i64, end: i64, key: u64, value: i64}` (32 bytes, LE),
//! the layout named in §4.5's trigger action.

use parking_lot::Mutex;

use streaming_engine_domain::entities::{ChunkNumber, HandlerIndex, TupleBuffer};
use streaming_engine_domain::error::EngineResult;
use streaming_engine_domain::ports::{Pipeline, PipelineContext, WorkerContext};
use streaming_engine_domain::value_objects::{PipelineId, Watermark};

use crate::windowing::slice_store::SliceStore;
use crate::windowing::trigger::WindowTrigger;
use crate::windowing::window::WindowSpec;

pub const INPUT_TUPLE_SIZE: usize = 24;
pub const OUTPUT_TUPLE_SIZE: usize = 32;

fn read_i64(data: &[u8], offset: usize) -> i64 {
    i64::from_le_bytes(data[offset..offset + 8].try_into().expect("8-byte slice"))
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(data[offset..offset + 8].try_into().expect("8-byte slice"))
}

fn write_i64(data: &mut [u8], offset: usize, value: i64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// One finalized output tuple, ready for layout into an output buffer.
struct OutputTuple {
    start: i64,
    end: i64,
    key: u64,
    value: i64,
}

fn write_output_tuple(data: &mut [u8], slot: usize, tuple: &OutputTuple) {
    let base = slot * OUTPUT_TUPLE_SIZE;
    write_i64(data, base, tuple.start);
    write_i64(data, base + 8, tuple.end);
    write_u64(data, base + 16, tuple.key);
    write_i64(data, base + 24, tuple.value);
}

/// The window operator's own mutable state, registered as a handler.
pub struct WindowOperator {
    store: Mutex<SliceStore<i64>>,
    trigger: Mutex<WindowTrigger<i64>>,
}

impl WindowOperator {
    pub fn new(window: WindowSpec) -> Self {
        WindowOperator { store: Mutex::new(SliceStore::new(window.slice_size())), trigger: Mutex::new(WindowTrigger::new(window)) }
    }
}

/// Runs a tumbling or sliding aggregation over its input, emitting finalized
/// windows downstream (`spec.md` §4.5).
pub struct WindowPipeline {
    handler: HandlerIndex,
    downstream: PipelineId,
}

impl WindowPipeline {
    pub fn new(handler: HandlerIndex, downstream: PipelineId) -> Self {
        WindowPipeline { handler, downstream }
    }

    fn operator<'a>(&self, ctx: &'a dyn PipelineContext) -> &'a WindowOperator {
        ctx.handlers()
            .get::<WindowOperator>(self.handler)
            .expect("window handler must be registered under the index this pipeline was built with")
    }
}

impl Pipeline for WindowPipeline {
    fn setup(&self, _ctx: &dyn PipelineContext) -> EngineResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &dyn PipelineContext, _worker: &mut dyn WorkerContext, buffer: TupleBuffer) -> EngineResult<()> {
        let operator = self.operator(ctx);
        let data = buffer.data();
        let tuple_count = buffer.meta().tuple_count;

        let mut results: Vec<OutputTuple> = Vec::new();
        {
            let mut store = operator.store.lock();
            for i in 0..tuple_count {
                let base = i * INPUT_TUPLE_SIZE;
                let ts = read_i64(data, base);
                let key = read_u64(data, base + 8);
                let value = read_i64(data, base + 16);
                store.record(ts, key, |cell| *cell += value);
            }
            store.advance_watermark(buffer.meta().watermark.millis());
            let ready_slices = store.take_ready_slices();
            drop(store);

            // Slices arrive from `take_ready_slices` in ascending `start`
            // order; folding them into the trigger in that order keeps
            // windows reported ready in ascending start order too.
            let mut trigger = operator.trigger.lock();
            for slice in &ready_slices {
                let finished = trigger.absorb(slice, |a, b| *a += b);
                for window_start in finished {
                    let window = trigger.take_window(window_start);
                    let mut keys: Vec<u64> = window.cells.keys().copied().collect();
                    keys.sort_unstable();
                    for key in keys {
                        let value = window.cells[&key];
                        results.push(OutputTuple { start: window.start, end: window.end, key, value });
                    }
                }
            }
        }

        if results.is_empty() {
            return Ok(());
        }

        // Trigger action (`spec.md` §4.5): compute the output buffers
        // needed, fill them in ascending slice-start/key order, stamp
        // metadata, dispatch. `ceil(|results| * tuple_size / buffer_size)`
        // needs `buffer_size`, which this operator only learns once it
        // holds a buffer - so the first buffer doubles as the size probe.
        let first = ctx.get_buffer();
        let buffer_size = first.capacity();
        let tuples_per_buffer = (buffer_size / OUTPUT_TUPLE_SIZE).max(1);
        let buffers_needed = results.len().div_ceil(tuples_per_buffer);

        let mut out_buffers = Vec::with_capacity(buffers_needed);
        out_buffers.push(first);
        for _ in 1..buffers_needed {
            out_buffers.push(ctx.get_buffer());
        }

        for (chunk, mut out) in results.chunks(tuples_per_buffer).zip(out_buffers.into_iter()) {
            let slice_start_of_chunk = chunk[0].start;
            {
                let data = out.data_mut().expect("freshly allocated buffer is uniquely owned before it is shared");
                for (slot, tuple) in chunk.iter().enumerate() {
                    write_output_tuple(data, slot, tuple);
                }
            }
            out.set_tuple_count(chunk.len());
            out.stamp(
                ctx.operator_origin(),
                ctx.next_sequence_number(),
                ChunkNumber::FIRST,
                true,
                Watermark::new(slice_start_of_chunk),
            );
            ctx.emit(out, self.downstream)?;
        }

        Ok(())
    }

    fn terminate(&self, _ctx: &dyn PipelineContext) -> EngineResult<()> {
        Ok(())
    }
}
