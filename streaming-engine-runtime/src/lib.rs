// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Engine Runtime
//!
//! The four core subsystems of the distributed stream-processing engine,
//! plus the ambient infrastructure (configuration, logging, metrics) a
//! running engine needs.
//!
//! ## Modules
//!
//! - [`buffer`] - the buffer manager: a fixed-capacity pooled allocator with
//!   thread-local sub-pools and an oversize unpooled path.
//! - [`task`] - the task queue, worker pool, and the monotonic sequence
//!   queue used to recover per-origin order downstream of a pool of
//!   workers.
//! - [`pipeline`] - the `PipelineContext` implementation and the pipeline
//!   registry a query's dataflow graph is built from.
//! - [`source`] - the source runtime (rate control, metadata stamping) and
//!   the TCP source.
//! - [`sink`] - file and null sinks; the network sink lives in
//!   [`network`].
//! - [`watermark`] - per-origin watermark tracking and global-watermark
//!   computation.
//! - [`windowing`] - the slice store and aggregation trigger.
//! - [`join`] - the stream join core: build/probe, interval state, the
//!   memory controller.
//! - [`network`] - channel registration, the wire format, backpressured
//!   send, ordered receive.
//! - [`config`] - layered engine configuration (defaults -> file -> env).
//! - [`logging`] - `tracing` initialization and span helpers.
//! - [`metrics`] - the `prometheus`-backed counters tests assert invariants
//!   against.

pub mod buffer;
pub mod config;
pub mod join;
pub mod logging;
pub mod metrics;
pub mod network;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod task;
pub mod watermark;
pub mod windowing;

pub use streaming_engine_domain::{EngineError, EngineResult};
