// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Engine Domain
//!
//! Pure types shared by the runtime: tuple buffers, slices, intervals,
//! operator handlers, the engine's error taxonomy, and the `Pipeline` /
//! `Source` / `Sink` trait seams the runtime drives. Nothing in this crate
//! touches `tokio` or performs I/O - the runtime crate owns every concrete
//! allocator, thread pool, and socket.
//!
//! ## Layout
//!
//! - [`entities`] - tuple buffers, memory segments, slices, intervals,
//!   paged vectors, operator handlers: objects with identity and a
//!   lifecycle.
//! - [`value_objects`] - origin ids, sequence/chunk numbers, watermarks,
//!   pipeline ids, buffer pool sizing: immutable types defined by their
//!   attributes.
//! - [`ports`] - `Pipeline`, `Source`, `Sink`: the narrow interfaces the
//!   runtime's task queue and source/sink runtimes drive. Concrete
//!   implementations (compiled pipelines, TCP sources, file sinks) live in
//!   `streaming-engine-runtime`.
//! - [`error`] - `EngineError`, the single error type spanning allocation
//!   exhaustion, protocol violations, end-of-stream, recoverable I/O, and
//!   fatal invariants.

pub mod entities;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use error::{EngineError, EngineResult};
