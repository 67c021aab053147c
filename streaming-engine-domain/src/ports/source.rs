// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Port
//!
//! A source produces tuple buffers from an external feed (TCP socket, file,
//! user-provided callback). The core only sees three operations: `open`,
//! `close`, and the pull loop `fill_buffer`. Everything else - pulling a
//! fresh buffer from the buffer manager, rate limiting, stamping metadata,
//! emitting the task - is the source *runtime*'s job
//! (`streaming_engine_runtime::source::runtime::SourceRuntime`), not the
//! source implementation's.

use crate::entities::TupleBuffer;
use crate::error::EngineResult;

/// An external feed the source runtime pulls from.
///
/// `fill_buffer` writes as many tuples as fit into `buffer` and returns
/// whether more data will come (`true`) or the feed is exhausted
/// (`false`). The source runtime decides, from the buffer's tuple count
/// and this return value, when to stop pulling and emit the task - see
/// `spec.md` §4.3's TCP source scenario for the exact termination rule.
pub trait Source: Send {
    fn open(&mut self) -> EngineResult<()>;

    /// Returns `Ok(true)` if more data will come, `Ok(false)` at end of
    /// stream. `buffer` is freshly allocated by the caller and uniquely
    /// owned, so every write through [`TupleBuffer::data_mut`] succeeds.
    fn fill_buffer(&mut self, buffer: &mut TupleBuffer) -> EngineResult<bool>;

    fn close(&mut self) -> EngineResult<()>;
}
