// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Runtime
//!
//! Wraps a domain [`Source`](streaming_engine_domain::ports::Source) with
//! the plumbing every source needs regardless of feed: pulling a buffer
//! from the buffer manager, rate limiting, stamping metadata, and emitting
//! the resulting task onto the task queue (`spec.md` §4.3).

pub mod rate_limiter;
pub mod runtime;
pub mod tcp;

pub use rate_limiter::RateLimiter;
pub use runtime::{SourceBackpressure, SourceRuntime};
pub use tcp::{FramingScheme, RawCopyParser, TcpSource, TcpSourceConfig, TupleParser};
