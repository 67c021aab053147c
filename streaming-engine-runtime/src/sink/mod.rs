// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sink Implementations
//!
//! Concrete [`Sink`](streaming_engine_domain::ports::Sink) implementations
//! (`SPEC_FULL.md` §4.3a). The network sink lives in [`crate::network`]
//! instead, since it shares the channel registry and backpressure state
//! machine with the network receive path.

pub mod file;
pub mod null;

pub use file::FileSink;
pub use null::NullSink;
