// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Ports: the trait seams external collaborators (compiled pipelines, TCP
//! sources, file/network sinks) implement and the runtime drives.

pub mod pipeline;
pub mod sink;
pub mod source;

pub use pipeline::{Pipeline, PipelineContext, WorkerContext};
pub use sink::{Sink, SinkContext};
pub use source::Source;
