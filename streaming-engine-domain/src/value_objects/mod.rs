// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects: immutable types defined entirely by their attributes.

pub mod buffer_config;
pub mod origin_id;
pub mod pipeline_id;
pub mod sequence;
pub mod watermark;

pub use buffer_config::{Alignment, BufferPoolConfig};
pub use origin_id::OriginId;
pub use pipeline_id::PipelineId;
pub use sequence::{ChunkNumber, SequenceKey, SequenceNumber};
pub use watermark::Watermark;
