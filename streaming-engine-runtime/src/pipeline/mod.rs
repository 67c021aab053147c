// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Context and Registry
//!
//! The concrete `PipelineContext` every compiled pipeline runs against, and
//! the registry mapping a query's dataflow graph of `PipelineId`s to their
//! `Pipeline` implementations, handler tables, and topological stop order.

pub mod context;
pub mod registry;
pub mod sink_pipeline;

pub use context::PipelineContextImpl;
pub use registry::PipelineRegistry;
pub use sink_pipeline::SinkPipeline;
