// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging
//!
//! `tracing`/`tracing-subscriber` initialization. Every log line that
//! identifies a piece of running dataflow carries the same four
//! structured fields - `query_id`, `origin_id`, `worker_id`, `channel_id` -
//! so a log aggregator can filter by any of them without string parsing.

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Installs the global `tracing` subscriber. `RUST_LOG`, if set, takes
/// precedence over `level`; call once, near the top of `main`.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_thread_names(true).init();
}

/// Span carrying the four identifiers every pipeline/task log line should
/// be correlated by.
pub fn dataflow_span(query_id: &str, origin_id: u32, worker_id: u32, channel_id: u32) -> tracing::Span {
    tracing::info_span!("dataflow", query_id, origin_id, worker_id, channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataflow_span_carries_all_four_fields() {
        let span = dataflow_span("q1", 1, 2, 3);
        assert_eq!(span.metadata().unwrap().name(), "dataflow");
    }
}
