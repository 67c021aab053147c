// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Error System
//!
//! A single, hierarchical error type for the streaming engine core. Errors
//! are organized into the categories the runtime actually needs to
//! distinguish at call sites: allocation exhaustion (buffer pool), protocol
//! violations (network transport), end-of-stream (normal termination),
//! recoverable I/O (retried at the call site), and fatal invariants (abort
//! after logging).
//!
//! Two of these categories are not ordinary "failures" at all:
//! `EndOfStream` is a control-flow signal, and `FatalInvariant` is never
//! meant to be caught and handled - it exists so the type system can carry
//! the message to the log line printed just before `abort`.

use thiserror::Error;

/// Errors recognized by the streaming engine core.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// A buffer request could not be served within the caller's wait policy.
    #[error("buffer pool exhausted: {0}")]
    AllocationExhausted(String),

    /// A malformed header, unknown channel, or version mismatch on the wire.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Normal termination of a source or channel; drains the pipeline graph.
    #[error("end of stream: {0}")]
    EndOfStream(String),

    /// Transient I/O failure. Retried at the call site (TCP source retries
    /// reads, network sink stores and reruns); never returned across a
    /// suspension point without `recoverable() == true`.
    #[error("io error: {0}")]
    Io { message: String, recoverable: bool },

    /// A configuration value was missing, malformed, or internally
    /// inconsistent (join/window setup, source/sink address resolution).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A segment had an unexpected refcount, a slice store saw an ordering
    /// violation, or a tuple index was out of bounds. These must not occur
    /// under correct operation; the caller is expected to log and abort
    /// rather than propagate further.
    #[error("fatal invariant violated: {0}")]
    FatalInvariant(String),
}

impl EngineError {
    pub fn allocation_exhausted(msg: impl Into<String>) -> Self {
        Self::AllocationExhausted(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn end_of_stream(msg: impl Into<String>) -> Self {
        Self::EndOfStream(msg.into())
    }

    pub fn io(msg: impl Into<String>, recoverable: bool) -> Self {
        Self::Io { message: msg.into(), recoverable }
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::FatalInvariant(msg.into())
    }

    /// Whether this error represents a transient condition worth retrying
    /// (TCP recv timeouts, network full-backpressure, buffer-pool timeouts).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::Io { recoverable: true, .. })
    }

    /// Coarse category, used by tests and log correlation rather than by
    /// any control-flow decision.
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::AllocationExhausted(_) => "allocation",
            EngineError::Protocol(_) => "protocol",
            EngineError::EndOfStream(_) => "eos",
            EngineError::Io { .. } => "io",
            EngineError::InvalidConfiguration(_) => "configuration",
            EngineError::FatalInvariant(_) => "fatal",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        let recoverable = matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
        );
        EngineError::Io { message: err.to_string(), recoverable }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidConfiguration(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
