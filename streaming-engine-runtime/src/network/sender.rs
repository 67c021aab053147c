// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Network Sender
//!
//! Wraps every send in the backpressure state machine `spec.md` §4.7
//! describes: a transport returning `Full` gets its buffer parked in a
//! bounded deque and ingestion pauses; once the deque drains below the low
//! watermark, ingestion resumes. One pending buffer is always allowed to
//! loop back through the caller so the sender is retried periodically -
//! here that's simply `send` itself being safe to call again, since a
//! paused sender still attempts to drain on every call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use streaming_engine_domain::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportResult {
    Ok,
    Full,
    Closed,
}

/// The underlying channel a sender pushes bytes into - a TCP socket, an
/// in-process mailbox for tests, anything that can report back-pressure.
pub trait Transport: Send + Sync {
    fn try_send(&self, bytes: &[u8]) -> TransportResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Queued,
}

pub struct NetworkSender {
    transport: Arc<dyn Transport>,
    pending: Mutex<VecDeque<Vec<u8>>>,
    high_watermark: usize,
    low_watermark: usize,
    paused: AtomicBool,
}

impl NetworkSender {
    pub fn new(transport: Arc<dyn Transport>, high_watermark: usize, low_watermark: usize) -> Self {
        assert!(low_watermark <= high_watermark);
        NetworkSender { transport, pending: Mutex::new(VecDeque::new()), high_watermark, low_watermark, paused: AtomicBool::new(false) }
    }

    /// Attempts to drain whatever is pending, then sends `bytes` - directly
    /// if the deque is empty and the transport accepts it, or by appending
    /// it to the deque otherwise. Fails with `EndOfStream` once the
    /// transport reports `Closed`: further sends propagate upstream as an
    /// EOS-closed signal (`spec.md` §4.7 "Failures").
    pub fn send(&self, bytes: Vec<u8>) -> EngineResult<SendOutcome> {
        self.drain_pending()?;

        // Anything still pending must stay ahead of `bytes` in send order,
        // so a non-empty deque (or an explicit pause) always means queue,
        // never a direct send.
        let mut pending = self.pending.lock();
        if !pending.is_empty() || self.paused.load(Ordering::Acquire) {
            pending.push_back(bytes);
            if pending.len() >= self.high_watermark {
                self.paused.store(true, Ordering::Release);
            }
            return Ok(SendOutcome::Queued);
        }
        drop(pending);

        match self.transport.try_send(&bytes) {
            TransportResult::Ok => Ok(SendOutcome::Sent),
            TransportResult::Full => {
                self.enqueue(bytes);
                Ok(SendOutcome::Queued)
            }
            TransportResult::Closed => Err(EngineError::end_of_stream("network channel closed")),
        }
    }

    fn enqueue(&self, bytes: Vec<u8>) {
        let mut pending = self.pending.lock();
        pending.push_back(bytes);
        if pending.len() >= self.high_watermark {
            self.paused.store(true, Ordering::Release);
        }
    }

    fn drain_pending(&self) -> EngineResult<()> {
        let mut pending = self.pending.lock();
        while let Some(front) = pending.front() {
            match self.transport.try_send(front) {
                TransportResult::Ok => {
                    pending.pop_front();
                }
                TransportResult::Full => break,
                TransportResult::Closed => return Err(EngineError::end_of_stream("network channel closed while draining")),
            }
        }
        if pending.len() <= self.low_watermark {
            self.paused.store(false, Ordering::Release);
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct FlakyTransport {
        full_until: AtomicUsize,
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl Transport for FlakyTransport {
        fn try_send(&self, bytes: &[u8]) -> TransportResult {
            if self.full_until.load(Ordering::SeqCst) > 0 {
                self.full_until.fetch_sub(1, Ordering::SeqCst);
                return TransportResult::Full;
            }
            self.sent.lock().push(bytes.to_vec());
            TransportResult::Ok
        }
    }

    #[test]
    fn queues_then_drains_once_transport_clears() {
        let transport = Arc::new(FlakyTransport { full_until: AtomicUsize::new(2), sent: Mutex::new(Vec::new()) });
        let sender = NetworkSender::new(transport.clone(), 10, 2);

        assert_eq!(sender.send(vec![1]).unwrap(), SendOutcome::Queued);
        assert_eq!(sender.send(vec![2]).unwrap(), SendOutcome::Queued);
        // Third send: transport is clear now, but draining happens before
        // the new send, so [1] goes out first and this one is appended.
        assert_eq!(sender.send(vec![3]).unwrap(), SendOutcome::Sent);
        assert_eq!(*transport.sent.lock(), vec![vec![1], vec![2], vec![3]]);
        assert_eq!(sender.pending_len(), 0);
    }

    #[test]
    fn pauses_at_high_watermark_resumes_at_low() {
        let transport = Arc::new(FlakyTransport { full_until: AtomicUsize::new(100), sent: Mutex::new(Vec::new()) });
        let sender = NetworkSender::new(transport, 2, 0);
        sender.send(vec![1]).unwrap();
        sender.send(vec![2]).unwrap();
        assert!(sender.is_paused());
    }
}
