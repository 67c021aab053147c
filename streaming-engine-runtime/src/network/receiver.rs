// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Network Receiver
//!
//! Reorders incoming `DATA` messages for one channel via a
//! [`SequenceQueue`] and tracks the `EOS` handshake of `spec.md` §4.7: an
//! EOS carries `max_seq`, and the channel is only safe to unregister once
//! the contiguous watermark reaches it.

use streaming_engine_domain::value_objects::SequenceNumber;

use crate::task::SequenceQueue;

pub struct NetworkReceiver {
    queue: SequenceQueue<Vec<u8>>,
    eos_max_seq: Option<SequenceNumber>,
}

impl NetworkReceiver {
    pub fn new(start: SequenceNumber) -> Self {
        NetworkReceiver { queue: SequenceQueue::new(start), eos_max_seq: None }
    }

    /// Enqueues one `DATA` message's payload. Returns `false` for a
    /// duplicate seq, matching `spec.md` §8's sequence-monotonicity
    /// invariant.
    pub fn enqueue(&mut self, seq: SequenceNumber, payload: Vec<u8>) -> bool {
        self.queue.insert(seq, payload)
    }

    pub fn drain_ready(&mut self) -> impl Iterator<Item = (SequenceNumber, Vec<u8>)> + '_ {
        self.queue.drain_ready()
    }

    pub fn contiguous_watermark(&self) -> Option<SequenceNumber> {
        self.queue.current_value()
    }

    /// Records the `EOS` message's `max_seq`.
    pub fn note_eos(&mut self, max_seq: SequenceNumber) {
        self.eos_max_seq = Some(max_seq);
    }

    /// Whether the channel has both seen an EOS and delivered everything up
    /// to its `max_seq` - the only point at which it is safe to unregister.
    pub fn is_drained(&self) -> bool {
        match self.eos_max_seq {
            Some(max_seq) => self.queue.current_value() == Some(max_seq),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_5_network_ordering_under_backpressure() {
        // spec.md §8 scenario 5: seqs 1..10, channel full at seq 5; the
        // receiver side only ever sees insertion order, which may be
        // reordered by retries, but must never duplicate.
        let mut rx = NetworkReceiver::new(SequenceNumber(1));
        let arrival_order = [1u64, 2, 3, 4, 6, 7, 5, 8, 9, 10];
        let mut observed = Vec::new();
        for seq in arrival_order {
            assert!(rx.enqueue(SequenceNumber(seq), vec![seq as u8]));
            for (s, payload) in rx.drain_ready() {
                observed.push((s.0, payload));
            }
        }
        let expected: Vec<(u64, Vec<u8>)> = (1..=10).map(|i| (i, vec![i as u8])).collect();
        assert_eq!(observed, expected);
        assert_eq!(rx.contiguous_watermark(), Some(SequenceNumber(10)));
    }

    #[test]
    fn eos_drains_only_once_watermark_reaches_max_seq() {
        let mut rx = NetworkReceiver::new(SequenceNumber(1));
        rx.note_eos(SequenceNumber(3));
        rx.enqueue(SequenceNumber(1), vec![]);
        rx.drain_ready().for_each(drop);
        assert!(!rx.is_drained());
        rx.enqueue(SequenceNumber(2), vec![]);
        rx.enqueue(SequenceNumber(3), vec![]);
        rx.drain_ready().for_each(drop);
        assert!(rx.is_drained());
    }

    #[test]
    fn duplicate_arrival_is_rejected() {
        let mut rx = NetworkReceiver::new(SequenceNumber(1));
        assert!(rx.enqueue(SequenceNumber(1), vec![]));
        rx.drain_ready().for_each(drop);
        assert!(!rx.enqueue(SequenceNumber(1), vec![]));
    }
}
