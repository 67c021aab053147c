// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sequence and Chunk Numbers
//!
//! A tuple buffer is uniquely identified within a stream by
//! `(origin_id, sequence_number, chunk_number)`. A logical message may be
//! split across chunks; ordering is defined per origin by `sequence_number`
//! then `chunk_number`.

use serde::{Deserialize, Serialize};

/// Per-origin ordering key for a logical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    pub const ZERO: SequenceNumber = SequenceNumber(0);

    pub fn next(self) -> Self {
        SequenceNumber(self.0 + 1)
    }
}

/// Position of a chunk within a logical message that spans multiple chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkNumber(pub u64);

impl ChunkNumber {
    pub const FIRST: ChunkNumber = ChunkNumber(0);
}

/// The `(seq, chunk)` pair that totally orders buffers within one origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceKey {
    pub sequence_number: SequenceNumber,
    pub chunk_number: ChunkNumber,
}

impl SequenceKey {
    pub fn new(sequence_number: SequenceNumber, chunk_number: ChunkNumber) -> Self {
        Self { sequence_number, chunk_number }
    }
}
