// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tuple Buffer
//!
//! A handle to a fixed-size byte region carrying a payload plus ordering
//! metadata: tuple count, sequence number, chunk number, last-chunk flag,
//! watermark, origin id, and child buffers.
//!
//! ## Lifetime and Reference Counting
//!
//! `TupleBuffer` wraps `Arc<BufferInner>`. `Arc`'s own strong count *is* the
//! reference-counted control block the spec describes: cloning a
//! `TupleBuffer` (fanning it out to several pipelines, or holding one as a
//! child of another buffer) bumps the count; dropping the last handle runs
//! `BufferInner`'s destructor, which recycles the segment to its owning pool.
//! This also gives us the "immutable w.r.t. ordering metadata after it
//! leaves its producer" rule for free: `Arc::get_mut` only succeeds while the
//! strong count is 1, i.e. while the producer is still the sole owner. Once
//! the buffer has been cloned out to a second handle, every mutator on this
//! type returns `None`/fails, matching the spec exactly.

use crate::entities::segment::{Segment, SegmentRecycler};
use crate::value_objects::{ChunkNumber, OriginId, SequenceKey, SequenceNumber, Watermark};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct BufferMetadata {
    pub origin: OriginId,
    pub sequence_number: SequenceNumber,
    pub chunk_number: ChunkNumber,
    pub last_chunk: bool,
    pub watermark: Watermark,
    pub tuple_count: usize,
}

impl BufferMetadata {
    pub fn sequence_key(&self) -> SequenceKey {
        SequenceKey::new(self.sequence_number, self.chunk_number)
    }
}

struct BufferInner {
    // `Option` only so `Drop` can move the segment out of `&mut self`; it is
    // `Some` for the entire observable lifetime of a `BufferInner`.
    segment: Option<Segment>,
    recycler: Arc<dyn SegmentRecycler>,
    meta: BufferMetadata,
    children: Vec<TupleBuffer>,
}

impl Drop for BufferInner {
    fn drop(&mut self) {
        if let Some(segment) = self.segment.take() {
            self.recycler.recycle(segment);
        }
    }
}

/// A reference-counted, fixed-size carrier of tuples plus ordering metadata.
#[derive(Clone)]
pub struct TupleBuffer(Arc<BufferInner>);

impl TupleBuffer {
    /// Wraps a freshly popped segment as a brand new buffer, owned solely by
    /// the caller (the producer). `tuple_count` starts at zero; the
    /// producer writes tuples into [`TupleBuffer::data_mut`] and then
    /// records how many it wrote via [`TupleBuffer::set_tuple_count`].
    pub fn new(segment: Segment, recycler: Arc<dyn SegmentRecycler>, origin: OriginId) -> Self {
        let meta = BufferMetadata {
            origin,
            sequence_number: SequenceNumber::ZERO,
            chunk_number: ChunkNumber::FIRST,
            last_chunk: true,
            watermark: Watermark::MIN,
            tuple_count: 0,
        };
        TupleBuffer(Arc::new(BufferInner { segment: Some(segment), recycler, meta, children: Vec::new() }))
    }

    pub fn meta(&self) -> &BufferMetadata {
        &self.0.meta
    }

    pub fn capacity(&self) -> usize {
        self.0.segment.as_ref().expect("segment present for lifetime of handle").capacity()
    }

    pub fn data(&self) -> &[u8] {
        self.0.segment.as_ref().expect("segment present for lifetime of handle").as_slice()
    }

    pub fn children(&self) -> &[TupleBuffer] {
        &self.0.children
    }

    /// Whether this handle is the sole owner of the underlying segment.
    /// `true` exactly while the buffer is still being produced.
    pub fn is_uniquely_owned(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    /// Mutable access to the payload bytes. Returns `None` once the buffer
    /// has left its producer (been cloned), matching the spec's
    /// "immutable w.r.t. ordering metadata after it leaves its producer".
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        Arc::get_mut(&mut self.0).and_then(|inner| inner.segment.as_mut()).map(|s| s.as_mut_slice())
    }

    pub fn set_tuple_count(&mut self, count: usize) -> bool {
        match Arc::get_mut(&mut self.0) {
            Some(inner) => {
                inner.meta.tuple_count = count;
                true
            }
            None => false,
        }
    }

    pub fn stamp(
        &mut self,
        origin: OriginId,
        sequence_number: SequenceNumber,
        chunk_number: ChunkNumber,
        last_chunk: bool,
        watermark: Watermark,
    ) -> bool {
        match Arc::get_mut(&mut self.0) {
            Some(inner) => {
                inner.meta.origin = origin;
                inner.meta.sequence_number = sequence_number;
                inner.meta.chunk_number = chunk_number;
                inner.meta.last_chunk = last_chunk;
                inner.meta.watermark = watermark;
                true
            }
            None => false,
        }
    }

    /// Attaches a variable-sized child buffer (e.g. a string payload). The
    /// child's own refcount is independent; it is released when this parent
    /// is, since dropping the parent's `Arc` drops the `Vec<TupleBuffer>`
    /// holding the child's clone.
    pub fn add_child(&mut self, child: TupleBuffer) -> bool {
        match Arc::get_mut(&mut self.0) {
            Some(inner) => {
                inner.children.push(child);
                true
            }
            None => false,
        }
    }

    /// Identity used by every ordering decision in the engine.
    pub fn identity(&self) -> (OriginId, SequenceKey) {
        (self.0.meta.origin, self.0.meta.sequence_key())
    }
}

impl std::fmt::Debug for TupleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleBuffer")
            .field("origin", &self.0.meta.origin)
            .field("sequence_number", &self.0.meta.sequence_number)
            .field("chunk_number", &self.0.meta.chunk_number)
            .field("last_chunk", &self.0.meta.last_chunk)
            .field("watermark", &self.0.meta.watermark)
            .field("tuple_count", &self.0.meta.tuple_count)
            .field("children", &self.0.children.len())
            .finish()
    }
}
