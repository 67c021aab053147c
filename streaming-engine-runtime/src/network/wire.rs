// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Wire Format
//!
//! Hand-rolled little-endian encode/decode for `SerializedTupleBuffer`
//! (`spec.md` §6). No `serde` on the wire: a fixed ABI-level byte layout
//! must not drift with a derive, the same reasoning the teacher's own
//! binary format module applies to its header.
//!
//! Header: `u64 seq, u64 origin, u64 chunk, u64 n_tuples, u64 watermark,
//! u8 last_chunk, u8[7] pad` (48 bytes). Payload follows directly -
//! `n_tuples * tuple_size` bytes, where `tuple_size` is known to the caller
//! from the query's schema and is **not** carried on the wire (per the
//! spec's literal header layout); decoding therefore takes `payload_len`
//! as a parameter rather than reading it from the message. Children follow
//! the payload: `u16 n_children` then `n_children` entries of
//! `{u32 size, bytes}`.

use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::value_objects::{ChunkNumber, OriginId, SequenceNumber, Watermark};

pub const HEADER_LEN: usize = 8 * 5 + 1 + 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireHeader {
    pub sequence_number: SequenceNumber,
    pub origin: OriginId,
    pub chunk_number: ChunkNumber,
    pub n_tuples: u64,
    pub watermark: Watermark,
    pub last_chunk: bool,
}

impl WireHeader {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.sequence_number.0.to_le_bytes());
        out.extend_from_slice(&self.origin.get().to_le_bytes());
        out.extend_from_slice(&self.chunk_number.0.to_le_bytes());
        out.extend_from_slice(&self.n_tuples.to_le_bytes());
        out.extend_from_slice(&(self.watermark.millis() as u64).to_le_bytes());
        out.push(self.last_chunk as u8);
        out.extend_from_slice(&[0u8; 7]);
    }

    fn decode(bytes: &[u8]) -> EngineResult<(Self, &[u8])> {
        if bytes.len() < HEADER_LEN {
            return Err(EngineError::protocol("wire header truncated"));
        }
        let seq = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let origin = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let chunk = u64::from_le_bytes(bytes[16..24].try_into().unwrap());
        let n_tuples = u64::from_le_bytes(bytes[24..32].try_into().unwrap());
        let watermark = u64::from_le_bytes(bytes[32..40].try_into().unwrap()) as i64;
        let last_chunk = bytes[40] != 0;
        let header = WireHeader {
            sequence_number: SequenceNumber(seq),
            origin: OriginId::new(origin),
            chunk_number: ChunkNumber(chunk),
            n_tuples,
            watermark: Watermark::new(watermark),
            last_chunk,
        };
        Ok((header, &bytes[HEADER_LEN..]))
    }
}

/// Encodes one `SerializedTupleBuffer` message: header, payload, then the
/// child-slice block.
pub fn encode_message(header: &WireHeader, payload: &[u8], children: &[&[u8]]) -> Vec<u8> {
    let children_len: usize = children.iter().map(|c| 4 + c.len()).sum();
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + 2 + children_len);
    header.encode(&mut out);
    out.extend_from_slice(payload);
    out.extend_from_slice(&(children.len() as u16).to_le_bytes());
    for child in children {
        out.extend_from_slice(&(child.len() as u32).to_le_bytes());
        out.extend_from_slice(child);
    }
    out
}

/// Decodes one message encoded by [`encode_message`]. `payload_len` must be
/// supplied by the caller from the query's known tuple size, since the wire
/// header does not carry it.
pub fn decode_message(bytes: &[u8], payload_len: usize) -> EngineResult<(WireHeader, Vec<u8>, Vec<Vec<u8>>)> {
    let (header, rest) = WireHeader::decode(bytes)?;
    if rest.len() < payload_len {
        return Err(EngineError::protocol("wire payload truncated"));
    }
    let payload = rest[..payload_len].to_vec();
    let mut cursor = &rest[payload_len..];

    if cursor.len() < 2 {
        return Err(EngineError::protocol("wire child count truncated"));
    }
    let n_children = u16::from_le_bytes(cursor[0..2].try_into().unwrap()) as usize;
    cursor = &cursor[2..];

    let mut children = Vec::with_capacity(n_children);
    for _ in 0..n_children {
        if cursor.len() < 4 {
            return Err(EngineError::protocol("wire child size truncated"));
        }
        let size = u32::from_le_bytes(cursor[0..4].try_into().unwrap()) as usize;
        cursor = &cursor[4..];
        if cursor.len() < size {
            return Err(EngineError::protocol("wire child payload truncated"));
        }
        children.push(cursor[..size].to_vec());
        cursor = &cursor[size..];
    }

    Ok((header, payload, children))
}
