// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # TCP Source
//!
//! `spec.md` §4.3's representative parsing-heavy source: reads raw bytes
//! off a socket into a circular byte buffer, then extracts framed messages
//! per one of three schemes (tuple separator, fixed size, length prefix)
//! and hands each to a [`TupleParser`].

use std::net::TcpStream;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use streaming_engine_domain::entities::TupleBuffer;
use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::ports::Source;

/// How a framed message boundary is recognized inside the ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingScheme {
    TupleSeparator,
    FixedSize,
    LengthPrefix,
}

fn default_ring_pages() -> usize {
    16
}

/// Configuration for a [`TcpSource`], deserialized from the engine's
/// layered `config`-crate tree (`spec.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpSourceConfig {
    pub host: String,
    pub port: u16,
    pub framing: FramingScheme,
    /// Separator byte for `FramingScheme::TupleSeparator`.
    #[serde(default = "default_separator")]
    pub separator: u8,
    /// Message size for `FramingScheme::FixedSize`.
    #[serde(default)]
    pub fixed_message_size: usize,
    /// Length-prefix width in bytes (1, 2, 4, or 8) for `FramingScheme::LengthPrefix`.
    #[serde(default = "default_length_prefix_width")]
    pub length_prefix_width: u8,
    /// How often `fill_buffer` is allowed to keep looping before returning
    /// with whatever it has accumulated so far.
    pub flush_interval_millis: u64,
    /// Ring buffer size as a multiple of the page size.
    #[serde(default = "default_ring_pages")]
    pub ring_pages: usize,
}

fn default_separator() -> u8 {
    b'\n'
}

fn default_length_prefix_width() -> u8 {
    4
}

impl TcpSourceConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_millis)
    }

    pub fn ring_capacity(&self, page_size: usize) -> usize {
        page_size.max(1) * self.ring_pages.max(1)
    }
}

/// Turns one extracted, framed message into a fixed-size output tuple.
/// Query compilation and schema-aware codegen are external collaborators
/// (`spec.md` §1 Non-goals); this core only needs a seam to plug one in.
pub trait TupleParser: Send {
    fn tuple_size(&self) -> usize;
    fn parse(&self, message: &[u8], dst: &mut [u8]) -> EngineResult<()>;
}

/// Copies a message's bytes verbatim into the destination tuple slot,
/// truncating or zero-padding to `tuple_size`. Stands in for a real
/// schema-aware parser in tests and benchmarking.
pub struct RawCopyParser {
    pub tuple_size: usize,
}

impl TupleParser for RawCopyParser {
    fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    fn parse(&self, message: &[u8], dst: &mut [u8]) -> EngineResult<()> {
        let n = message.len().min(dst.len());
        dst[..n].copy_from_slice(&message[..n]);
        for byte in &mut dst[n..] {
            *byte = 0;
        }
        Ok(())
    }
}

/// Abstraction over a readable, timeout-capable byte source, so tests can
/// drive the framing logic without a real socket.
pub trait SocketRead: Send {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
    fn set_read_timeout(&mut self, dur: Option<Duration>) -> std::io::Result<()>;
}

impl SocketRead for TcpStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::Read::read(self, buf)
    }

    fn set_read_timeout(&mut self, dur: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_read_timeout(self, dur)
    }
}

/// A circular byte buffer sized as a multiple of the page (`spec.md` §4.3).
struct RingBuffer {
    data: Vec<u8>,
    start: usize,
    len: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        RingBuffer { data: vec![0u8; capacity.max(1)], start: 0, len: 0 }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Offset and length of the contiguous free region available for a
    /// single `read` call without wrapping mid-read.
    fn write_region(&self) -> (usize, usize) {
        if self.is_full() {
            return (0, 0);
        }
        let cap = self.data.len();
        let end = (self.start + self.len) % cap;
        if self.start <= end {
            (end, cap - end)
        } else {
            (end, self.start - end)
        }
    }

    fn commit_write(&mut self, n: usize) {
        self.len = (self.len + n).min(self.data.len());
    }

    fn byte_at(&self, logical_index: usize) -> u8 {
        self.data[(self.start + logical_index) % self.data.len()]
    }

    fn position_of(&self, needle: u8) -> Option<usize> {
        (0..self.len).find(|&i| self.byte_at(i) == needle)
    }

    fn peek(&self, n: usize) -> Option<Vec<u8>> {
        if self.len < n {
            return None;
        }
        Some((0..n).map(|i| self.byte_at(i)).collect())
    }

    fn consume(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.len);
        let bytes: Vec<u8> = (0..n).map(|i| self.byte_at(i)).collect();
        self.start = (self.start + n) % self.data.len();
        self.len -= n;
        bytes
    }
}

fn decode_length_prefix(bytes: &[u8]) -> usize {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf) as usize
}

const ASSUMED_PAGE_SIZE: usize = 4096;

pub struct TcpSource {
    config: TcpSourceConfig,
    ring: RingBuffer,
    reader: Option<Box<dyn SocketRead>>,
    parser: Box<dyn TupleParser>,
    eos: bool,
}

impl TcpSource {
    pub fn new(config: TcpSourceConfig, parser: Box<dyn TupleParser>) -> Self {
        let capacity = config.ring_capacity(ASSUMED_PAGE_SIZE);
        TcpSource { config, ring: RingBuffer::new(capacity), reader: None, parser, eos: false }
    }

    /// Plugs in an already-connected reader (an accepted connection, or a
    /// test double) instead of dialing out from `open`.
    pub fn with_reader(config: TcpSourceConfig, parser: Box<dyn TupleParser>, reader: Box<dyn SocketRead>) -> Self {
        let capacity = config.ring_capacity(ASSUMED_PAGE_SIZE);
        TcpSource { config, ring: RingBuffer::new(capacity), reader: Some(reader), parser, eos: false }
    }

    fn extract_message(&mut self) -> Option<Vec<u8>> {
        match self.config.framing {
            FramingScheme::TupleSeparator => {
                let pos = self.ring.position_of(self.config.separator)?;
                let message = self.ring.consume(pos);
                self.ring.consume(1);
                Some(message)
            }
            FramingScheme::FixedSize => {
                let n = self.config.fixed_message_size;
                if self.ring.len() >= n {
                    Some(self.ring.consume(n))
                } else {
                    None
                }
            }
            FramingScheme::LengthPrefix => {
                let width = self.config.length_prefix_width as usize;
                let header = self.ring.peek(width)?;
                let length = decode_length_prefix(&header);
                if self.ring.len() >= width + length {
                    self.ring.consume(width);
                    Some(self.ring.consume(length))
                } else {
                    None
                }
            }
        }
    }
}

impl Source for TcpSource {
    fn open(&mut self) -> EngineResult<()> {
        if self.reader.is_none() {
            let stream = TcpStream::connect((self.config.host.as_str(), self.config.port))
                .map_err(|e| EngineError::io(format!("connecting to {}:{}: {e}", self.config.host, self.config.port), false))?;
            stream.set_read_timeout(Some(Duration::from_millis(50))).map_err(|e| EngineError::io(e.to_string(), true))?;
            self.reader = Some(Box::new(stream));
        }
        Ok(())
    }

    /// Per `spec.md` §4.3: loops while the destination has capacity and
    /// the flush interval hasn't elapsed, reading into the ring and
    /// extracting one framed message per iteration. Breaks early once at
    /// least one tuple has been extracted and nothing further is
    /// immediately ready, rather than busy-spinning for the rest of the
    /// flush interval.
    fn fill_buffer(&mut self, buffer: &mut TupleBuffer) -> EngineResult<bool> {
        let tuple_size = self.parser.tuple_size().max(1);
        let capacity_tuples = buffer.capacity() / tuple_size;
        let deadline = Instant::now() + self.config.flush_interval();
        let mut tuple_count = 0usize;

        loop {
            if self.eos || tuple_count >= capacity_tuples || Instant::now() >= deadline {
                break;
            }

            if !self.ring.is_full() {
                let (offset, len) = self.ring.write_region();
                if len > 0 {
                    let read_result = {
                        let reader = self.reader.as_mut().expect("open() must be called before fill_buffer");
                        let slice = &mut self.ring.data_mut()[offset..offset + len];
                        reader.read(slice)
                    };
                    match read_result {
                        Ok(0) => {
                            if self.ring.is_empty() {
                                self.eos = true;
                                break;
                            }
                        }
                        Ok(n) => self.ring.commit_write(n),
                        Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {}
                        Err(e) => return Err(EngineError::io(e.to_string(), false)),
                    }
                }
            }

            match self.extract_message() {
                Some(message) => {
                    let dst_offset = tuple_count * tuple_size;
                    let data = buffer.data_mut().ok_or_else(|| EngineError::fatal("tcp source handed a shared buffer"))?;
                    self.parser.parse(&message, &mut data[dst_offset..dst_offset + tuple_size])?;
                    tuple_count += 1;
                }
                None => {
                    if tuple_count > 0 {
                        break;
                    }
                }
            }
        }

        buffer.set_tuple_count(tuple_count);
        Ok(!self.eos)
    }

    fn close(&mut self) -> EngineResult<()> {
        self.reader = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use streaming_engine_domain::entities::{Segment, SegmentOrigin, SegmentRecycler};
    use streaming_engine_domain::value_objects::OriginId;
    use std::sync::Arc;

    struct NoopRecycler;
    impl SegmentRecycler for NoopRecycler {
        fn recycle(&self, _segment: Segment) {}
    }

    fn fresh_buffer(capacity: usize) -> TupleBuffer {
        TupleBuffer::new(Segment::new(SegmentOrigin::Global, capacity), Arc::new(NoopRecycler), OriginId::new(0))
    }

    /// Feeds fixed chunks from a queue; `Ok(0)` once drained signals EOS,
    /// matching a socket that has closed.
    struct ScriptedReader {
        chunks: VecDeque<Vec<u8>>,
    }

    impl SocketRead for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }

        fn set_read_timeout(&mut self, _dur: Option<Duration>) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn config(framing: FramingScheme) -> TcpSourceConfig {
        TcpSourceConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            framing,
            separator: b'\n',
            fixed_message_size: 3,
            length_prefix_width: 1,
            flush_interval_millis: 50,
            ring_pages: 1,
        }
    }

    #[test]
    fn tuple_separator_framing_splits_on_newline() {
        let reader = Box::new(ScriptedReader { chunks: VecDeque::from([b"aaa\nbbb\nccc\n".to_vec()]) });
        let mut source = TcpSource::with_reader(config(FramingScheme::TupleSeparator), Box::new(RawCopyParser { tuple_size: 3 }), reader);
        source.open().unwrap();

        let mut buffer = fresh_buffer(3 * 3);
        let more = source.fill_buffer(&mut buffer).unwrap();
        assert!(more);
        assert_eq!(buffer.meta().tuple_count, 3);
        assert_eq!(&buffer.data()[0..3], b"aaa");
        assert_eq!(&buffer.data()[3..6], b"bbb");
        assert_eq!(&buffer.data()[6..9], b"ccc");
    }

    #[test]
    fn fixed_size_framing_consumes_exact_chunks() {
        let reader = Box::new(ScriptedReader { chunks: VecDeque::from([b"abcdef".to_vec()]) });
        let mut source = TcpSource::with_reader(config(FramingScheme::FixedSize), Box::new(RawCopyParser { tuple_size: 3 }), reader);
        source.open().unwrap();

        let mut buffer = fresh_buffer(2 * 3);
        source.fill_buffer(&mut buffer).unwrap();
        assert_eq!(buffer.meta().tuple_count, 2);
        assert_eq!(&buffer.data()[0..3], b"abc");
        assert_eq!(&buffer.data()[3..6], b"def");
    }

    #[test]
    fn length_prefix_framing_reads_the_declared_length() {
        let mut bytes = Vec::new();
        bytes.push(3u8); // length-prefix byte
        bytes.extend_from_slice(b"xyz");
        bytes.push(2u8);
        bytes.extend_from_slice(b"hi");

        let reader = Box::new(ScriptedReader { chunks: VecDeque::from([bytes]) });
        let mut source =
            TcpSource::with_reader(config(FramingScheme::LengthPrefix), Box::new(RawCopyParser { tuple_size: 3 }), reader);
        source.open().unwrap();

        let mut buffer = fresh_buffer(2 * 3);
        source.fill_buffer(&mut buffer).unwrap();
        assert_eq!(buffer.meta().tuple_count, 2);
        assert_eq!(&buffer.data()[0..3], b"xyz");
        assert_eq!(&buffer.data()[3..5], b"hi");
    }

    #[test]
    fn closed_socket_with_drained_ring_reports_end_of_stream() {
        let reader = Box::new(ScriptedReader { chunks: VecDeque::new() });
        let mut source = TcpSource::with_reader(config(FramingScheme::FixedSize), Box::new(RawCopyParser { tuple_size: 3 }), reader);
        source.open().unwrap();

        let mut buffer = fresh_buffer(3);
        let more = source.fill_buffer(&mut buffer).unwrap();
        assert!(!more);
        assert_eq!(buffer.meta().tuple_count, 0);
    }

    #[test]
    fn partial_message_waits_for_more_bytes_across_calls() {
        let reader = Box::new(ScriptedReader { chunks: VecDeque::from([b"ab".to_vec(), b"c".to_vec()]) });
        let mut source = TcpSource::with_reader(config(FramingScheme::FixedSize), Box::new(RawCopyParser { tuple_size: 3 }), reader);
        source.open().unwrap();

        let mut buffer = fresh_buffer(3);
        source.fill_buffer(&mut buffer).unwrap();
        assert_eq!(&buffer.data()[0..3], b"abc");
    }
}
