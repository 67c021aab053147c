// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Sink
//!
//! Appends tuple buffer payloads to a file, flushing whenever a buffer is
//! marked `last_chunk` (`SPEC_FULL.md` §4.3a).

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use streaming_engine_domain::entities::TupleBuffer;
use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::ports::{Sink, SinkContext};

pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileSink { path: path.as_ref().to_path_buf(), writer: None }
    }
}

impl Sink for FileSink {
    fn start(&mut self, _ctx: &dyn SinkContext) -> EngineResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| EngineError::io(format!("opening sink file {}: {e}", self.path.display()), false))?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn execute(&mut self, buffer: TupleBuffer, _ctx: &dyn SinkContext) -> EngineResult<()> {
        let writer = self.writer.as_mut().ok_or_else(|| EngineError::fatal("file sink executed before start"))?;
        writer.write_all(buffer.data()).map_err(|e| EngineError::io(e.to_string(), true))?;
        if buffer.meta().last_chunk {
            writer.flush().map_err(|e| EngineError::io(e.to_string(), true))?;
        }
        Ok(())
    }

    fn stop(&mut self, _ctx: &dyn SinkContext) -> EngineResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| EngineError::io(e.to_string(), false))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use streaming_engine_domain::entities::{Segment, SegmentOrigin, SegmentRecycler};
    use streaming_engine_domain::value_objects::{ChunkNumber, OriginId, SequenceNumber, Watermark};

    struct NoopRecycler;
    impl SegmentRecycler for NoopRecycler {
        fn recycle(&self, _segment: Segment) {}
    }

    struct NoopSinkContext;
    impl SinkContext for NoopSinkContext {
        fn repeat_task(&self, _buffer: TupleBuffer, _delay: Duration) -> EngineResult<()> {
            Ok(())
        }
    }

    fn buffer_with(payload: &[u8], last_chunk: bool) -> TupleBuffer {
        let mut segment = Segment::new(SegmentOrigin::Global, payload.len());
        segment.as_mut_slice().copy_from_slice(payload);
        let mut buf = TupleBuffer::new(segment, Arc::new(NoopRecycler), OriginId::new(0));
        buf.stamp(OriginId::new(0), SequenceNumber::ZERO, ChunkNumber::FIRST, last_chunk, Watermark::MIN);
        buf.set_tuple_count(1);
        buf
    }

    #[test]
    fn writes_and_flushes_on_last_chunk() {
        let dir = std::env::temp_dir().join(format!("streaming-engine-file-sink-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.bin");
        std::fs::remove_file(&path).ok();

        let ctx = NoopSinkContext;
        let mut sink = FileSink::new(&path);
        sink.start(&ctx).unwrap();
        sink.execute(buffer_with(b"hello ", false), &ctx).unwrap();
        sink.execute(buffer_with(b"world", true), &ctx).unwrap();
        sink.stop(&ctx).unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, b"hello world");

        std::fs::remove_dir_all(&dir).ok();
    }
}
