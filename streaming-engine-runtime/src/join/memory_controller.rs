// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Memory Controller
//!
//! Spills whole build-side pages to disk when a join's in-memory budget is
//! exceeded (`spec.md` §4.6a). Spill files are keyed by
//! `(query, origin, side, slice_end, worker)` per the path template in
//! `spec.md` §6's "Persisted state", and a bounded LRU of open writers
//! caps file-descriptor use. A reader is only ever created once the slice
//! is read back, and never coexists with a writer for the same key - that
//! exclusion is enforced by [`SpillHandle`] itself rather than by
//! convention.

use std::collections::{HashMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use streaming_engine_domain::entities::JoinSide;
use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::value_objects::OriginId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpillKey {
    pub query: u64,
    pub origin: OriginId,
    pub side: JoinSide,
    pub slice_end: i64,
    pub worker: u32,
}

impl SpillKey {
    fn side_label(&self) -> &'static str {
        match self.side {
            JoinSide::Left => "left",
            JoinSide::Right => "right",
        }
    }

    fn path(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(format!(
            "memory_controller_{}_{}_{}_{}_{}",
            self.query,
            self.origin.get(),
            self.side_label(),
            self.slice_end,
            self.worker
        ))
    }
}

enum SpillHandle {
    Writer(File),
    Reader(File),
}

struct ControllerState {
    handles: HashMap<SpillKey, SpillHandle>,
    lru: VecDeque<SpillKey>,
    max_open: usize,
}

impl ControllerState {
    fn touch(&mut self, key: &SpillKey) {
        self.lru.retain(|k| k != key);
        self.lru.push_back(key.clone());
    }

    fn evict_if_over_capacity(&mut self) {
        while self.lru.len() > self.max_open {
            if let Some(oldest) = self.lru.pop_front() {
                self.handles.remove(&oldest);
            }
        }
    }
}

/// Per-query (or per-engine, if shared) arbiter of in-memory build-side
/// bytes and on-disk spill files.
pub struct MemoryController {
    working_dir: PathBuf,
    budget_bytes: usize,
    used_bytes: AtomicUsize,
    state: Mutex<ControllerState>,
}

impl MemoryController {
    pub fn new(working_dir: impl Into<PathBuf>, budget_bytes: usize, max_open_handles: usize) -> Self {
        MemoryController {
            working_dir: working_dir.into(),
            budget_bytes,
            used_bytes: AtomicUsize::new(0),
            state: Mutex::new(ControllerState { handles: HashMap::new(), lru: VecDeque::new(), max_open: max_open_handles }),
        }
    }

    /// Whether accepting `additional` more in-memory bytes would exceed the
    /// configured budget - the trigger for spilling a page.
    pub fn over_budget(&self, additional: usize) -> bool {
        self.used_bytes.load(Ordering::Relaxed) + additional > self.budget_bytes
    }

    pub fn account(&self, bytes: usize) {
        self.used_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn release(&self, bytes: usize) {
        self.used_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Appends `page` to the spill file for `key`, opening (or reusing) a
    /// writer. Fails if a reader is already open for this key - the two
    /// must never coexist.
    pub fn spill_page(&self, key: SpillKey, page: &[u8]) -> EngineResult<()> {
        let mut state = self.state.lock();
        if matches!(state.handles.get(&key), Some(SpillHandle::Reader(_))) {
            return Err(EngineError::fatal(format!("spill writer requested for {key:?} while a reader is open")));
        }
        if !state.handles.contains_key(&key) {
            let file = OpenOptions::new().create(true).append(true).open(key.path(&self.working_dir))?;
            state.handles.insert(key.clone(), SpillHandle::Writer(file));
        }
        state.touch(&key);
        state.evict_if_over_capacity();
        match state.handles.get_mut(&key) {
            Some(SpillHandle::Writer(file)) => file.write_all(page).map_err(EngineError::from),
            _ => Err(EngineError::fatal(format!("spill handle for {key:?} was evicted mid-write"))),
        }
    }

    /// Reads back the entire spill file for `key`. Fails if a writer is
    /// still open for it.
    pub fn read_spilled(&self, key: &SpillKey) -> EngineResult<Vec<u8>> {
        let mut state = self.state.lock();
        if matches!(state.handles.get(key), Some(SpillHandle::Writer(_))) {
            return Err(EngineError::fatal(format!("spill reader requested for {key:?} while a writer is open")));
        }
        let file = OpenOptions::new().read(true).open(key.path(&self.working_dir))?;
        state.handles.insert(key.clone(), SpillHandle::Reader(file));
        state.touch(key);
        state.evict_if_over_capacity();
        let mut buf = Vec::new();
        if let Some(SpillHandle::Reader(file)) = state.handles.get_mut(key) {
            file.read_to_end(&mut buf)?;
        }
        Ok(buf)
    }

    /// Unlinks the spill file for `key` on slice deletion.
    pub fn delete(&self, key: &SpillKey) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.handles.remove(key);
        state.lru.retain(|k| k != key);
        let path = key.path(&self.working_dir);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
