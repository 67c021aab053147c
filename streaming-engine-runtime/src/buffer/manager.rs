// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Buffer Manager
//!
//! The engine's allocator for tuple buffers (`spec.md` §4.1). Wraps the
//! global [`Pool`] and hands out [`TupleBuffer`] handles, each routed back
//! to its owning pool's recycle queue on drop. `BufferManager` is taken as
//! an injected object (`spec.md` §9, "Global mutable state") rather than a
//! process-wide singleton, so tests can construct independent pools.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use streaming_engine_domain::entities::{Segment, SegmentOrigin, SegmentRecycler, TupleBuffer};
use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::value_objects::{Alignment, BufferPoolConfig, OriginId};

use crate::buffer::pool::Pool;
use crate::buffer::subpool::SubPool;

/// Recycles a segment to whichever pool it was tagged with at carve time:
/// the global pool for `SegmentOrigin::Global` and unpooled segments (see
/// [`BufferManager::get_unpooled`]), or the matching sub-pool otherwise.
struct RoutingRecycler {
    global: Arc<Pool>,
    fixed: Mutex<HashMap<u32, Arc<SubPool>>>,
    local: Mutex<HashMap<u32, Arc<SubPool>>>,
    standby: Arc<Mutex<StandbyList>>,
    waiters: Arc<Waiters>,
}

impl SegmentRecycler for RoutingRecycler {
    fn recycle(&self, segment: Segment) {
        match segment.origin {
            SegmentOrigin::Global => {
                self.global.give_back(segment);
                // A blocked get_buffer_blocking/get_buffer_timeout caller
                // only ever waits on the global pool, so only this path
                // needs to wake one.
                self.waiters.condvar.notify_one();
            }
            SegmentOrigin::Fixed(id) => match self.fixed.lock().get(&id) {
                Some(sub) => sub.recycle(segment),
                None => drop(segment), // pool torn down already; let bytes drop.
            },
            SegmentOrigin::Local(id) => match self.local.lock().get(&id) {
                Some(sub) => sub.recycle(segment),
                None => drop(segment),
            },
            SegmentOrigin::Unpooled => self.standby.lock().give_back(segment),
        }
    }
}

/// Bounded, size-ordered free list of oversize segments, capped at `limit`
/// standby segments per size class before being dropped outright.
struct StandbyList {
    limit: usize,
    by_size: HashMap<usize, Vec<Segment>>,
}

impl StandbyList {
    fn new(limit: usize) -> Self {
        StandbyList { limit, by_size: HashMap::new() }
    }

    fn take(&mut self, size: usize) -> Option<Segment> {
        self.by_size.get_mut(&size).and_then(|v| v.pop())
    }

    fn give_back(&mut self, segment: Segment) {
        let bucket = self.by_size.entry(segment.capacity()).or_default();
        if bucket.len() < self.limit {
            bucket.push(segment);
        }
        // else: drop it, freeing the memory - the standby cap exists
        // precisely so a burst of distinct oversize requests doesn't pin
        // memory forever.
    }
}

/// Wakes blocked `get_buffer_blocking` callers whenever a segment is
/// returned to the global pool.
#[derive(Default)]
struct Waiters {
    condvar: Condvar,
}

static NEXT_SUBPOOL_ID: AtomicU32 = AtomicU32::new(0);

pub struct BufferManager {
    global: Arc<Pool>,
    recycler: Arc<RoutingRecycler>,
    waiters: Arc<Waiters>,
    wait_lock: Mutex<()>,
    origin: OriginId,
}

impl BufferManager {
    pub fn new(config: BufferPoolConfig, origin: OriginId) -> EngineResult<Self> {
        config.validate()?;
        let global = Arc::new(Pool::new(SegmentOrigin::Global, config.pool_capacity, config.segment_size, config.alignment));
        let waiters = Arc::new(Waiters::default());
        let recycler = Arc::new(RoutingRecycler {
            global: global.clone(),
            fixed: Mutex::new(HashMap::new()),
            local: Mutex::new(HashMap::new()),
            standby: Arc::new(Mutex::new(StandbyList::new(config.unpooled_standby_limit))),
            waiters: waiters.clone(),
        });
        Ok(BufferManager { global, recycler, waiters, wait_lock: Mutex::new(()), origin })
    }

    pub fn alignment(&self) -> Alignment {
        self.global.alignment()
    }

    pub fn segment_size(&self) -> usize {
        self.global.segment_size()
    }

    pub fn pool_capacity(&self) -> usize {
        self.global.capacity()
    }

    pub fn available(&self) -> usize {
        self.global.available()
    }

    pub fn in_flight(&self) -> usize {
        self.global.in_flight()
    }

    fn wrap(&self, segment: Segment, origin: OriginId) -> TupleBuffer {
        TupleBuffer::new(segment, self.recycler.clone() as Arc<dyn SegmentRecycler>, origin)
    }

    /// Waits until a buffer is available. Never returns `None`; callers
    /// that cannot wait should use [`Self::get_buffer_nowait`] or
    /// [`Self::get_buffer_timeout`] instead.
    pub fn get_buffer_blocking(&self) -> TupleBuffer {
        loop {
            if let Some(segment) = self.global.try_take() {
                return self.wrap(segment, self.origin);
            }
            tracing::trace!(target: "buffer_manager", "get_buffer_blocking waiting: pool exhausted");
            let guard = self.wait_lock.lock();
            // Re-check under the lock in case a recycle raced us between
            // the failed `try_take` above and acquiring `guard`.
            if self.global.available() > 0 {
                continue;
            }
            let mut guard = guard;
            self.waiters.condvar.wait_for(&mut guard, Duration::from_millis(5));
        }
    }

    pub fn get_buffer_nowait(&self) -> Option<TupleBuffer> {
        self.global.try_take().map(|s| self.wrap(s, self.origin))
    }

    pub fn get_buffer_timeout(&self, timeout: Duration) -> Option<TupleBuffer> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(segment) = self.global.try_take() {
                return Some(self.wrap(segment, self.origin));
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let guard = self.wait_lock.lock();
            if self.global.available() > 0 {
                continue;
            }
            let mut guard = guard;
            self.waiters.condvar.wait_for(&mut guard, (deadline - now).min(Duration::from_millis(5)));
        }
    }

    /// Oversize path: reuses a standby segment of exactly `size` bytes if
    /// one exists, else allocates fresh.
    pub fn get_unpooled(&self, size: usize) -> TupleBuffer {
        let size = self.global.alignment().align_up(size);
        let segment = self.recycler.standby.lock().take(size).unwrap_or_else(|| Segment::new(SegmentOrigin::Unpooled, size));
        self.wrap(segment, self.origin)
    }

    /// Carves `reserved` segments from the global pool into a new fixed
    /// sub-pool and registers it with the recycler so drops route back to
    /// it. Returns the sub-pool's id for [`Self::get_from_fixed_pool`].
    pub fn create_fixed_pool(&self, reserved: usize) -> EngineResult<u32> {
        let id = NEXT_SUBPOOL_ID.fetch_add(1, Ordering::Relaxed);
        let sub = Arc::new(SubPool::carve(&self.global, SegmentOrigin::Fixed(id), reserved)?);
        self.recycler.fixed.lock().insert(id, sub);
        Ok(id)
    }

    pub fn create_local_pool(&self, reserved: usize) -> EngineResult<u32> {
        let id = NEXT_SUBPOOL_ID.fetch_add(1, Ordering::Relaxed);
        let sub = Arc::new(SubPool::carve(&self.global, SegmentOrigin::Local(id), reserved)?);
        self.recycler.local.lock().insert(id, sub);
        Ok(id)
    }

    /// Pulls from a fixed sub-pool, falling back to the global pool if the
    /// sub-pool is momentarily exhausted (the sub-pool only makes steady
    /// reuse cheap; it does not change the liveness guarantee of the
    /// global pool).
    pub fn get_from_fixed_pool(&self, pool_id: u32) -> EngineResult<TupleBuffer> {
        self.get_from_sub(&self.recycler.fixed, pool_id)
    }

    pub fn get_from_local_pool(&self, pool_id: u32) -> EngineResult<TupleBuffer> {
        self.get_from_sub(&self.recycler.local, pool_id)
    }

    fn get_from_sub(&self, table: &Mutex<HashMap<u32, Arc<SubPool>>>, pool_id: u32) -> EngineResult<TupleBuffer> {
        let sub = table.lock().get(&pool_id).cloned().ok_or_else(|| EngineError::invalid_configuration(format!("no sub-pool with id {pool_id}")))?;
        if let Some(segment) = sub.try_take() {
            return Ok(self.wrap(segment, self.origin));
        }
        Ok(self.wrap(self.global.try_take().unwrap_or_else(|| self.global_blocking_segment()), self.origin))
    }

    fn global_blocking_segment(&self) -> Segment {
        loop {
            if let Some(segment) = self.global.try_take() {
                return segment;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Fails if any segment checked out of the global pool has not been
    /// returned - the only way to catch a leak (`spec.md` §4.1, §8
    /// scenario 6).
    pub fn shutdown(&self) -> EngineResult<()> {
        let in_flight = self.global.in_flight();
        if in_flight > 0 {
            return Err(EngineError::fatal(format!("buffer pool shutdown with {in_flight} outstanding segment(s)")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(capacity: usize) -> BufferManager {
        let config = BufferPoolConfig { segment_size: 64, pool_capacity: capacity, ..Default::default() };
        BufferManager::new(config, OriginId::new(1)).unwrap()
    }

    #[test]
    fn buffer_conservation_holds_across_take_and_drop() {
        let mgr = manager(4);
        let a = mgr.get_buffer_nowait().unwrap();
        let b = mgr.get_buffer_nowait().unwrap();
        assert_eq!(mgr.available() + mgr.in_flight(), 4);
        drop(a);
        drop(b);
        assert_eq!(mgr.available(), 4);
        mgr.shutdown().unwrap();
    }

    #[test]
    fn nowait_returns_none_when_exhausted() {
        let mgr = manager(1);
        let _buf = mgr.get_buffer_nowait().unwrap();
        assert!(mgr.get_buffer_nowait().is_none());
    }

    #[test]
    fn timeout_returns_none_on_sustained_exhaustion() {
        let mgr = manager(1);
        let _buf = mgr.get_buffer_nowait().unwrap();
        assert!(mgr.get_buffer_timeout(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn blocking_unblocks_once_a_buffer_is_returned() {
        let mgr = Arc::new(manager(1));
        let held = mgr.get_buffer_nowait().unwrap();
        let mgr2 = mgr.clone();
        let handle = std::thread::spawn(move || {
            let buf = mgr2.get_buffer_blocking();
            drop(buf);
        });
        std::thread::sleep(Duration::from_millis(10));
        drop(held);
        handle.join().unwrap();
    }

    /// The wait loop re-polls every 5ms as a safety net, but a release
    /// must wake a blocked waiter via the condvar, not leave it to the
    /// next poll tick - this pins the recycle-side `notify_one` call in
    /// place against a regression back to pure polling.
    #[test]
    fn recycle_wakes_a_blocked_waiter_promptly() {
        let mgr = Arc::new(manager(1));
        let held = mgr.get_buffer_nowait().unwrap();
        let mgr2 = mgr.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _buf = mgr2.get_buffer_blocking();
            tx.send(Instant::now()).unwrap();
        });
        std::thread::sleep(Duration::from_millis(20));
        let dropped_at = Instant::now();
        drop(held);
        let woken_at = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let latency = woken_at.saturating_duration_since(dropped_at);
        assert!(latency < Duration::from_millis(4), "expected a condvar wakeup well under the 5ms poll interval, got {latency:?}");
    }

    #[test]
    fn unpooled_reuses_standby_of_exact_size() {
        let mgr = manager(2);
        let buf = mgr.get_unpooled(1000);
        let size = buf.capacity();
        drop(buf);
        let buf2 = mgr.get_unpooled(1000);
        assert_eq!(buf2.capacity(), size);
    }

    #[test]
    fn shutdown_fails_on_leaked_segment() {
        let mgr = manager(2);
        let leaked = mgr.get_buffer_nowait().unwrap();
        let err = mgr.shutdown().unwrap_err();
        assert_eq!(err.category(), "fatal");
        drop(leaked);
        mgr.shutdown().unwrap();
    }

    #[test]
    fn fixed_pool_recycles_to_itself() {
        let mgr = manager(8);
        let pool_id = mgr.create_fixed_pool(2).unwrap();
        assert_eq!(mgr.available(), 6);
        let buf = mgr.get_from_fixed_pool(pool_id).unwrap();
        drop(buf);
        assert_eq!(mgr.available(), 6, "sub-pool reuse must not touch the global free list");
    }
}
