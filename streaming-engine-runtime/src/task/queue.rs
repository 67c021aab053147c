// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Task Queue
//!
//! FIFO dispatch of `(TupleBuffer, pipeline)` tasks to worker threads, plus
//! a delayed re-enqueue path for `ctx.repeat_task(buffer, delay)`
//! (`spec.md` §4.2) used by backpressured sinks and operators retrying a
//! pending buffer-manager wait.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use streaming_engine_domain::entities::TupleBuffer;
use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::value_objects::PipelineId;

/// The unit of work dispatched to a worker thread.
pub struct Task {
    pub buffer: TupleBuffer,
    pub pipeline: PipelineId,
}

struct DelayedTask {
    due: Instant,
    task: Task,
}

impl PartialEq for DelayedTask {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due
    }
}
impl Eq for DelayedTask {}
impl PartialOrd for DelayedTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for DelayedTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed so `BinaryHeap` (a max-heap) pops the *earliest* due
        // task first.
        other.due.cmp(&self.due)
    }
}

#[derive(Default)]
struct DelayState {
    heap: Mutex<BinaryHeap<DelayedTask>>,
    woken: Condvar,
}

/// A FIFO task queue with admission control for graceful/forced stop
/// (`spec.md` §4.2 cancellation).
pub struct TaskQueue {
    sender: crossbeam::channel::Sender<Task>,
    receiver: crossbeam::channel::Receiver<Task>,
    delay: Arc<DelayState>,
    draining: AtomicBool,
    delay_thread_stop: Arc<AtomicBool>,
}

impl TaskQueue {
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = crossbeam::channel::unbounded();
        let queue = Arc::new(TaskQueue {
            sender,
            receiver,
            delay: Arc::new(DelayState::default()),
            draining: AtomicBool::new(false),
            delay_thread_stop: Arc::new(AtomicBool::new(false)),
        });
        queue.spawn_delay_thread();
        queue
    }

    fn spawn_delay_thread(self: &Arc<Self>) {
        let queue = self.clone();
        std::thread::Builder::new()
            .name("task-queue-delay".to_string())
            .spawn(move || loop {
                if queue.delay_thread_stop.load(Ordering::Acquire) {
                    return;
                }
                let mut heap = queue.delay.heap.lock();
                match heap.peek() {
                    None => {
                        queue.delay.woken.wait_for(&mut heap, Duration::from_millis(50));
                    }
                    Some(next) => {
                        let now = Instant::now();
                        if next.due <= now {
                            let due = heap.pop().unwrap();
                            drop(heap);
                            // A full queue push is infallible for an
                            // unbounded channel; the receiver side
                            // existing for the queue's whole lifetime.
                            let _ = queue.sender.send(due.task);
                        } else {
                            queue.delay.woken.wait_for(&mut heap, next.due - now);
                        }
                    }
                }
            })
            .expect("failed to spawn task-queue delay thread");
    }

    /// Enqueues a task for immediate dispatch. Rejected once the queue is
    /// draining (`spec.md` §4.2: "no new source tasks are admitted").
    pub fn push(&self, task: Task) -> EngineResult<()> {
        if self.draining.load(Ordering::Acquire) {
            return Err(EngineError::end_of_stream("task queue is draining, no new tasks admitted"));
        }
        self.sender.send(task).map_err(|_| EngineError::fatal("task queue receiver dropped while queue was live"))
    }

    /// Re-enqueues `task` after `delay` has elapsed.
    pub fn push_delayed(&self, task: Task, delay: Duration) -> EngineResult<()> {
        if self.draining.load(Ordering::Acquire) {
            return Err(EngineError::end_of_stream("task queue is draining, no new tasks admitted"));
        }
        let mut heap = self.delay.heap.lock();
        heap.push(DelayedTask { due: Instant::now() + delay, task });
        self.delay.woken.notify_one();
        Ok(())
    }

    /// Blocks the calling worker thread until a task is available or the
    /// queue is closed.
    pub fn pop_blocking(&self) -> Option<Task> {
        self.receiver.recv().ok()
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<Task> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Transitions to draining: no further `push`/`push_delayed` calls
    /// succeed. In-flight tasks already queued still run to completion.
    pub fn begin_drain(&self) {
        self.draining.store(true, Ordering::Release);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn pending_len(&self) -> usize {
        self.receiver.len()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.delay_thread_stop.store(true, Ordering::Release);
        self.delay.woken.notify_all();
    }
}
