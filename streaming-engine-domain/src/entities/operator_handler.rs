// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Operator Handler
//!
//! Named per-pipeline mutable state (hash tables, slice stores, watermark
//! trackers) accessed from pipeline code by a stable index rather than by
//! name or type. Handlers are created at pipeline setup and destroyed at
//! pipeline stop.
//!
//! ## Breaking the Cycle
//!
//! A handler conceptually wants to reference the pipeline context that owns
//! it, and the context owns the handler array - a reference cycle. This is
//! avoided the way the design notes prescribe: the context hands out
//! `HandlerIndex` values, never long-lived references. A handler that needs
//! to talk to the context again receives it as a parameter on the call that
//! needs it, instead of holding onto it.

use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerIndex(pub usize);

/// Per-pipeline mutable state. All concurrent access to a handler must be
/// either single-writer or internally synchronized by the handler itself
/// (the discipline is documented per operator: a global-locking hash join
/// handler serializes internally; a local hash join handler is
/// partitioned per worker and needs no lock at all).
pub trait OperatorHandler: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Blanket impl so any `Send + Sync + 'static` type can be stored as a
/// handler without hand-writing the boilerplate downcast methods.
impl<T: Any + Send + Sync> OperatorHandler for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The handler array a pipeline's context owns. Indices are stable for the
/// pipeline's lifetime; handlers are dropped (running any `Drop` impls,
/// e.g. flushing a memory controller's open spill writers) when the table
/// is dropped at `terminate`.
#[derive(Default)]
pub struct HandlerTable {
    handlers: Vec<Box<dyn OperatorHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn OperatorHandler>) -> HandlerIndex {
        self.handlers.push(handler);
        HandlerIndex(self.handlers.len() - 1)
    }

    pub fn get<T: Any>(&self, index: HandlerIndex) -> Option<&T> {
        self.handlers.get(index.0).and_then(|h| h.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, index: HandlerIndex) -> Option<&mut T> {
        self.handlers.get_mut(index.0).and_then(|h| h.as_any_mut().downcast_mut::<T>())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u64);

    #[test]
    fn round_trips_through_stable_index() {
        let mut table = HandlerTable::new();
        let idx = table.register(Box::new(Counter(0)));
        table.get_mut::<Counter>(idx).unwrap().0 += 1;
        assert_eq!(table.get::<Counter>(idx).unwrap().0, 1);
    }

    #[test]
    fn wrong_type_downcast_is_none() {
        let mut table = HandlerTable::new();
        let idx = table.register(Box::new(Counter(0)));
        assert!(table.get::<u32>(idx).is_none());
    }
}
