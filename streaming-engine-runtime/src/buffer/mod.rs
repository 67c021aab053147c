// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Buffer Manager
//!
//! Allocates fixed-size tuple buffers without touching the OS allocator on
//! the hot path (`spec.md` §4.1). A global [`pool::Pool`] backs every
//! allocation; worker-local sub-pools ([`subpool::SubPool`]) carve a slice
//! of the global pool out for cheap, contention-free reuse within one
//! worker, and an unpooled path ([`manager::BufferManager::get_unpooled`])
//! serves oversize requests from a bounded size-ordered standby list.

pub mod manager;
pub mod pool;
pub mod subpool;

pub use manager::BufferManager;
pub use pool::Pool;
pub use subpool::SubPool;
