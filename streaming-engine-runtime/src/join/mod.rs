// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Windowed stream join: build-side accumulation, interval lifecycle,
//! probe emission, and the memory controller's spill-to-disk path
//! (`spec.md` §4.6, §4.6a).

pub mod handler;
pub mod hash;
pub mod memory_controller;
pub mod strategy;

pub use handler::JoinHandler;
pub use hash::VarSizedLocalTable;
pub use memory_controller::{MemoryController, SpillKey};
pub use strategy::{hash_probe, HashBuildSide, JoinStrategy};
