// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Channel Registry
//!
//! Tracks the partitions (channels) a receiver knows about, answering the
//! `ANNOUNCE -> READY` handshake of `spec.md` §4.7: each channel has a
//! stable string id registered at both ends before any data flows.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyResponse {
    Ready,
    PartitionNotRegistered,
    DeletedPartition,
    VersionMismatch,
}

struct Partition {
    version: u32,
    deleted: bool,
}

/// Reader-dominated registry of known channels - `spec.md` §5 calls out a
/// reader-writer lock here specifically because readers (announce checks)
/// vastly outnumber writers (register/delete/migrate).
#[derive(Default)]
pub struct ChannelRegistry {
    partitions: RwLock<HashMap<String, Partition>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_partition(&self, channel_id: impl Into<String>, version: u32) {
        self.partitions.write().insert(channel_id.into(), Partition { version, deleted: false });
    }

    /// Answers a sender's `ANNOUNCE` for `channel_id` at `version`.
    pub fn announce(&self, channel_id: &str, version: u32) -> ReadyResponse {
        match self.partitions.read().get(channel_id) {
            None => ReadyResponse::PartitionNotRegistered,
            Some(p) if p.deleted => ReadyResponse::DeletedPartition,
            Some(p) if p.version != version => ReadyResponse::VersionMismatch,
            Some(_) => ReadyResponse::Ready,
        }
    }

    /// Marks a channel deleted without removing its bookkeeping entry, so a
    /// late announce still gets a meaningful `DeletedPartition` answer
    /// instead of `PartitionNotRegistered`.
    pub fn delete(&self, channel_id: &str) {
        if let Some(p) = self.partitions.write().get_mut(channel_id) {
            p.deleted = true;
        }
    }

    /// Migrates a channel to a new version - the drain-EOS path of
    /// `spec.md` §4.7 that moves a channel instead of tearing it down.
    pub fn migrate(&self, channel_id: &str, new_version: u32) -> bool {
        match self.partitions.write().get_mut(channel_id) {
            Some(p) if !p.deleted => {
                p.version = new_version;
                true
            }
            _ => false,
        }
    }
}
