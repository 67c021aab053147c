// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Buffer Manager Configuration
//!
//! Value objects for sizing the global buffer pool: segment size, pool
//! capacity, and the power-of-two alignment enforced on every segment.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// A power-of-two alignment no larger than a single page (4096 bytes on
/// every platform this engine targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment(usize);

impl Alignment {
    pub const PAGE_SIZE: usize = 4096;

    pub fn new(bytes: usize) -> Result<Self, EngineError> {
        if bytes == 0 || !bytes.is_power_of_two() {
            return Err(EngineError::invalid_configuration(format!(
                "alignment must be a power of two, got {bytes}"
            )));
        }
        if bytes > Self::PAGE_SIZE {
            return Err(EngineError::invalid_configuration(format!(
                "alignment {bytes} exceeds page size {}",
                Self::PAGE_SIZE
            )));
        }
        Ok(Self(bytes))
    }

    pub fn bytes(self) -> usize {
        self.0
    }

    /// Rounds `size` up to the next multiple of this alignment.
    pub fn align_up(self, size: usize) -> usize {
        let a = self.0;
        (size + a - 1) & !(a - 1)
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self(64)
    }
}

/// Sizing for the global buffer pool and its worker sub-pools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BufferPoolConfig {
    pub segment_size: usize,
    pub pool_capacity: usize,
    pub alignment: Alignment,
    /// Standby segments kept per unpooled size class before being freed.
    pub unpooled_standby_limit: usize,
}

impl BufferPoolConfig {
    pub const DEFAULT_SEGMENT_SIZE: usize = 4096;
    pub const DEFAULT_POOL_CAPACITY: usize = 1024;

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.segment_size == 0 {
            return Err(EngineError::invalid_configuration("segment_size must be > 0"));
        }
        if self.pool_capacity == 0 {
            return Err(EngineError::invalid_configuration("pool_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            segment_size: Self::DEFAULT_SEGMENT_SIZE,
            pool_capacity: Self::DEFAULT_POOL_CAPACITY,
            alignment: Alignment::default(),
            unpooled_standby_limit: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two() {
        assert!(Alignment::new(3).is_err());
    }

    #[test]
    fn rejects_alignment_above_page_size() {
        assert!(Alignment::new(8192).is_err());
    }

    #[test]
    fn align_up_rounds_correctly() {
        let a = Alignment::new(64).unwrap();
        assert_eq!(a.align_up(1), 64);
        assert_eq!(a.align_up(64), 64);
        assert_eq!(a.align_up(65), 128);
    }
}
