// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Origin Identifier
//!
//! An origin is a logical producer: the unit over which sequence numbers and
//! watermarks are defined. Origin ids are allocated outside the core (by the
//! coordinator placing a query across the cluster); this module only
//! validates that they are unique where the core can actually observe a
//! collision - at network channel registration (see
//! `streaming_engine_runtime::network::registry`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a logical producer of tuple buffers.
///
/// `OriginId` is intentionally a bare `u64` newtype rather than a generated
/// identity (contrast `uuid`/`ulid`-backed ids in file-oriented systems):
/// allocation authority lives outside the core, and the core's only job is to
/// use the id consistently as a map key and to validate uniqueness where it
/// can observe a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginId(pub u64);

impl OriginId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "origin-{}", self.0)
    }
}

impl From<u64> for OriginId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_u64() {
        let id = OriginId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(OriginId::from(42), id);
    }

    #[test]
    fn orders_numerically() {
        assert!(OriginId::new(1) < OriginId::new(2));
    }
}
