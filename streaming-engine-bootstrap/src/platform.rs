// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction
//!
//! OS-specific operations behind one trait, selected at compile time:
//! `UnixPlatform` for Linux/macOS, `WindowsPlatform` for Windows. Keeps
//! `#[cfg]` confined to this module instead of scattered through the
//! runtime crate.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not supported on this platform: {0}")]
    NotSupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform error: {0}")]
    Other(String),
}

/// Platform abstraction trait for OS-specific operations.
#[async_trait]
pub trait Platform: Send + Sync {
    /// System page size, used to size the buffer manager's segment
    /// alignment (`spec.md` §4.1).
    fn page_size(&self) -> usize;

    /// Logical CPU count, used to size the default worker pool.
    fn cpu_count(&self) -> usize;

    fn total_memory(&self) -> Result<u64, PlatformError>;

    fn available_memory(&self) -> Result<u64, PlatformError>;

    fn line_separator(&self) -> &'static str;

    fn path_separator(&self) -> char;

    fn platform_name(&self) -> &'static str;

    fn temp_dir(&self) -> PathBuf;

    fn is_elevated(&self) -> bool;

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError>;

    fn is_executable(&self, path: &Path) -> bool;

    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError>;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

/// Returns the platform implementation for the current OS, selected at
/// compile time.
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_platform() {
        let platform = create_platform();
        assert!(platform.cpu_count() >= 1);
        let page_size = platform.page_size();
        assert!(page_size >= 512);
        assert!(page_size <= 65536);
        assert!(!platform.platform_name().is_empty());
    }

    #[test]
    fn test_line_separator() {
        let platform = create_platform();
        let sep = platform.line_separator();
        #[cfg(unix)]
        assert_eq!(sep, "\n");
        #[cfg(windows)]
        assert_eq!(sep, "\r\n");
    }
}
