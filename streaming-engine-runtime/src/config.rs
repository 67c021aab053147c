// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `STREAMING_ENGINE_*` environment variables, each overriding the
//! last - the same three-source precedence the teacher's infrastructure
//! config layer documents, built here with the `config` crate directly
//! rather than a hand-rolled source abstraction.

use std::path::Path;

use serde::{Deserialize, Serialize};
use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::value_objects::{Alignment, BufferPoolConfig};

use crate::source::{FramingScheme, TcpSourceConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub num_workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig { num_workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    pub segment_size: usize,
    pub pool_capacity: usize,
    pub alignment: usize,
    pub unpooled_standby_limit: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        let defaults = BufferPoolConfig::default();
        BufferConfig {
            segment_size: defaults.segment_size,
            pool_capacity: defaults.pool_capacity,
            alignment: defaults.alignment.bytes(),
            unpooled_standby_limit: defaults.unpooled_standby_limit,
        }
    }
}

impl BufferConfig {
    pub fn to_domain(&self) -> EngineResult<BufferPoolConfig> {
        Ok(BufferPoolConfig {
            segment_size: self.segment_size,
            pool_capacity: self.pool_capacity,
            alignment: Alignment::new(self.alignment)
                .map_err(|e| EngineError::invalid_configuration(format!("buffer alignment: {e}")))?,
            unpooled_standby_limit: self.unpooled_standby_limit,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SinkConfig {
    /// `"null"` to discard, or a file path to append to.
    pub target: Option<String>,
}

/// Top-level engine configuration, the root of `config`'s merged tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    pub tcp_source: Option<TcpSourceConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            log_level: LogLevel::default(),
            worker: WorkerConfig::default(),
            buffer: BufferConfig::default(),
            sink: SinkConfig::default(),
            tcp_source: None,
        }
    }
}

/// Loads configuration from built-in defaults, an optional TOML file, then
/// `STREAMING_ENGINE_*` environment variables, in that precedence order.
pub fn load(file: Option<&Path>) -> EngineResult<EngineConfig> {
    let defaults = EngineConfig::default();
    let defaults_json = serde_json::to_value(&defaults)?;

    let mut builder = config::Config::builder()
        .add_source(config::File::from_str(&defaults_json.to_string(), config::FileFormat::Json));

    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(config::Environment::with_prefix("STREAMING_ENGINE").separator("__"));

    let merged = builder.build().map_err(|e| EngineError::invalid_configuration(format!("loading configuration: {e}")))?;

    merged.try_deserialize().map_err(|e| EngineError::invalid_configuration(format!("deserializing configuration: {e}")))
}

/// Validates a config file without constructing any runtime state; used by
/// the `validate` CLI command.
pub fn validate_file(path: &Path) -> EngineResult<()> {
    let config = load(Some(path))?;
    config.buffer.to_domain()?;
    if let Some(tcp) = &config.tcp_source {
        if tcp.host.is_empty() {
            return Err(EngineError::invalid_configuration("tcp_source.host must not be empty"));
        }
        if matches!(tcp.framing, FramingScheme::FixedSize) && tcp.fixed_message_size == 0 {
            return Err(EngineError::invalid_configuration("tcp_source.fixed_message_size must be nonzero for fixed-size framing"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_file() {
        let config = load(None).unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.worker.num_workers > 0);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("streaming-engine-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.toml");
        std::fs::write(&path, "log_level = \"debug\"\n\n[worker]\nnum_workers = 2\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.worker.num_workers, 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn buffer_config_rejects_non_power_of_two_alignment() {
        let config = BufferConfig { alignment: 3, ..BufferConfig::default() };
        assert!(config.to_domain().is_err());
    }
}
