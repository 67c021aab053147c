// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! Parses with `clap`, then runs every path/string argument through
//! [`SecureArgParser`] before it reaches engine configuration - the same
//! two-stage parse-then-validate split the teacher's bootstrap layer uses,
//! collapsed to one file since this engine's CLI surface is a single `run`
//! command rather than a dozen pipeline-management subcommands.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;

const MAX_ARG_LENGTH: usize = 1000;
const MAX_PATH_LENGTH: usize = 4096;

const DANGEROUS_PATTERNS: &[&str] = &["..", "~", "$", "`", ";", "&", "|", ">", "<", "\n", "\r", "\0"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("argument too long (max {MAX_ARG_LENGTH} characters): {0}")]
    ArgumentTooLong(String),

    #[error("dangerous pattern '{pattern}' detected in argument: {arg}")]
    DangerousPattern { pattern: String, arg: String },

    #[error("path exceeds maximum length (max {MAX_PATH_LENGTH})")]
    PathTooLong,

    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid value for {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

/// Security-first argument validation: length limits, dangerous-pattern
/// rejection, and path canonicalization.
pub struct SecureArgParser;

impl SecureArgParser {
    pub fn validate_argument(arg: &str) -> Result<(), ParseError> {
        if arg.len() > MAX_ARG_LENGTH {
            return Err(ParseError::ArgumentTooLong(arg.chars().take(50).collect::<String>() + "..."));
        }
        for pattern in DANGEROUS_PATTERNS {
            if arg.contains(pattern) {
                return Err(ParseError::DangerousPattern { pattern: pattern.to_string(), arg: arg.to_string() });
            }
        }
        Ok(())
    }

    /// Validates and canonicalizes a path that must already exist (the
    /// engine's config file).
    pub fn validate_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path).map_err(|e| match e {
            ParseError::ArgumentTooLong(_) => ParseError::InvalidPath(format!("path too long: {path}")),
            ParseError::DangerousPattern { pattern, .. } => {
                ParseError::InvalidPath(format!("path contains dangerous pattern '{pattern}': {path}"))
            }
            other => other,
        })?;

        let path_obj = Path::new(path);
        let canonical = path_obj.canonicalize().map_err(|e| {
            if !path_obj.exists() {
                ParseError::PathNotFound(path.to_string())
            } else {
                ParseError::InvalidPath(format!("{path}: {e}"))
            }
        })?;

        if canonical.to_string_lossy().len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }
        Ok(canonical)
    }
}

#[derive(Parser, Debug)]
#[command(name = "streaming-engine", about = "Distributed stream-processing engine runtime")]
pub struct Cli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the engine against a configuration file
    Run {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: PathBuf,

        /// Override the worker pool size
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Validates a configuration file without starting the engine
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run { config: PathBuf, workers: Option<usize> },
    Validate { config: PathBuf },
}

/// Parses CLI arguments with `clap`, then validates every path/numeric
/// argument before returning.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate_cli(parse_cli())
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let command = match cli.command {
        Commands::Run { config, workers } => {
            let validated_config = SecureArgParser::validate_path(&config.to_string_lossy())?;
            if let Some(w) = workers {
                if w == 0 || w > 1024 {
                    return Err(ParseError::InvalidValue { arg: "workers".to_string(), reason: "must be between 1 and 1024".to_string() });
                }
            }
            ValidatedCommand::Run { config: validated_config, workers }
        }
        Commands::Validate { config } => {
            let validated_config = SecureArgParser::validate_path(&config.to_string_lossy())?;
            ValidatedCommand::Validate { config: validated_config }
        }
    };

    Ok(ValidatedCli { command, verbose: cli.verbose })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_argument_rejects_path_traversal() {
        assert!(matches!(SecureArgParser::validate_argument("../etc/passwd"), Err(ParseError::DangerousPattern { .. })));
    }

    #[test]
    fn validate_argument_accepts_plain_string() {
        assert!(SecureArgParser::validate_argument("my-pipeline").is_ok());
    }

    #[test]
    fn validate_path_rejects_missing_file() {
        assert!(matches!(SecureArgParser::validate_path("/no/such/path/config.toml"), Err(ParseError::PathNotFound(_))));
    }

    #[test]
    fn validate_path_accepts_existing_file() {
        let dir = std::env::temp_dir().join(format!("streaming-engine-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("config.toml");
        std::fs::write(&file, "[engine]\n").unwrap();

        let result = SecureArgParser::validate_path(&file.to_string_lossy());
        assert!(result.is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }
}
