//! Core types, errors, and configuration for the autocommit agent.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`AgentConfig`] and its sections, loadable from JSON
//! - [`ConfigError`] for configuration and startup validation failures
//! - [`ExtensionSet`], the normalized set of file extensions worth committing

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extensions;

pub use config::{AgentConfig, CommitConfig, MAX_SCHEDULE_SECS, ScheduleConfig, WatchConfig};
pub use error::ConfigError;
pub use extensions::ExtensionSet;
