//! Configuration structures for the autocommit agent.
//!
//! This module provides configuration types for every component of the agent:
//!
//! - [`WatchConfig`] - What to watch (root, extensions, ignored directories)
//! - [`ScheduleConfig`] - When to commit (debounce interval, max-wait)
//! - [`CommitConfig`] - Where to commit (repository, remote, push toggle)
//! - [`AgentConfig`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs the fields it
//! overrides.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extensions::ExtensionSet;

/// Largest accepted debounce interval or max-wait bound, in seconds (30 days).
pub const MAX_SCHEDULE_SECS: u64 = 30 * 24 * 60 * 60;

/// Directory names that are never watched.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[".git", "node_modules", "logs", "tmp", "temp"];

/// Configuration for the directory watcher.
///
/// # Examples
///
/// ```
/// use ac_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.root.as_str(), ".");
/// assert_eq!(config.extensions, vec![".asp"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Root of the directory tree to watch.
    pub root: Utf8PathBuf,

    /// Extensions of files whose changes are committed (leading dot optional).
    pub extensions: Vec<String>,

    /// Directory names skipped when registering watches.
    pub ignored_dirs: Vec<String>,
}

impl WatchConfig {
    /// Builds the normalized [`ExtensionSet`] for this configuration.
    #[must_use]
    pub fn extension_set(&self) -> ExtensionSet {
        self.extensions.iter().collect()
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            extensions: vec![".asp".to_owned()],
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|d| (*d).to_owned()).collect(),
        }
    }
}

/// Configuration for the commit scheduler.
///
/// # Examples
///
/// ```
/// use ac_core::ScheduleConfig;
/// use std::time::Duration;
///
/// let config = ScheduleConfig { interval_secs: 2, max_wait_secs: 0 };
/// assert_eq!(config.interval(), Duration::from_secs(2));
/// assert_eq!(config.max_wait(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Quiet period, in seconds, after the last change before committing.
    pub interval_secs: u64,

    /// Upper bound, in seconds, from the first change of a batch to its commit.
    ///
    /// Zero or negative disables the bound.
    pub max_wait_secs: i64,
}

impl ScheduleConfig {
    /// Returns the debounce interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Returns the max-wait bound, or `None` when it is disabled.
    #[must_use]
    pub fn max_wait(&self) -> Option<Duration> {
        u64::try_from(self.max_wait_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 180,
            max_wait_secs: 900,
        }
    }
}

/// Configuration for the commit executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    /// Path to the git working tree commits are made in.
    pub repo: Utf8PathBuf,

    /// Remote to push to. `None` runs a plain `git push`.
    pub remote: Option<String>,

    /// Whether to push after each successful commit.
    pub push: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            repo: Utf8PathBuf::from("."),
            remote: None,
            push: true,
        }
    }
}

/// Root configuration for the autocommit agent.
///
/// # Examples
///
/// ```
/// use ac_core::AgentConfig;
///
/// let config: AgentConfig =
///     serde_json::from_str(r#"{"schedule": {"interval_secs": 30}}"#).unwrap();
/// assert_eq!(config.schedule.interval_secs, 30);
/// assert_eq!(config.schedule.max_wait_secs, 900);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Directory watcher configuration.
    pub watch: WatchConfig,

    /// Commit scheduling configuration.
    pub schedule: ScheduleConfig,

    /// Commit executor configuration.
    pub commit: CommitConfig,

    /// Enables debug-level logging.
    pub verbose: bool,
}

impl AgentConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields keep their default values.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks everything that must hold before the agent starts watching.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidOption`] if the interval is zero, either
    ///   schedule bound exceeds [`MAX_SCHEDULE_SECS`], or no extension
    ///   survives normalization
    /// - [`ConfigError::WatchRootMissing`] if the watch root is not a directory
    /// - [`ConfigError::NotARepository`] if the repository has no `.git` entry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::invalid_option(
                "interval_secs",
                "must be greater than zero",
            ));
        }

        let ceiling = format!("must not exceed {MAX_SCHEDULE_SECS} seconds");
        if self.schedule.interval_secs > MAX_SCHEDULE_SECS {
            return Err(ConfigError::invalid_option("interval_secs", ceiling));
        }
        if u64::try_from(self.schedule.max_wait_secs).is_ok_and(|secs| secs > MAX_SCHEDULE_SECS) {
            return Err(ConfigError::invalid_option("max_wait_secs", ceiling));
        }

        if self.watch.extension_set().is_empty() {
            return Err(ConfigError::invalid_option(
                "extensions",
                "at least one extension is required",
            ));
        }

        if !self.watch.root.is_dir() {
            return Err(ConfigError::WatchRootMissing(self.watch.root.clone()));
        }

        // `.git` is a file inside linked worktrees and submodules
        if !self.commit.repo.join(".git").exists() {
            return Err(ConfigError::NotARepository(self.commit.repo.clone()));
        }

        Ok(())
    }
}
