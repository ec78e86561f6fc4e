//! Startup errors of the agent.
//!
//! Everything in [`ConfigError`] is fatal: it is reported before the watcher
//! is started, and the process exits.

use camino::Utf8PathBuf;

/// Why the agent configuration could not be loaded or accepted.
///
/// # Examples
///
/// ```
/// use ac_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::NotARepository(Utf8PathBuf::from("/srv/site"));
/// assert!(error.to_string().contains("/srv/site"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The directory to watch does not exist or is not a directory.
    #[error("watch root is not a directory: {0}")]
    WatchRootMissing(Utf8PathBuf),

    /// The repository path has no `.git` entry.
    #[error("not a git working tree: {0}")]
    NotARepository(Utf8PathBuf),

    /// An option is out of range.
    #[error("invalid option '{option}': {reason}")]
    InvalidOption {
        /// Option name as it appears in the configuration file.
        option: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        /// The file.
        path: Utf8PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`AgentConfig`](crate::AgentConfig).
    #[error("cannot parse configuration file {path}: {source}")]
    Parse {
        /// The file.
        path: Utf8PathBuf,
        /// The JSON error, with line and column.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
