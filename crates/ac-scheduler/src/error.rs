//! Error types for the ac-scheduler crate.
//!
//! This module provides [`CommitError`], the structured failure of one flush
//! attempt. It always names the [`CommitStage`] that failed and keeps whatever
//! the VCS printed, so the log line alone is enough to diagnose the failure.

use std::fmt;

/// The step of the commit pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitStage {
    /// Staging the batch (`git add`).
    Stage,
    /// Querying staged differences.
    Status,
    /// Creating the commit.
    Commit,
    /// Pushing to the remote.
    Push,
}

impl CommitStage {
    /// Returns the stage name as used in log output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stage => "add",
            Self::Status => "status",
            Self::Commit => "commit",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A failed flush attempt.
///
/// None of these are fatal to the agent: the scheduler logs them and moves on
/// to the next batch. A [`CommitStage::Push`] failure means the local commit
/// exists but the remote is behind.
///
/// # Examples
///
/// ```
/// use ac_scheduler::{CommitError, CommitStage};
///
/// let err = CommitError::failed(CommitStage::Push, "fatal: could not read from remote");
/// assert_eq!(err.stage(), CommitStage::Push);
/// assert!(err.to_string().contains("git push failed"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// The VCS ran and reported failure.
    #[error("git {stage} failed: {output}")]
    Failed {
        /// Failing stage.
        stage: CommitStage,
        /// Captured combined stdout and stderr.
        output: String,
    },

    /// The VCS could not be run at all.
    #[error("failed to run git {stage}: {source}")]
    Spawn {
        /// Failing stage.
        stage: CommitStage,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CommitError {
    /// Creates a [`CommitError::Failed`], trimming the captured output.
    pub fn failed(stage: CommitStage, output: impl AsRef<str>) -> Self {
        Self::Failed {
            stage,
            output: output.as_ref().trim().to_owned(),
        }
    }

    /// Returns the stage that failed.
    #[must_use]
    pub const fn stage(&self) -> CommitStage {
        match self {
            Self::Failed { stage, .. } | Self::Spawn { stage, .. } => *stage,
        }
    }

    /// Returns the captured VCS output, if the VCS ran.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } => Some(output),
            Self::Spawn { .. } => None,
        }
    }

    /// Returns `true` if a local commit was created before the failure.
    #[must_use]
    pub const fn committed_locally(&self) -> bool {
        matches!(self.stage(), CommitStage::Push)
    }
}
