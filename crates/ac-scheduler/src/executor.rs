//! Turning a flushed batch into a commit.
//!
//! [`CommitExecutor`] drives a [`Vcs`] through stage → status → commit → push
//! for one batch and classifies the outcome:
//!
//! | Situation                                  | Result                              |
//! |--------------------------------------------|-------------------------------------|
//! | empty batch                                | `Ok(Empty)`, no VCS call            |
//! | staging fails                              | `Err`, stage [`CommitStage::Stage`] |
//! | nothing staged after `add`                 | `Ok(NothingStaged)`                 |
//! | status fails                               | logged, commit still attempted      |
//! | commit says "nothing to commit"            | `Ok(NothingToCommit)`               |
//! | commit fails otherwise                     | `Err`, stage [`CommitStage::Commit`]|
//! | push fails                                 | `Err`, stage [`CommitStage::Push`]  |
//!
//! A failed push leaves the local commit in place.

use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::changeset::Batch;
use crate::error::{CommitError, CommitStage};
use crate::message::compose_message;
use crate::scheduler::{Flush, FlushReason};
use crate::vcs::{Vcs, VcsOutput};

/// Output fragments git prints when a commit had nothing to record.
const NOTHING_TO_COMMIT: &[&str] = &["nothing to commit", "no changes added to commit"];

/// How a successful flush ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The batch was empty; the VCS was not touched.
    Empty,
    /// Staging left no differences (e.g. edits that were reverted).
    NothingStaged,
    /// The commit reported there was nothing to commit.
    NothingToCommit,
    /// A commit was created.
    Committed {
        /// The commit message used.
        message: String,
        /// Whether the commit was pushed.
        pushed: bool,
    },
}

/// Commits batches through a [`Vcs`], one at a time.
#[derive(Debug)]
pub struct CommitExecutor<V> {
    vcs: V,
    push: bool,
}

impl<V: Vcs> CommitExecutor<V> {
    /// Creates an executor that pushes after every commit.
    #[must_use]
    pub const fn new(vcs: V) -> Self {
        Self { vcs, push: true }
    }

    /// Enables or disables pushing after a commit.
    #[must_use]
    pub const fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Returns the underlying VCS.
    #[must_use]
    pub const fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Commits `batch`, stamping the message with the current local time.
    pub async fn execute(&self, batch: &Batch) -> Result<CommitOutcome, CommitError> {
        self.execute_at(batch, Local::now().naive_local()).await
    }

    /// Commits `batch`, stamping the message with `at`.
    pub async fn execute_at(
        &self,
        batch: &Batch,
        at: NaiveDateTime,
    ) -> Result<CommitOutcome, CommitError> {
        if batch.is_empty() {
            return Ok(CommitOutcome::Empty);
        }

        let staged = self.vcs.stage(batch.paths()).await;
        check(CommitStage::Stage, staged)?;

        match self.vcs.status().await {
            Ok(status) if status.success && status.output.trim().is_empty() => {
                debug!("No staged changes after add");
                return Ok(CommitOutcome::NothingStaged);
            }
            status => {
                if let Err(error) = check(CommitStage::Status, status) {
                    warn!(stage = %error.stage(), error = %error, "Committing without staged-change check");
                }
            }
        }

        let message = compose_message(batch, at);
        match self.vcs.commit(&message).await {
            Ok(output) if !output.success && is_nothing_to_commit(&output.output) => {
                debug!("Nothing to commit");
                return Ok(CommitOutcome::NothingToCommit);
            }
            committed => check(CommitStage::Commit, committed)?,
        }

        if !self.push {
            return Ok(CommitOutcome::Committed {
                message,
                pushed: false,
            });
        }

        let pushed = self.vcs.push().await;
        check(CommitStage::Push, pushed)?;

        Ok(CommitOutcome::Committed {
            message,
            pushed: true,
        })
    }
}

impl<V: Vcs> Flush for CommitExecutor<V> {
    async fn flush(&mut self, batch: Batch, reason: FlushReason) {
        if batch.is_empty() {
            debug!(reason = %reason, "No pending changes");
            return;
        }

        info!(reason = %reason, files = batch.len(), "Commit started");
        let started = Instant::now();

        match self.execute(&batch).await {
            Ok(CommitOutcome::Committed { message, pushed }) => {
                info!(
                    message = %message,
                    pushed,
                    elapsed_ms = started.elapsed().as_millis(),
                    "Commit completed"
                );
            }
            Ok(outcome) => info!(reason = %reason, ?outcome, "Nothing committed"),
            Err(error) => {
                error!(
                    reason = %reason,
                    stage = %error.stage(),
                    committed_locally = error.committed_locally(),
                    paths = ?batch.paths(),
                    error = %error,
                    "Commit failed"
                );
            }
        }
    }
}

fn check(stage: CommitStage, result: std::io::Result<VcsOutput>) -> Result<(), CommitError> {
    match result {
        Ok(output) if output.success => Ok(()),
        Ok(output) => Err(CommitError::failed(stage, output.output)),
        Err(source) => Err(CommitError::Spawn { stage, source }),
    }
}

fn is_nothing_to_commit(output: &str) -> bool {
    let output = output.to_lowercase();
    NOTHING_TO_COMMIT.iter().any(|pattern| output.contains(pattern))
}
