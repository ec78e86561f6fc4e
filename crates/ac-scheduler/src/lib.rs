//! Change coalescing and commit execution.
//!
//! This crate turns the event stream produced by `ac-watcher` into
//! correctly timed commits:
//!
//! - [`CommitScheduler`] owns the pending [`ChangeSet`] and the debounce and
//!   max-wait [`Timer`]s, and decides *when* a batch is flushed
//! - [`CommitExecutor`] decides *what* a flush does: stage, detect no-ops,
//!   commit with a generated message, push
//! - [`ShutdownCoordinator`] turns termination signals into one final flush
//!
//! The executor talks to version control through the [`Vcs`] trait;
//! [`GitCli`] is the `git` command-line implementation.
//!
//! # Wiring
//!
//! ```no_run
//! use ac_core::{AgentConfig, ExtensionSet};
//! use ac_scheduler::{CommitExecutor, CommitScheduler, GitCli, ShutdownCoordinator};
//! use ac_watcher::{DirectoryWatcher, ExtensionFilter, IgnoredDirs};
//!
//! # async fn example(config: AgentConfig) -> Result<(), ac_watcher::WatchError> {
//! let ignored = IgnoredDirs::new(config.watch.ignored_dirs.clone());
//! let (watcher, streams) = DirectoryWatcher::start(&config.watch.root, ignored).await?;
//!
//! let executor = CommitExecutor::new(GitCli::new(&config.commit.repo));
//! let filter = ExtensionFilter::new(config.watch.extension_set());
//! let scheduler = CommitScheduler::new(&config.schedule, filter, executor);
//!
//! let shutdown = ShutdownCoordinator::new();
//! shutdown.listen();
//! scheduler.run(streams.events, streams.errors, shutdown.token()).await;
//!
//! watcher.shutdown().await
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod changeset;
pub mod error;
pub mod executor;
pub mod message;
pub mod scheduler;
pub mod shutdown;
pub mod timer;
pub mod vcs;

pub use changeset::{Batch, ChangeSet};
pub use error::{CommitError, CommitStage};
pub use executor::{CommitExecutor, CommitOutcome};
pub use message::compose_message;
pub use scheduler::{CommitScheduler, Flush, FlushReason, SchedulerState};
pub use shutdown::ShutdownCoordinator;
pub use timer::{Timer, TimerState};
pub use vcs::{GitCli, Vcs, VcsOutput};
