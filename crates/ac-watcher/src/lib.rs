//! Directory watching bridged to async channels.
//!
//! This crate adapts the `notify` crate to the needs of the commit pipeline:
//!
//! - Register every directory of a tree, skipping ignored names such as
//!   `.git` and `node_modules`
//! - Extend coverage when new subdirectories appear at runtime
//! - Fold raw notify events into [`ChangeEvent`]s with a [`ChangeKind`]
//! - Deliver events and adapter errors on two independent tokio channels
//!
//! Deciding *which* changes matter is left to the consumer through the
//! [`FileFilter`] trait; [`ExtensionFilter`] is the implementation the agent
//! uses.
//!
//! # Crate Dependencies
//!
//! ```text
//! ac-cli ──► ac-scheduler ──► ac-watcher ──► ac-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use ac_watcher::{DirectoryWatcher, IgnoredDirs};
//! use camino::Utf8Path;
//!
//! # async fn example() -> Result<(), ac_watcher::WatchError> {
//! let (watcher, mut streams) =
//!     DirectoryWatcher::start(Utf8Path::new("./site"), IgnoredDirs::new([".git"])).await?;
//!
//! loop {
//!     tokio::select! {
//!         Some(event) = streams.events.recv() => {
//!             println!("{:?}: {}", event.kind, event.path);
//!         }
//!         Some(err) = streams.errors.recv() => {
//!             eprintln!("watch warning: {err}");
//!         }
//!         else => break,
//!     }
//! }
//!
//! watcher.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{ChangeEvent, ChangeKind};

// Re-export filter types
pub use filter::{ExtensionFilter, FileFilter, IgnoredDirs};

// Re-export watcher types
pub use watcher::{DirectoryWatcher, Registration, WatchStreams, register_tree};
