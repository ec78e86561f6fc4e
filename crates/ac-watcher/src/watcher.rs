//! Directory watcher with async event streaming.
//!
//! This module provides [`DirectoryWatcher`], which registers every directory of
//! a tree with the `notify` backend (non-recursively, so ignored directories
//! stay unwatched) and bridges the resulting events to tokio channels.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  Blocking Thread (spawn_blocking)                │
//! │  ┌──────────────────┐  std mpsc  ┌─────────────────────────────┐ │
//! │  │ RecommendedWatcher│ ────────► │ run_watch_loop              │ │
//! │  │ (notify callback) │ (unbounded)│ register new dirs, map kinds│ │
//! │  └──────────────────┘            └──────────┬──────────────────┘ │
//! └─────────────────────────────────────────────│────────────────────┘
//!                                  blocking_send│
//!                                               ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Async Runtime (tokio)                        │
//! │   events: mpsc::Receiver<ChangeEvent>  ──►  CommitScheduler       │
//! │   errors: mpsc::Receiver<WatchError>   ──►  (logged)              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The hand-off from the notify callback is unbounded, so the OS queue is
//! drained even while the scheduler is busy committing; back-pressure only
//! applies between the blocking loop and the scheduler.
//!
//! # Known gap
//!
//! A directory created at runtime is registered when its creation event is
//! processed. Files created inside it before that registration completes do
//! not produce events of their own.

use std::sync::mpsc as std_mpsc;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::WatchError;
use crate::events::{ChangeEvent, ChangeKind};
use crate::filter::IgnoredDirs;

/// Default capacity of the event and error channels.
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Messages consumed by the blocking watch loop.
enum Control {
    Raw(notify::Result<notify::Event>),
    Shutdown,
}

/// The two independent streams produced by a [`DirectoryWatcher`].
#[derive(Debug)]
pub struct WatchStreams {
    /// File change events, in delivery order.
    pub events: mpsc::Receiver<ChangeEvent>,

    /// Adapter-level errors. These never stop the watcher.
    pub errors: mpsc::Receiver<WatchError>,
}

/// Outcome of registering a directory tree.
#[derive(Debug, Default)]
pub struct Registration {
    /// Number of directories now watched.
    pub watched: usize,

    /// Directories that were skipped, with the reason.
    pub failures: Vec<WatchError>,
}

/// Watches a directory tree and streams its changes to an async context.
///
/// # Lifecycle
///
/// 1. **Start**: [`DirectoryWatcher::start`] validates the root, registers
///    every non-ignored directory, and spawns the blocking watch loop.
/// 2. **Streaming**: events and errors arrive on the returned [`WatchStreams`].
/// 3. **Shutdown**: call [`DirectoryWatcher::shutdown`] to stop and join the
///    loop, or drop the watcher to stop it without waiting.
///
/// # Examples
///
/// ```no_run
/// use ac_watcher::{DirectoryWatcher, IgnoredDirs};
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), ac_watcher::WatchError> {
/// let ignored = IgnoredDirs::new([".git", "node_modules"]);
/// let (watcher, mut streams) = DirectoryWatcher::start(Utf8Path::new("./site"), ignored).await?;
///
/// while let Some(event) = streams.events.recv().await {
///     println!("{:?} {}", event.kind, event.path);
/// }
///
/// watcher.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct DirectoryWatcher {
    /// Sender into the blocking loop, used to request shutdown.
    control_tx: std_mpsc::Sender<Control>,

    /// Handle to the blocking loop. `None` once shutdown has been awaited.
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    /// Canonical root of the watched tree.
    root: Utf8PathBuf,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.root)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Starts watching the tree rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if `root` is not a directory,
    /// [`WatchError::Notify`] if the backend cannot be initialized, and
    /// [`WatchError::NothingWatched`] if no directory could be registered.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn start(
        root: &Utf8Path,
        ignored: IgnoredDirs,
    ) -> Result<(Self, WatchStreams), WatchError> {
        Self::with_capacity(root, ignored, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Starts a watcher with a custom capacity for both output channels.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn with_capacity(
        root: &Utf8Path,
        ignored: IgnoredDirs,
        channel_capacity: usize,
    ) -> Result<(Self, WatchStreams), WatchError> {
        if !root.is_dir() {
            return Err(WatchError::path_not_found(root));
        }
        let root = root.canonicalize_utf8()?;

        let (control_tx, control_rx) = std_mpsc::channel();
        let callback_tx = control_tx.clone();
        let mut watcher = notify::recommended_watcher(move |result| {
            // Only fails once the loop has exited, when events no longer matter.
            let _ = callback_tx.send(Control::Raw(result));
        })?;

        let registration = register_tree(&root, &ignored, |dir| {
            watcher.watch(dir.as_std_path(), RecursiveMode::NonRecursive)
        });
        for failure in &registration.failures {
            warn!(error = %failure, "Skipping directory");
        }
        if registration.watched == 0 {
            return Err(WatchError::NothingWatched(root));
        }
        info!(root = %root, directories = registration.watched, "Directory watcher started");

        let (event_tx, event_rx) = mpsc::channel(channel_capacity);
        let (error_tx, error_rx) = mpsc::channel(channel_capacity);

        let task_handle = tokio::task::spawn_blocking(move || {
            run_watch_loop(watcher, control_rx, &ignored, &event_tx, &error_tx)
        });

        let streams = WatchStreams {
            events: event_rx,
            errors: error_rx,
        };

        Ok((
            Self {
                control_tx,
                task_handle: Some(task_handle),
                root,
            },
            streams,
        ))
    }

    /// Returns the canonical root of the watched tree.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` while the blocking loop is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher and waits for the blocking loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::LoopFailed`] if the loop panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        // Fails only if the loop already exited
        let _ = self.control_tx.send(Control::Shutdown);

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(WatchError::LoopFailed),
            }
        }

        Ok(())
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        // Sync drop cannot await the loop; it exits on the next message.
        let _ = self.control_tx.send(Control::Shutdown);
    }
}

/// Registers `root` and every directory below it that is not ignored.
///
/// `watch` is called once per directory. Failures are collected, never
/// propagated, so one unreadable directory does not block the rest.
pub fn register_tree<W>(root: &Utf8Path, ignored: &IgnoredDirs, mut watch: W) -> Registration
where
    W: FnMut(&Utf8Path) -> notify::Result<()>,
{
    let skip = ignored.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && Utf8Path::from_path(entry.path()).is_some_and(|p| skip.is_ignored(p)))
        })
        .build();

    let mut registration = Registration::default();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(error) => {
                debug!(error = %error, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
            continue;
        }

        let Some(dir) = Utf8Path::from_path(entry.path()) else {
            registration
                .failures
                .push(WatchError::NonUtf8Path(entry.path().to_owned()));
            continue;
        };

        match watch(dir) {
            Ok(()) => {
                trace!(path = %dir, "Watching directory");
                registration.watched += 1;
            }
            Err(source) => registration.failures.push(WatchError::Register {
                path: dir.to_owned(),
                source,
            }),
        }
    }

    registration
}

/// Whether the watch loop keeps going after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Runs the watch loop until shutdown or until the scheduler goes away.
#[allow(clippy::needless_pass_by_value)] // Watcher and receiver are owned by the loop
fn run_watch_loop(
    mut watcher: RecommendedWatcher,
    control_rx: std_mpsc::Receiver<Control>,
    ignored: &IgnoredDirs,
    event_tx: &mpsc::Sender<ChangeEvent>,
    error_tx: &mpsc::Sender<WatchError>,
) -> Result<(), WatchError> {
    for control in control_rx {
        let flow = match control {
            Control::Shutdown => break,
            Control::Raw(Ok(event)) => dispatch(
                event,
                ignored,
                |dir| watcher.watch(dir.as_std_path(), RecursiveMode::NonRecursive),
                event_tx,
                error_tx,
            ),
            Control::Raw(Err(error)) => send_error(error_tx, WatchError::from(error)),
        };
        if flow == Flow::Stop {
            debug!("Scheduler went away, stopping watcher");
            return Ok(());
        }
    }

    info!("Directory watcher stopped");
    Ok(())
}

/// Forwards the file paths of one raw event and registers directories it
/// created. `watch` registers a single directory.
fn dispatch<W>(
    event: notify::Event,
    ignored: &IgnoredDirs,
    mut watch: W,
    event_tx: &mpsc::Sender<ChangeEvent>,
    error_tx: &mpsc::Sender<WatchError>,
) -> Flow
where
    W: FnMut(&Utf8Path) -> notify::Result<()>,
{
    let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
        trace!(kind = ?event.kind, "Dropping event kind");
        return Flow::Continue;
    };

    for path in event.paths {
        let path = match Utf8PathBuf::try_from(path) {
            Ok(path) => path,
            Err(e) => {
                let error = WatchError::NonUtf8Path(e.into_path_buf());
                if send_error(error_tx, error) == Flow::Stop {
                    return Flow::Stop;
                }
                continue;
            }
        };

        if path.is_dir() {
            if kind.may_add_directory() && !ignored.is_ignored(&path) {
                let registration = register_tree(&path, ignored, &mut watch);
                debug!(path = %path, directories = registration.watched, "Watching new directory");
                for failure in registration.failures {
                    if send_error(error_tx, failure) == Flow::Stop {
                        return Flow::Stop;
                    }
                }
            }
            continue;
        }

        if event_tx.blocking_send(ChangeEvent::new(path, kind)).is_err() {
            return Flow::Stop;
        }
    }

    Flow::Continue
}

fn send_error(error_tx: &mpsc::Sender<WatchError>, error: WatchError) -> Flow {
    if error_tx.blocking_send(error).is_ok() {
        Flow::Continue
    } else {
        Flow::Stop
    }
}
