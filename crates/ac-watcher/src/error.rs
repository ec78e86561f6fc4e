//! Error types for the ac-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while registering watches or receiving events.

use camino::Utf8PathBuf;

/// Errors that can occur during file watching operations.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Recoverable once watching has
///   started; the adapter forwards them on its error channel and keeps going
/// - **Registration errors** ([`WatchError::Register`]): Recoverable - the
///   directory is skipped
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skipped
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal at startup
/// - **Nothing watched** ([`WatchError::NothingWatched`]): Fatal at startup
/// - **Loop failed** ([`WatchError::LoopFailed`]): Fatal - the blocking loop panicked
/// - **I/O errors** ([`WatchError::Io`]): Fatal at startup
///
/// # Examples
///
/// ```
/// use ac_watcher::WatchError;
///
/// fn report(err: &WatchError) {
///     if err.is_recoverable() {
///         eprintln!("watch warning: {err}");
///     } else {
///         eprintln!("watcher stopped: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The notify backend reported an error.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// A single directory could not be registered.
    #[error("failed to watch directory {path}: {source}")]
    Register {
        /// The directory that was skipped.
        path: Utf8PathBuf,
        /// The underlying notify error.
        #[source]
        source: notify::Error,
    },

    /// The specified path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// Not a single directory under the root could be registered.
    #[error("no directory could be watched under {0}")]
    NothingWatched(Utf8PathBuf),

    /// The blocking watch loop terminated abnormally.
    #[error("watch loop terminated abnormally")]
    LoopFailed,

    /// A path in a file event is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns `true` if watching can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Notify(_) | Self::Register { .. } | Self::NonUtf8Path(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_path_not_found_is_fatal() {
        let err = WatchError::path_not_found("site/missing");
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "path does not exist: site/missing");
    }

    #[test]
    fn test_register_is_recoverable() {
        let err = WatchError::Register {
            path: Utf8PathBuf::from("/site/locked"),
            source: notify::Error::generic("permission denied"),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("/site/locked"));
    }

    #[test]
    fn test_notify_is_recoverable() {
        let err = WatchError::from(notify::Error::generic("queue overflow"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_non_utf8_is_recoverable() {
        let err = WatchError::NonUtf8Path(PathBuf::from("test"));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_nothing_watched_is_fatal() {
        let err = WatchError::NothingWatched(Utf8PathBuf::from("/site"));
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("/site"));
    }

    #[test]
    fn test_loop_failed_is_fatal() {
        let err = WatchError::LoopFailed;
        assert!(!err.is_recoverable());
    }
}
