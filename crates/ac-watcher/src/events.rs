//! Event types for file change notifications.
//!
//! Raw `notify` events carry an [`EventKind`] taxonomy that is much richer than
//! what the commit pipeline needs. This module folds it into four
//! [`ChangeKind`]s and one [`ChangeEvent`] per affected path.
//!
//! # Event Flow
//!
//! ```text
//! notify::Event (kind, paths[])
//!        │
//!        ▼
//!  ChangeKind::from_event_kind ── None ──► dropped (access, metadata)
//!        │
//!        ▼
//!  one ChangeEvent per UTF-8 path
//!        │
//!        ▼
//!  sent via channel to the scheduler
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use notify::EventKind;
use notify::event::ModifyKind;

/// The kind of change observed on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The path was created.
    Create,
    /// The file's contents were written.
    Write,
    /// The path was renamed (either side of the rename).
    Rename,
    /// The path was removed.
    Remove,
}

impl ChangeKind {
    /// Maps a notify event kind, dropping kinds that never affect content.
    ///
    /// # Examples
    ///
    /// ```
    /// use ac_watcher::ChangeKind;
    /// use notify::EventKind;
    /// use notify::event::{AccessKind, CreateKind};
    ///
    /// assert_eq!(
    ///     ChangeKind::from_event_kind(&EventKind::Create(CreateKind::File)),
    ///     Some(ChangeKind::Create),
    /// );
    /// assert_eq!(ChangeKind::from_event_kind(&EventKind::Access(AccessKind::Any)), None);
    /// ```
    #[must_use]
    pub const fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Write),
            EventKind::Remove(_) => Some(Self::Remove),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    /// Returns `true` for kinds that can leave new content at the path.
    #[inline]
    #[must_use]
    pub const fn is_relevant(self) -> bool {
        matches!(self, Self::Create | Self::Write | Self::Rename)
    }

    /// Returns `true` for kinds after which the path may be a new directory.
    #[inline]
    #[must_use]
    pub const fn may_add_directory(self) -> bool {
        matches!(self, Self::Create | Self::Rename)
    }
}

/// A change to a single path.
///
/// # Examples
///
/// ```
/// use ac_watcher::{ChangeEvent, ChangeKind};
/// use camino::Utf8PathBuf;
///
/// let event = ChangeEvent::new(Utf8PathBuf::from("/site/default.asp"), ChangeKind::Write);
/// assert!(event.is_relevant());
/// assert_eq!(event.file_name(), Some("default.asp"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path that changed.
    pub path: Utf8PathBuf,

    /// What happened to it.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Creates a new change event.
    #[inline]
    #[must_use]
    pub const fn new(path: Utf8PathBuf, kind: ChangeKind) -> Self {
        Self { path, kind }
    }

    /// Returns `true` if this change should be committed (see [`ChangeKind::is_relevant`]).
    #[inline]
    #[must_use]
    pub const fn is_relevant(&self) -> bool {
        self.kind.is_relevant()
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }

    /// Returns the changed path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
