//! Path filtering for watch events and watch registration.
//!
//! Two independent decisions are made about paths:
//!
//! - [`FileFilter`] decides whether a changed *file* matters to the commit
//!   pipeline. [`ExtensionFilter`] is the implementation the agent uses.
//! - [`IgnoredDirs`] decides whether a *directory* is registered with the
//!   watcher at all (version-control metadata, dependency caches, logs).
//!
//! # Examples
//!
//! ```
//! use ac_core::ExtensionSet;
//! use ac_watcher::{ExtensionFilter, FileFilter, IgnoredDirs};
//! use camino::Utf8Path;
//!
//! let filter = ExtensionFilter::new(ExtensionSet::parse(".asp"));
//! assert!(filter.should_process(Utf8Path::new("/site/Default.asp")));
//! assert!(!filter.should_process(Utf8Path::new("/site/site.css")));
//!
//! let ignored = IgnoredDirs::new([".git", "node_modules"]);
//! assert!(ignored.is_ignored(Utf8Path::new("/site/.git")));
//! assert!(!ignored.is_ignored(Utf8Path::new("/site/includes")));
//! ```

use ac_core::ExtensionSet;
use camino::Utf8Path;
use smallvec::SmallVec;

/// A predicate deciding which changed files are processed.
///
/// Filters must be [`Send`] and [`Sync`] so they can be moved into the
/// scheduler task.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if a change to the file at `path` should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// Accepts files whose lowercase extension belongs to an [`ExtensionSet`].
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: ExtensionSet,
}

impl ExtensionFilter {
    /// Creates a filter over the given extension set.
    #[must_use]
    pub const fn new(extensions: ExtensionSet) -> Self {
        Self { extensions }
    }

    /// Returns the underlying extension set.
    #[must_use]
    pub const fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }
}

impl FileFilter for ExtensionFilter {
    #[inline]
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.extensions.matches(path)
    }
}

/// Directory names that are never registered with the watcher.
///
/// Matching is on the final path component only, case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct IgnoredDirs {
    names: SmallVec<[String; 8]>,
}

impl IgnoredDirs {
    /// Creates a set of ignored directory names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if the directory's name is ignored.
    #[must_use]
    pub fn is_ignored(&self, dir: &Utf8Path) -> bool {
        dir.file_name()
            .is_some_and(|name| self.names.iter().any(|n| n == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        let filter = ExtensionFilter::new(ExtensionSet::parse(".asp,inc"));

        assert!(filter.should_process(Utf8Path::new("/www/default.asp")));
        assert!(filter.should_process(Utf8Path::new("/www/DEFAULT.ASP")));
        assert!(filter.should_process(Utf8Path::new("/www/inc/header.inc")));
        assert!(!filter.should_process(Utf8Path::new("/www/default.aspx")));
        assert!(!filter.should_process(Utf8Path::new("/www/README")));
    }

    #[test]
    fn test_boxed_filter() {
        let filter: Box<dyn FileFilter> = Box::new(ExtensionFilter::new(ExtensionSet::parse("asp")));
        assert!(filter.should_process(Utf8Path::new("a.asp")));
        assert!(!filter.should_process(Utf8Path::new("a.js")));
    }

    #[test]
    fn test_ignored_dirs_match_last_component() {
        let ignored = IgnoredDirs::new(["logs", "tmp"]);

        assert!(ignored.is_ignored(Utf8Path::new("/www/logs")));
        assert!(ignored.is_ignored(Utf8Path::new("tmp")));
        assert!(!ignored.is_ignored(Utf8Path::new("/www/logs/archive")));
        assert!(!ignored.is_ignored(Utf8Path::new("/www/Logs")));
    }

    #[test]
    fn test_ignored_dirs_empty() {
        let ignored = IgnoredDirs::default();
        assert!(!ignored.is_ignored(Utf8Path::new("/www/.git")));
    }
}
