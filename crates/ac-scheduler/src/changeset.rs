//! Pending changes and the batches they are flushed as.
//!
//! A [`ChangeSet`] is owned by the scheduler task and never shared; draining it
//! produces a [`Batch`] and leaves it empty in the same step, so any event the
//! scheduler processes afterwards starts the next batch.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashSet;

/// The set of distinct paths changed since the last flush.
#[derive(Debug, Default)]
pub struct ChangeSet {
    paths: FxHashSet<Utf8PathBuf>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a changed path.
    ///
    /// Returns `true` if this insertion took the set from empty to non-empty,
    /// i.e. it started a new batch. Re-inserting a pending path is a no-op.
    pub fn insert(&mut self, path: Utf8PathBuf) -> bool {
        let was_empty = self.paths.is_empty();
        self.paths.insert(path);
        was_empty
    }

    /// Returns `true` if the path is pending.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.paths.contains(path)
    }

    /// Returns the number of pending paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Empties the set and returns its contents as a batch.
    pub fn drain(&mut self) -> Batch {
        Batch::new(std::mem::take(&mut self.paths))
    }
}

/// The distinct paths accumulated between two flushes, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    paths: Vec<Utf8PathBuf>,
}

impl Batch {
    /// Creates a batch from any collection of paths, deduplicated and sorted.
    pub fn new(paths: impl IntoIterator<Item = Utf8PathBuf>) -> Self {
        let mut paths: Vec<Utf8PathBuf> = paths.into_iter().collect();
        paths.sort_unstable();
        paths.dedup();
        Self { paths }
    }

    /// Returns the paths in the batch.
    #[must_use]
    pub fn paths(&self) -> &[Utf8PathBuf] {
        &self.paths
    }

    /// Returns the number of paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if the batch has no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns the base names of the paths, in batch order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.paths
            .iter()
            .map(|p| p.file_name().unwrap_or_else(|| p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_starts_batch() {
        let mut set = ChangeSet::new();
        assert!(set.insert("/www/a.asp".into()));
        assert!(!set.insert("/www/b.asp".into()));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_duplicate_insert_is_idempotent() {
        let mut set = ChangeSet::new();
        set.insert("/www/a.asp".into());
        assert!(!set.insert("/www/a.asp".into()));
        assert_eq!(set.len(), 1);
        assert!(set.contains(Utf8Path::new("/www/a.asp")));
    }

    #[test]
    fn test_drain_empties_set() {
        let mut set = ChangeSet::new();
        set.insert("/www/b.asp".into());
        set.insert("/www/a.asp".into());

        let batch = set.drain();
        assert!(set.is_empty());
        assert_eq!(batch.paths(), [Utf8PathBuf::from("/www/a.asp"), Utf8PathBuf::from("/www/b.asp")]);

        // The next insert starts a new batch.
        assert!(set.insert("/www/a.asp".into()));
    }

    #[test]
    fn test_drain_of_empty_set() {
        let mut set = ChangeSet::new();
        assert!(set.drain().is_empty());
    }

    #[test]
    fn test_batch_file_names() {
        let batch = Batch::new([
            Utf8PathBuf::from("/www/inc/header.inc"),
            Utf8PathBuf::from("/www/default.asp"),
        ]);
        let names: Vec<&str> = batch.file_names().collect();
        assert_eq!(names, ["default.asp", "header.inc"]);
    }
}
