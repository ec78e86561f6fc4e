//! Extension matching for changed paths.
//!
//! An [`ExtensionSet`] is built once from the configured extension list and
//! answers a single question: is this path one we commit?
//!
//! Entries are normalized when the set is built: surrounding whitespace is
//! trimmed, an optional leading dot is stripped, and the result is lowercased.
//! Matching lowercases the path's extension, so `Index.ASP` matches `.asp`.
//!
//! # Examples
//!
//! ```
//! use ac_core::ExtensionSet;
//! use camino::Utf8Path;
//!
//! let set = ExtensionSet::parse(".asp, INC,js");
//! assert!(set.matches(Utf8Path::new("/site/Default.ASP")));
//! assert!(set.matches(Utf8Path::new("/site/lib/header.inc")));
//! assert!(!set.matches(Utf8Path::new("/site/style.css")));
//! ```

use camino::Utf8Path;
use smallvec::SmallVec;

/// Immutable set of normalized file extensions (stored without the dot).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: SmallVec<[String; 4]>,
}

impl ExtensionSet {
    /// Builds a set from a comma-separated list such as `".asp,.inc"`.
    ///
    /// Empty entries are ignored.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::from_iter(list.split(','))
    }

    /// Returns `true` if the path's lowercase extension is in the set.
    ///
    /// Paths without an extension never match.
    #[must_use]
    pub fn matches(&self, path: &Utf8Path) -> bool {
        path.extension().is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            self.extensions.iter().any(|e| *e == ext)
        })
    }

    /// Returns the normalized extensions, without leading dots.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.extensions
    }

    /// Returns `true` if no extension was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut extensions: SmallVec<[String; 4]> = SmallVec::new();
        for raw in iter {
            let Some(ext) = normalize(raw.as_ref()) else {
                continue;
            };
            if !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        Self { extensions }
    }
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);
    (!bare.is_empty()).then(|| bare.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_entries() {
        let set = ExtensionSet::parse(" .ASP ,inc,, .Js ");
        assert_eq!(set.as_slice(), ["asp", "inc", "js"]);
    }

    #[test]
    fn test_parse_deduplicates() {
        let set = ExtensionSet::parse(".asp,asp,ASP");
        assert_eq!(set.as_slice(), ["asp"]);
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let set = ExtensionSet::parse(".asp");
        assert!(set.matches(Utf8Path::new("/www/default.asp")));
        assert!(set.matches(Utf8Path::new("/www/Default.ASP")));
        assert!(!set.matches(Utf8Path::new("/www/default.aspx")));
    }

    #[test]
    fn test_no_extension_never_matches() {
        let set = ExtensionSet::parse(".asp");
        assert!(!set.matches(Utf8Path::new("/www/Makefile")));
        assert!(!set.matches(Utf8Path::new("/www/asp")));
    }

    #[test]
    fn test_empty_list() {
        let set = ExtensionSet::parse(" , ");
        assert!(set.is_empty());
        assert!(!set.matches(Utf8Path::new("a.asp")));
    }

    #[test]
    fn test_from_config_list() {
        let configured = vec![".asp".to_owned(), ".INC".to_owned()];
        let set: ExtensionSet = configured.iter().collect();
        assert!(set.matches(Utf8Path::new("footer.inc")));
    }
}
