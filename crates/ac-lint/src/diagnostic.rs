//! Lint findings.

use std::fmt;

use camino::Utf8PathBuf;

/// A paired block construct whose openers and closers are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `If … Then` / `End If`.
    If,
    /// `For` / `Next`.
    For,
}

impl BlockKind {
    const fn keywords(self) -> (&'static str, &'static str) {
        match self {
            Self::If => ("If", "End If"),
            Self::For => ("For", "Next"),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keywords().0)
    }
}

/// One problem found in an ASP page.
#[derive(Debug, thiserror::Error)]
pub enum Diagnostic {
    /// An include directive points at a file that does not exist.
    #[error("[INCLUDE] {file}:{line}: included file not found: {target}")]
    MissingInclude {
        /// The including page.
        file: Utf8PathBuf,
        /// Line of the directive.
        line: usize,
        /// The path as written in the directive.
        target: String,
    },

    /// Block openers and closers do not pair up.
    #[error("[SYNTAX] {file}: {} ({opened}) and {} ({closed}) do not match", .kind.keywords().0, .kind.keywords().1)]
    Unbalanced {
        /// The page.
        file: Utf8PathBuf,
        /// Which construct is unbalanced.
        kind: BlockKind,
        /// Number of openers.
        opened: usize,
        /// Number of closers.
        closed: usize,
    },

    /// Typographic double quotes, which VBScript does not accept as string
    /// delimiters.
    #[error("[UNICODE] {file}:{line}: curly double quotes found ({count} in file)")]
    CurlyQuotes {
        /// The page.
        file: Utf8PathBuf,
        /// Line of the first occurrence.
        line: usize,
        /// Total occurrences in the file.
        count: usize,
    },

    /// The page could not be read.
    #[error("[ERROR] cannot read {file}: {source}")]
    Unreadable {
        /// The page.
        file: Utf8PathBuf,
        /// The read failure.
        #[source]
        source: std::io::Error,
    },
}

impl Diagnostic {
    /// Returns the page the diagnostic refers to.
    #[must_use]
    pub fn file(&self) -> &Utf8PathBuf {
        match self {
            Self::MissingInclude { file, .. }
            | Self::Unbalanced { file, .. }
            | Self::CurlyQuotes { file, .. }
            | Self::Unreadable { file, .. } => file,
        }
    }

    /// Returns the line the diagnostic points at, when it has one.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::MissingInclude { line, .. } | Self::CurlyQuotes { line, .. } => Some(*line),
            Self::Unbalanced { .. } | Self::Unreadable { .. } => None,
        }
    }
}
