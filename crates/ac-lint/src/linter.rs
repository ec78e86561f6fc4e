//! Page-level checks.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::{debug, trace};

use crate::diagnostic::{BlockKind, Diagnostic};
use crate::error::LintError;
use crate::script::{BlockPatterns, LineIndex, compile, script_lines};

const INCLUDE: &str = r#"(?i)<!--\s*#include\s+(?:file|virtual)\s*=\s*"([^"]+)"\s*-->"#;

const CURLY_QUOTES: [char; 2] = ['\u{201C}', '\u{201D}'];

/// Returns `true` if the path has an `.asp` extension, in any case.
#[must_use]
pub fn is_asp(path: &Utf8Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("asp"))
}

/// Checks classic ASP pages.
///
/// # Examples
///
/// ```
/// use ac_lint::Linter;
/// use camino::Utf8Path;
///
/// let linter = Linter::new()?;
/// let page = "<% If ready Then %>\n<p>ok</p>\n";
/// let diagnostics = linter.lint_source(Utf8Path::new("page.asp"), page);
/// assert_eq!(diagnostics.len(), 1);
/// # Ok::<(), ac_lint::LintError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Linter {
    include: Regex,
    blocks: BlockPatterns,
}

impl Linter {
    /// Compiles the patterns used by the checks.
    pub fn new() -> Result<Self, LintError> {
        Ok(Self {
            include: compile(INCLUDE)?,
            blocks: BlockPatterns::new()?,
        })
    }

    /// Lints every `.asp` file in `files`; other files are skipped.
    pub fn lint_files<P: AsRef<Utf8Path>>(&self, files: &[P]) -> Vec<Diagnostic> {
        files
            .iter()
            .map(AsRef::<Utf8Path>::as_ref)
            .filter(|path| {
                let asp = is_asp(path);
                if !asp {
                    trace!(path = %path, "Skipping non-ASP file");
                }
                asp
            })
            .flat_map(|path| self.lint_file(path))
            .collect()
    }

    /// Lints one page read from disk.
    ///
    /// Bytes that are not valid UTF-8 are replaced before checking.
    pub fn lint_file(&self, path: &Utf8Path) -> Vec<Diagnostic> {
        match fs::read(path) {
            Ok(bytes) => self.lint_source(path, &String::from_utf8_lossy(&bytes)),
            Err(source) => vec![Diagnostic::Unreadable {
                file: path.to_path_buf(),
                source,
            }],
        }
    }

    /// Lints page text. Include targets are resolved against the directory
    /// of `path`.
    pub fn lint_source(&self, path: &Utf8Path, source: &str) -> Vec<Diagnostic> {
        let index = LineIndex::new(source);
        let mut diagnostics = Vec::new();

        self.check_includes(path, source, &index, &mut diagnostics);
        self.check_blocks(path, source, &index, &mut diagnostics);
        check_quotes(path, source, &index, &mut diagnostics);

        debug!(path = %path, problems = diagnostics.len(), "Linted page");
        diagnostics
    }

    fn check_includes(
        &self,
        path: &Utf8Path,
        source: &str,
        index: &LineIndex,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let dir = path.parent().unwrap_or_else(|| Utf8Path::new(""));

        for captures in self.include.captures_iter(source) {
            let (Some(directive), Some(target)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if !include_target(dir, target.as_str()).exists() {
                diagnostics.push(Diagnostic::MissingInclude {
                    file: path.to_path_buf(),
                    line: index.line(directive.start()),
                    target: target.as_str().to_owned(),
                });
            }
        }
    }

    fn check_blocks(
        &self,
        path: &Utf8Path,
        source: &str,
        index: &LineIndex,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let counts = self.blocks.count(&script_lines(source, index));

        for (kind, opened, closed) in [
            (BlockKind::If, counts.if_open, counts.if_close),
            (BlockKind::For, counts.for_open, counts.for_close),
        ] {
            if opened != closed {
                diagnostics.push(Diagnostic::Unbalanced {
                    file: path.to_path_buf(),
                    kind,
                    opened,
                    closed,
                });
            }
        }
    }
}

/// Include paths are relative to the including page, including `virtual`
/// ones, and may use backslashes.
fn include_target(dir: &Utf8Path, target: &str) -> Utf8PathBuf {
    let target = target.replace('\\', "/");
    dir.join(target.trim_start_matches('/'))
}

fn check_quotes(path: &Utf8Path, source: &str, index: &LineIndex, diagnostics: &mut Vec<Diagnostic>) {
    let mut found = source.match_indices(CURLY_QUOTES);
    if let Some((first, _)) = found.next() {
        diagnostics.push(Diagnostic::CurlyQuotes {
            file: path.to_path_buf(),
            line: index.line(first),
            count: 1 + found.count(),
        });
    }
}
