//! Server-side script extraction and block counting.
//!
//! Only code between `<%` and `%>` is VBScript; keywords in the surrounding
//! HTML, in string literals or in comments must not be counted. Page
//! directives (`<%@ … %>`) are skipped.

use regex::Regex;

use crate::error::LintError;

/// `If … Then` with nothing after `Then` opens a block; the single-line form
/// does not. `Else If` nests a new block and is counted, `ElseIf` is not.
const BLOCK_IF: &str = r"(?i)(?:^|:|\belse\s)\s*if\b.*\bthen\s*$";

const END_IF: &str = r"(?i)\bend\s+if\b";

/// `For` and `For Each` at statement start; `Exit For` is not an opener.
const FOR: &str = r"(?i)(?:^|:)\s*for\b";

/// `Next` at statement start; `On Error Resume Next` is not a closer.
const NEXT: &str = r"(?i)(?:^|:)\s*next\b";

pub(crate) fn compile(pattern: &'static str) -> Result<Regex, LintError> {
    Regex::new(pattern).map_err(|source| LintError::PatternCompile { pattern, source })
}

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    /// Indexes the line starts of `source`.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// Returns the line containing `offset`.
    #[must_use]
    pub fn line(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

/// One physical line of server-side script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLine<'a> {
    /// Line number in the page.
    pub line: usize,
    /// The script text on that line.
    pub text: &'a str,
}

/// Collects the server-side script of a page, line by line.
#[must_use]
pub fn script_lines<'a>(source: &'a str, index: &LineIndex) -> Vec<ScriptLine<'a>> {
    let mut lines = Vec::new();
    let mut offset = 0;

    while let Some(open) = source[offset..].find("<%") {
        let body_start = offset + open + 2;
        let (body, next) = match source[body_start..].find("%>") {
            Some(close) => (&source[body_start..body_start + close], body_start + close + 2),
            None => (&source[body_start..], source.len()),
        };
        offset = next;

        if body.starts_with('@') {
            continue;
        }
        let body = body.strip_prefix('=').unwrap_or(body);
        let first = index.line(body_start);
        lines.extend(
            body.split('\n')
                .enumerate()
                .map(|(i, text)| ScriptLine { line: first + i, text }),
        );
    }

    lines
}

/// Removes string literals and trailing comments from a line of script.
#[must_use]
pub fn strip_literals(text: &str) -> String {
    let mut code = String::with_capacity(text.len());
    let mut in_string = false;

    for ch in text.chars() {
        match ch {
            '"' => in_string = !in_string,
            '\'' if !in_string => break,
            _ if !in_string => code.push(ch),
            _ => {}
        }
    }

    let trimmed = code.trim_start();
    let is_rem = trimmed
        .get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("rem ") || head.eq_ignore_ascii_case("rem\t"))
        || trimmed.eq_ignore_ascii_case("rem");
    if is_rem {
        code.clear();
    }
    code
}

/// Opener and closer counts for the paired block constructs of a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCounts {
    /// Block `If` statements.
    pub if_open: usize,
    /// `End If` statements.
    pub if_close: usize,
    /// `For` and `For Each` statements.
    pub for_open: usize,
    /// `Next` statements.
    pub for_close: usize,
}

/// Compiled keyword patterns for [`BlockCounts`].
#[derive(Debug, Clone)]
pub struct BlockPatterns {
    block_if: Regex,
    end_if: Regex,
    for_open: Regex,
    next: Regex,
}

impl BlockPatterns {
    /// Compiles the keyword patterns.
    pub fn new() -> Result<Self, LintError> {
        Ok(Self {
            block_if: compile(BLOCK_IF)?,
            end_if: compile(END_IF)?,
            for_open: compile(FOR)?,
            next: compile(NEXT)?,
        })
    }

    /// Counts block constructs in the given script lines.
    #[must_use]
    pub fn count(&self, lines: &[ScriptLine<'_>]) -> BlockCounts {
        let mut counts = BlockCounts::default();
        for line in lines {
            let code = strip_literals(line.text);
            let code = code.trim_end();
            if self.block_if.is_match(code) {
                counts.if_open += 1;
            }
            counts.if_close += self.end_if.find_iter(code).count();
            counts.for_open += self.for_open.find_iter(code).count();
            counts.for_close += self.next.find_iter(code).count();
        }
        counts
    }
}
