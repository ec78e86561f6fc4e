//! Error types for the linter.

/// Errors that prevent linting from starting.
///
/// Problems found *in* a page are [`Diagnostic`](crate::Diagnostic)s, not
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// A built-in pattern failed to compile.
    #[error("failed to compile pattern `{pattern}`: {source}")]
    PatternCompile {
        /// The pattern source.
        pattern: &'static str,
        /// The regex error.
        #[source]
        source: regex::Error,
    },
}
