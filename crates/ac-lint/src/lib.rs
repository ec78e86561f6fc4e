//! Static checks for classic ASP pages.
//!
//! The linter is independent of the commit pipeline. Given a list of files it
//! checks every `.asp` page for:
//!
//! - `<!--#include file|virtual="…"-->` directives whose target does not
//!   exist relative to the page
//! - unbalanced `If`/`End If` and `For`/`Next` blocks in server-side script
//! - typographic double quotes (`“` `”`) pasted from word processors
//!
//! Each problem is reported as a [`Diagnostic`]; linting has no side effects.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod diagnostic;
pub mod error;
pub mod linter;
pub mod script;

pub use diagnostic::{BlockKind, Diagnostic};
pub use error::LintError;
pub use linter::{Linter, is_asp};
pub use script::{BlockCounts, BlockPatterns};
