//! Commit message composition.

use chrono::NaiveDateTime;

use crate::changeset::Batch;

/// Batches larger than this are summarized by count instead of by name.
const MAX_NAMED_FILES: usize = 3;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Builds the commit message for a batch.
///
/// Up to three files are listed by base name; larger batches are summarized
/// as a count. The timestamp is the local time the commit was made.
///
/// # Examples
///
/// ```
/// use ac_scheduler::{Batch, compose_message};
/// use camino::Utf8PathBuf;
/// use chrono::NaiveDate;
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 1)
///     .and_then(|d| d.and_hms_opt(8, 15, 0))
///     .unwrap();
/// let batch = Batch::new([Utf8PathBuf::from("/www/default.asp")]);
/// assert_eq!(compose_message(&batch, at), "Auto-commit: default.asp [2024-03-01 08:15:00]");
/// ```
#[must_use]
pub fn compose_message(batch: &Batch, at: NaiveDateTime) -> String {
    let summary = if batch.len() <= MAX_NAMED_FILES {
        batch.file_names().collect::<Vec<_>>().join(", ")
    } else {
        format!("{} files", batch.len())
    };

    format!("Auto-commit: {summary} [{}]", at.format(TIMESTAMP_FORMAT))
}
