//! Per-run outcome aggregation.
//! Item-level failures never abort a batch; they are collected here with enough context
//! (trash name or source, original path, cause) to retry or investigate afterwards.

use std::path::PathBuf;

use crate::errors::TrashError;

/// One failed item of a batch.
#[derive(Debug)]
pub struct ItemFailure {
    /// Trash name, source path or selector text, whichever identifies the item best.
    pub subject: String,
    pub original_path: Option<PathBuf>,
    pub error: anyhow::Error,
}

impl ItemFailure {
    pub fn new(subject: impl Into<String>, original_path: Option<PathBuf>, error: anyhow::Error) -> Self {
        Self {
            subject: subject.into(),
            original_path,
            error,
        }
    }

    pub fn trash_error(&self) -> Option<&TrashError> {
        self.error.downcast_ref::<TrashError>()
    }

    /// Stable numeric code when the cause is a typed trash error.
    pub fn code(&self) -> Option<u16> {
        self.trash_error().map(TrashError::code)
    }
}

/// Outcome of a trash or restore batch.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub succeeded: Vec<T>,
    pub failures: Vec<ItemFailure>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn push_ok(&mut self, value: T) {
        self.succeeded.push(value);
    }

    pub fn push_failure(&mut self, failure: ItemFailure) {
        self.failures.push(failure);
    }
}

/// Outcome of a purge (empty, expire, orphan reconciliation).
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Items (or orphan parts) permanently removed.
    pub count: u64,
    /// Apparent bytes freed.
    pub bytes: u64,
    /// Ownerless content that received an unknown-origin record.
    pub adopted: Vec<String>,
    /// Entries deliberately left alone (corrupt records whose content still exists).
    pub skipped: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl PurgeReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_removed(&mut self, bytes: u64) {
        self.count += 1;
        self.bytes = self.bytes.saturating_add(bytes);
    }
}
