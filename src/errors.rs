//! Typed error definitions for trashctl.
//! Provides the well-known failure modes of the trash engine for better logs, exit codes and tests.

use std::path::PathBuf;
use thiserror::Error;

use chrono::NaiveDateTime;

/// One entry of a disambiguation list returned when a selector matches several items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub trash_name: String,
    pub original_path: Option<PathBuf>,
    pub deleted_at: NaiveDateTime,
}

#[derive(Debug, Error)]
pub enum TrashError {
    /// Trash root unusable or config unreadable. Aborts the whole run.
    #[error("Environment problem at {path}: {reason}")]
    Environment { path: PathBuf, reason: String },

    #[error("Insufficient disk space for {dest}: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        required: u64,
        available: u64,
        dest: PathBuf,
    },

    /// Internal: the exclusive create of a metadata record lost a race. Always retried.
    #[error("Trash name already taken: {0}")]
    NameCollision(String),

    #[error("No free trash name for '{name}' after {attempts} attempts")]
    NamesExhausted { name: String, attempts: u32 },

    #[error("Corrupt trashinfo record {path}: {reason}")]
    CorruptMetadata { path: PathBuf, reason: String },

    #[error("Restore destination already exists for '{trash_name}': {dest}")]
    DestinationConflict { trash_name: String, dest: PathBuf },

    #[error("Nothing in the trash matches '{0}'")]
    NotFound(String),

    #[error("'{selector}' matches {} trashed items; choose one or restore all explicitly", .candidates.len())]
    Ambiguous {
        selector: String,
        candidates: Vec<Candidate>,
    },

    #[error("Original location of '{0}' is unknown; a destination is required")]
    UnknownOrigin(String),

    #[error("Source path not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Refusing to process {path}: {reason}")]
    Refused { path: PathBuf, reason: String },

    /// The content and its record are in the trash, but the source could not be removed.
    #[error("Trashed {path} as '{trash_name}' but the original could not be removed: {reason}")]
    OriginalNotRemoved {
        trash_name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl TrashError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            TrashError::Environment { .. } => 10,
            TrashError::InsufficientSpace { .. } => 20,
            TrashError::NameCollision(_) => 30,
            TrashError::NamesExhausted { .. } => 31,
            TrashError::CorruptMetadata { .. } => 40,
            TrashError::DestinationConflict { .. } => 50,
            TrashError::NotFound(_) => 60,
            TrashError::Ambiguous { .. } => 61,
            TrashError::UnknownOrigin(_) => 62,
            TrashError::SourceNotFound(_) => 70,
            TrashError::Refused { .. } => 71,
            TrashError::OriginalNotRemoved { .. } => 72,
            TrashError::Interrupted => 130,
        }
    }

    /// Short machine-friendly kind used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            TrashError::Environment { .. } => "environment",
            TrashError::InsufficientSpace { .. } => "insufficient_space",
            TrashError::NameCollision(_) => "name_collision",
            TrashError::NamesExhausted { .. } => "names_exhausted",
            TrashError::CorruptMetadata { .. } => "corrupt_metadata",
            TrashError::DestinationConflict { .. } => "destination_conflict",
            TrashError::NotFound(_) => "not_found",
            TrashError::Ambiguous { .. } => "ambiguous",
            TrashError::UnknownOrigin(_) => "unknown_origin",
            TrashError::SourceNotFound(_) => "source_not_found",
            TrashError::Refused { .. } => "refused",
            TrashError::OriginalNotRemoved { .. } => "original_not_removed",
            TrashError::Interrupted => "interrupted",
        }
    }

    /// Environment-level failures abort a run instead of being recorded per item.
    pub fn is_environment(&self) -> bool {
        matches!(self, TrashError::Environment { .. })
    }
}
