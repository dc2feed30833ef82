use chrono::NaiveDateTime;
use std::cell::OnceCell;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::fs_ops::{EntryKind, entry_size};
use crate::trashinfo::TrashInfo;

/// A valid trash item: a content entry and a decodable record sharing one trash name.
#[derive(Debug, Clone)]
pub struct TrashItem {
    trash_name: String,
    info: TrashInfo,
    kind: EntryKind,
    content_path: PathBuf,
    info_path: PathBuf,
    size: OnceCell<u64>,
}

impl TrashItem {
    pub(crate) fn new(
        trash_name: String,
        info: TrashInfo,
        kind: EntryKind,
        content_path: PathBuf,
        info_path: PathBuf,
    ) -> Self {
        Self {
            trash_name,
            info,
            kind,
            content_path,
            info_path,
            size: OnceCell::new(),
        }
    }

    pub fn trash_name(&self) -> &str {
        &self.trash_name
    }

    /// Recorded original location; `None` for adopted content of unknown origin.
    pub fn original_path(&self) -> Option<&Path> {
        self.info.original_path()
    }

    pub fn original_name(&self) -> Option<&OsStr> {
        self.original_path().and_then(Path::file_name)
    }

    pub fn deleted_at(&self) -> NaiveDateTime {
        self.info.deleted_at()
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn content_path(&self) -> &Path {
        &self.content_path
    }

    pub fn info_path(&self) -> &Path {
        &self.info_path
    }

    pub fn info(&self) -> &TrashInfo {
        &self.info
    }

    /// Apparent size of the content, computed on first use and cached.
    /// Unreadable content counts as zero bytes.
    pub fn size(&self) -> u64 {
        *self.size.get_or_init(|| {
            entry_size(&self.content_path).unwrap_or_else(|e| {
                debug!(trash_name = %self.trash_name, error = %e, "size unavailable");
                0
            })
        })
    }

    pub fn size_if_known(&self) -> Option<u64> {
        self.size.get().copied()
    }
}
