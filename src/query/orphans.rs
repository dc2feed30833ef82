//! Orphan scan: entries that break the one-record-one-content pairing.

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::Filter;
use crate::errors::TrashError;
use crate::fs_ops::{entry_size, is_staging_name};
use crate::store::TrashStore;
use crate::trashinfo::{TrashInfo, trash_name_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanKind {
    /// Record whose content is gone (deleted externally or an interrupted trash).
    MissingContent,
    /// Content without a record (record deleted externally).
    MissingMetadata,
    /// Record that does not decode.
    CorruptMetadata,
    /// Staging entry left by an interrupted cross-device copy.
    PartialTransfer,
}

#[derive(Debug, Clone)]
pub struct OrphanItem {
    pub kind: OrphanKind,
    pub trash_name: String,
    pub content_path: Option<PathBuf>,
    pub info_path: Option<PathBuf>,
    pub original_path: Option<PathBuf>,
    pub deleted_at: Option<NaiveDateTime>,
    /// Decode failure for corrupt records.
    pub reason: Option<String>,
    size: OnceCell<u64>,
}

impl OrphanItem {
    fn new(kind: OrphanKind, trash_name: String) -> Self {
        Self {
            kind,
            trash_name,
            content_path: None,
            info_path: None,
            original_path: None,
            deleted_at: None,
            reason: None,
            size: OnceCell::new(),
        }
    }

    /// Apparent size of the content part; zero when there is none.
    pub fn size(&self) -> u64 {
        *self.size.get_or_init(|| {
            self.content_path
                .as_deref()
                .and_then(|p| entry_size(p).ok())
                .unwrap_or(0)
        })
    }

    /// Filter fields the orphan has no value for are not applied.
    fn matches(&self, filter: &Filter) -> bool {
        if let Some(t) = self.deleted_at
            && !filter.time_matches(t)
        {
            return false;
        }
        let original_name = self
            .original_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy());
        if !filter.name_matches(&self.trash_name, original_name.as_deref()) {
            return false;
        }
        if let Some(p) = self.original_path.as_deref()
            && !filter.prefix_matches(p)
        {
            return false;
        }
        if self.content_path.is_some() && filter.has_size_bound() {
            return filter.size_matches(self.size());
        }
        true
    }
}

impl TrashStore {
    /// Every orphan matching `filter`, ordered by trash name.
    pub fn orphans(&self, filter: &Filter) -> Result<Vec<OrphanItem>> {
        let mut found = Vec::new();

        for file_name in read_names(self.info_dir())? {
            let Some(name) = file_name.to_str().and_then(trash_name_of) else {
                continue;
            };
            let info_path = self.info_path(name);
            let content_path = self.content_path(name);
            let has_content = fs::symlink_metadata(&content_path).is_ok();

            let mut orphan = match TrashInfo::load(&info_path) {
                Ok(_) if has_content => continue,
                Ok(info) => {
                    let mut o = OrphanItem::new(OrphanKind::MissingContent, name.to_string());
                    o.original_path = info.original_path().map(Path::to_path_buf);
                    o.deleted_at = Some(info.deleted_at());
                    o
                }
                Err(e) => {
                    let mut o = OrphanItem::new(OrphanKind::CorruptMetadata, name.to_string());
                    o.reason = Some(match e.downcast_ref::<TrashError>() {
                        Some(TrashError::CorruptMetadata { reason, .. }) => reason.clone(),
                        _ => e.to_string(),
                    });
                    if has_content {
                        o.content_path = Some(content_path);
                    }
                    o
                }
            };
            orphan.info_path = Some(info_path);
            found.push(orphan);
        }

        for file_name in read_names(self.files_dir())? {
            let Some(name) = file_name.to_str() else {
                warn!(name = ?file_name, "skipping content entry with a non UTF-8 name");
                continue;
            };
            let kind = if is_staging_name(name) {
                OrphanKind::PartialTransfer
            } else if fs::symlink_metadata(self.info_path(name)).is_err() {
                OrphanKind::MissingMetadata
            } else {
                continue;
            };
            let mut o = OrphanItem::new(kind, name.to_string());
            o.content_path = Some(self.content_path(name));
            found.push(o);
        }

        found.retain(|o| o.matches(filter));
        found.sort_by(|a, b| a.trash_name.cmp(&b.trash_name));
        debug!(count = found.len(), "orphan scan complete");
        Ok(found)
    }
}

fn read_names(dir: &Path) -> Result<Vec<std::ffi::OsString>> {
    let entries = fs::read_dir(dir).map_err(|e| TrashError::Environment {
        path: dir.to_path_buf(),
        reason: format!("cannot read directory: {e}"),
    })?;
    Ok(entries.filter_map(|e| e.ok()).map(|e| e.file_name()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fs_ops::{create_exclusive, staging_path};
    use crate::query::NamePattern;
    use chrono::Local;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, TrashStore) {
        let td = tempdir().unwrap();
        let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
        (td, store)
    }

    fn record(store: &TrashStore, name: &str, original: &str) {
        let f = create_exclusive(&store.info_path(name)).unwrap();
        TrashInfo::new(original, Local::now().naive_local()).write_to(f).unwrap();
    }

    #[test]
    fn classifies_every_kind() {
        let (_td, store) = setup();
        record(&store, "valid", "/h/valid");
        fs::write(store.content_path("valid"), b"v").unwrap();
        record(&store, "meta_only", "/h/meta_only");
        fs::write(store.content_path("content_only"), b"c").unwrap();
        fs::write(store.info_path("broken"), b"[Trash Info]\nPath=/x\n").unwrap();
        fs::write(staging_path(store.files_dir()), b"partial").unwrap();

        let orphans = store.orphans(&Filter::everything()).unwrap();
        let kinds: Vec<_> = orphans.iter().map(|o| (o.trash_name.as_str(), o.kind)).collect();
        assert!(kinds.contains(&("meta_only", OrphanKind::MissingContent)));
        assert!(kinds.contains(&("content_only", OrphanKind::MissingMetadata)));
        assert!(kinds.contains(&("broken", OrphanKind::CorruptMetadata)));
        assert!(kinds.iter().any(|(_, k)| *k == OrphanKind::PartialTransfer));
        assert!(!kinds.iter().any(|(n, _)| *n == "valid"));
        assert_eq!(orphans.len(), 4);
    }

    #[test]
    fn filter_fields_without_values_are_ignored() {
        let (_td, store) = setup();
        fs::write(store.content_path("content_only"), b"c").unwrap();
        record(&store, "meta_only", "/h/docs/meta_only");
        let f = Filter {
            original_path_prefix: Some(PathBuf::from("/elsewhere")),
            ..Filter::default()
        };
        let names: Vec<_> = store.orphans(&f).unwrap().into_iter().map(|o| o.trash_name).collect();
        assert_eq!(names, ["content_only"]);

        let by_name = Filter {
            name_pattern: Some(NamePattern::new("meta_*").unwrap()),
            ..Filter::default()
        };
        assert_eq!(store.orphans(&by_name).unwrap().len(), 1);
    }
}
