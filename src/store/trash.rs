//! The trash protocol.
//!
//! 1. Reserve a trash name by exclusively creating `info/<name>.trashinfo` (fsynced with
//!    its directory). A lost race is a name collision and the next candidate is tried.
//! 2. Move the content to `files/<name>`: a no-clobber rename on the same device, a
//!    verified staging copy otherwise.
//! 3. If the move fails before the content reached `files/<name>`, the record is removed
//!    again. Content that did arrive keeps its record, even when the original could not be
//!    removed afterwards.
//!
//! The record always exists before the content, so an interruption can only leave a
//! metadata-only orphan, never untracked content.

use anyhow::{Context, Result};
use chrono::Local;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::TrashStore;
use super::names::{MAX_NAME_ATTEMPTS, NameCandidates};
use crate::config::SpaceCheck;
use crate::errors::TrashError;
use crate::fs_ops::{
    EntryKind, commit_noclobber, copy_and_commit, create_exclusive, device_of, ensure_space_for_copy,
    entry_size, fsync_dir, io_error_with_help, is_cross_device, remove_entry,
};
use crate::query::TrashItem;
use crate::report::{BatchReport, ItemFailure};
use crate::shutdown;
use crate::trashinfo::TrashInfo;

impl TrashStore {
    /// Move `source` (file, directory or symlink) into the trash.
    pub fn trash(&self, source: &Path) -> Result<TrashItem> {
        let meta = fs::symlink_metadata(source).map_err(|e| -> anyhow::Error {
            if e.kind() == io::ErrorKind::NotFound {
                TrashError::SourceNotFound(source.to_path_buf()).into()
            } else {
                io_error_with_help("stat source", source)(e)
            }
        })?;
        let kind = EntryKind::of(meta.file_type());
        let original = absolute_source(source)?;
        self.refuse_overlap(&original)?;

        let cross_device = match (device_of(source).ok().flatten(), self.root_device()) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        };
        if cross_device {
            self.preflight_space(source)?;
        }

        let base = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let record = TrashInfo::new(&original, Local::now().naive_local());
        let (trash_name, info_path) = self.reserve_name(&base, &record)?;
        let content_path = self.content_path(&trash_name);

        if let Err(e) = self.move_content(source, &content_path, cross_device) {
            return Err(self.settle_failed_move(&trash_name, &info_path, &original, e));
        }

        info!(
            trash_name = %trash_name,
            path = %original.display(),
            kind = ?kind,
            cross_device,
            "Trashed item"
        );
        Ok(TrashItem::new(trash_name, record, kind, content_path, info_path))
    }

    /// Trash every source independently. Item failures are collected; an environment
    /// failure aborts the batch. After a shutdown request the remaining sources are
    /// reported as interrupted.
    pub fn trash_all<P: AsRef<Path>>(&self, sources: &[P]) -> Result<BatchReport<TrashItem>> {
        let mut report = BatchReport::default();
        for source in sources {
            let source = source.as_ref();
            if shutdown::is_requested() {
                report.push_failure(ItemFailure::new(
                    source.display().to_string(),
                    None,
                    TrashError::Interrupted.into(),
                ));
                continue;
            }
            match self.trash(source) {
                Ok(item) => report.push_ok(item),
                Err(e) => {
                    if e.downcast_ref::<TrashError>().is_some_and(TrashError::is_environment) {
                        return Err(e);
                    }
                    warn!(path = %source.display(), error = %e, "trash failed");
                    report.push_failure(ItemFailure::new(
                        source.display().to_string(),
                        Some(source.to_path_buf()),
                        e,
                    ));
                }
            }
        }
        Ok(report)
    }

    /// Content already committed under `trash_name` keeps its record and the failure is
    /// reported as `OriginalNotRemoved`. Otherwise the reserved record is withdrawn.
    fn settle_failed_move(
        &self,
        trash_name: &str,
        info_path: &Path,
        original: &Path,
        err: anyhow::Error,
    ) -> anyhow::Error {
        if fs::symlink_metadata(self.content_path(trash_name)).is_ok() {
            warn!(
                trash_name,
                path = %original.display(),
                error = %err,
                "content is in the trash but the original could not be removed"
            );
            return TrashError::OriginalNotRemoved {
                trash_name: trash_name.to_string(),
                path: original.to_path_buf(),
                reason: format!("{err:#}"),
            }
            .into();
        }
        match fs::remove_file(info_path) {
            Ok(()) => {
                let _ = fsync_dir(self.info_dir());
                debug!(trash_name, "rolled back metadata record after failed move");
            }
            Err(rm) => warn!(
                trash_name,
                error = %rm,
                "could not roll back metadata record; it remains as a metadata-only orphan"
            ),
        }
        err
    }

    fn refuse_overlap(&self, original: &Path) -> Result<()> {
        let root = self.root();
        if original.starts_with(root) || root.starts_with(original) {
            return Err(TrashError::Refused {
                path: original.to_path_buf(),
                reason: format!("overlaps the trash root {}", root.display()),
            }
            .into());
        }
        Ok(())
    }

    fn preflight_space(&self, source: &Path) -> Result<()> {
        match self.config().space_check {
            SpaceCheck::Skip => Ok(()),
            SpaceCheck::Estimate => {
                let required = entry_size(source).map_err(io_error_with_help("estimate size", source))?;
                ensure_space_for_copy(self.files_dir(), required)
            }
        }
    }

    /// Exclusively create and durably write the record under the first free candidate.
    fn reserve_name(&self, base: &str, record: &TrashInfo) -> Result<(String, PathBuf)> {
        for candidate in NameCandidates::new(base) {
            if fs::symlink_metadata(self.content_path(&candidate)).is_ok() {
                continue;
            }
            let info_path = self.info_path(&candidate);
            match create_exclusive(&info_path) {
                Ok(file) => {
                    if let Err(e) = record.write_to(file) {
                        let _ = fs::remove_file(&info_path);
                        return Err(io_error_with_help("write trashinfo", &info_path)(e));
                    }
                    fsync_dir(self.info_dir()).map_err(io_error_with_help("sync info directory", self.info_dir()))?;
                    return Ok((candidate, info_path));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let collision = TrashError::NameCollision(candidate);
                    debug!(code = collision.code(), "{collision}; trying next candidate");
                }
                Err(e) => return Err(io_error_with_help("create trashinfo", &info_path)(e)),
            }
        }
        Err(TrashError::NamesExhausted {
            name: base.to_string(),
            attempts: MAX_NAME_ATTEMPTS,
        }
        .into())
    }

    fn move_content(&self, source: &Path, dest: &Path, cross_device: bool) -> Result<()> {
        if !cross_device {
            match commit_noclobber(source, dest) {
                Ok(()) => return Ok(()),
                Err(e) if is_cross_device(&e) => {
                    debug!(src = %source.display(), "rename crossed devices; copying instead");
                    self.preflight_space(source)?;
                }
                Err(e) => return Err(io_error_with_help("move into trash", dest)(e)),
            }
        }
        copy_and_commit(source, dest, false)?;
        remove_entry(source).map_err(io_error_with_help("remove original after copy", source))?;
        Ok(())
    }
}

/// Absolute path of `source` with its parent resolved, so a symlink itself is trashed
/// rather than its target.
fn absolute_source(source: &Path) -> Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| TrashError::Refused {
        path: source.to_path_buf(),
        reason: "path has no file name".into(),
    })?;
    let parent = match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => env::current_dir().context("resolve current directory")?,
    };
    let parent = dunce::canonicalize(&parent).map_err(io_error_with_help("resolve parent", &parent))?;
    Ok(parent.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> TrashStore {
        TrashStore::open(Config::new(dir.join("Trash"))).unwrap()
    }

    #[test]
    fn trash_writes_record_then_content() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        let src = td.path().join("notes.txt");
        fs::write(&src, b"hello").unwrap();

        let item = store.trash(&src).unwrap();
        assert_eq!(item.trash_name(), "notes.txt");
        assert!(!src.exists());
        assert_eq!(fs::read(item.content_path()).unwrap(), b"hello");
        let record = TrashInfo::load(item.info_path()).unwrap();
        assert_eq!(record.original_path(), Some(dunce::canonicalize(td.path()).unwrap().join("notes.txt").as_path()));
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        for sub in ["a", "b", "c"] {
            let dir = td.path().join(sub);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("report.pdf"), sub.as_bytes()).unwrap();
        }
        let names: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|s| store.trash(&td.path().join(s).join("report.pdf")).unwrap().trash_name().to_string())
            .collect();
        assert_eq!(names, ["report.pdf", "report_2.pdf", "report_3.pdf"]);
    }

    #[test]
    fn record_reserved_by_someone_else_is_skipped() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        // A concurrent writer that has committed only its record so far.
        fs::write(store.info_path("x.log"), b"[Trash Info]\n").unwrap();
        let src = td.path().join("x.log");
        fs::write(&src, b"1").unwrap();
        let item = store.trash(&src).unwrap();
        assert_eq!(item.trash_name(), "x_2.log");
    }

    #[test]
    fn failure_after_content_commit_keeps_the_record() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        let original = td.path().join("kept.txt");
        let record = TrashInfo::new(&original, Local::now().naive_local());
        let (name, info_path) = store.reserve_name("kept.txt", &record).unwrap();
        fs::write(store.content_path(&name), b"arrived").unwrap();

        let err = store.settle_failed_move(&name, &info_path, &original, anyhow::anyhow!("unlink failed"));
        match err.downcast_ref::<TrashError>() {
            Some(TrashError::OriginalNotRemoved { trash_name, reason, .. }) => {
                assert_eq!(trash_name, "kept.txt");
                assert!(reason.contains("unlink failed"));
            }
            other => panic!("expected OriginalNotRemoved, got {other:?}"),
        }
        assert!(info_path.exists());
        assert!(store.orphans(&crate::query::Filter::everything()).unwrap().is_empty());
    }

    #[test]
    fn failure_before_content_commit_withdraws_the_record() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        let original = td.path().join("lost.txt");
        let record = TrashInfo::new(&original, Local::now().naive_local());
        let (name, info_path) = store.reserve_name("lost.txt", &record).unwrap();

        let err = store.settle_failed_move(&name, &info_path, &original, anyhow::anyhow!("copy failed"));
        assert!(err.downcast_ref::<TrashError>().is_none());
        assert_eq!(err.to_string(), "copy failed");
        assert!(!info_path.exists());
    }

    #[test]
    fn staging_shaped_source_name_is_trashable() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        let src = td.path().join(".trashctl.1.2.partial");
        fs::write(&src, b"not really partial").unwrap();
        let item = store.trash(&src).unwrap();
        assert_eq!(item.trash_name(), "_.trashctl.1.2.partial");
        assert!(store.orphans(&crate::query::Filter::everything()).unwrap().is_empty());
    }

    #[test]
    fn missing_source_is_reported() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        let err = store.trash(&td.path().join("ghost")).unwrap_err();
        assert!(matches!(err.downcast_ref::<TrashError>(), Some(TrashError::SourceNotFound(_))));
    }

    #[test]
    fn trash_root_itself_is_refused() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        let err = store.trash(&store.files_dir().to_path_buf()).unwrap_err();
        assert!(matches!(err.downcast_ref::<TrashError>(), Some(TrashError::Refused { .. })));
        let err = store.trash(td.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<TrashError>(), Some(TrashError::Refused { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_trashed_as_link() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        let link = td.path().join("dangling");
        std::os::unix::fs::symlink("/no/such/target", &link).unwrap();
        let item = store.trash(&link).unwrap();
        assert_eq!(item.kind(), EntryKind::Symlink);
        assert_eq!(fs::read_link(item.content_path()).unwrap(), PathBuf::from("/no/such/target"));
    }

    #[test]
    fn batch_collects_item_failures() {
        let td = tempdir().unwrap();
        let store = store_in(td.path());
        let ok = td.path().join("ok.txt");
        fs::write(&ok, b"1").unwrap();
        let report = store
            .trash_all(&[ok.clone(), td.path().join("missing.txt")])
            .unwrap();
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].code(), Some(70));
    }
}
