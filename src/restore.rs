//! Restorer: put trashed items back at their original (or a chosen) location.
//!
//! Move mode removes the content and then the record only after the destination is in
//! place; copy mode never touches the trash item. Destinations are committed with a
//! no-clobber primitive, so an occupied destination is reported, never replaced, unless
//! `OnConflict::Overwrite` is requested. Overwrites prepare the restored entry under a
//! staging name beside the destination and swap it in only once it is complete.

use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::SpaceCheck;
use crate::errors::{Candidate, TrashError};
use crate::fs_ops::{
    OnConflict, commit_noclobber, copy_and_commit, copy_verified, device_of, ensure_space_for_copy,
    entry_size, fsync_dir, io_error_with_help, is_cross_device, remove_entry, replace_entry,
    resolve_destination, staging_path,
};
use crate::query::{Selector, TrashItem};
use crate::report::{BatchReport, ItemFailure};
use crate::shutdown;
use crate::store::TrashStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMode {
    /// Take the item out of the trash.
    #[default]
    Move,
    /// Leave the item in the trash and restore a copy.
    Copy,
}

/// What to do when a selector matches more than one item. Callers must choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ambiguity {
    /// Fail with `TrashError::Ambiguous` listing the candidates.
    Refuse,
    /// Restore every match.
    All,
    /// Restore the most recently deleted match.
    Newest,
}

#[derive(Debug, Clone, Copy)]
pub struct RestoreOptions {
    pub mode: RestoreMode,
    pub on_conflict: OnConflict,
    pub ambiguity: Ambiguity,
}

impl RestoreOptions {
    /// Move mode, fail on conflicts, with the caller's ambiguity decision.
    pub fn new(ambiguity: Ambiguity) -> Self {
        Self {
            mode: RestoreMode::Move,
            on_conflict: OnConflict::Fail,
            ambiguity,
        }
    }
}

/// A successfully restored item.
#[derive(Debug, Clone, Serialize)]
pub struct Restored {
    pub trash_name: String,
    pub destination: PathBuf,
    pub mode: RestoreMode,
}

pub struct Restorer<'a> {
    store: &'a TrashStore,
}

impl<'a> Restorer<'a> {
    pub fn new(store: &'a TrashStore) -> Self {
        Self { store }
    }

    /// Restore one item. `into_dir` places it inside that directory under its original
    /// file name (the trash name when the origin is unknown); otherwise it goes back to
    /// the recorded original path.
    pub fn restore(&self, item: &TrashItem, into_dir: Option<&Path>, opts: &RestoreOptions) -> Result<Restored> {
        let target = match into_dir {
            Some(dir) => {
                let name = item
                    .original_name()
                    .map(|n| n.to_os_string())
                    .unwrap_or_else(|| item.trash_name().into());
                dir.join(name)
            }
            None => item
                .original_path()
                .ok_or_else(|| TrashError::UnknownOrigin(item.trash_name().to_string()))?
                .to_path_buf(),
        };
        if fs::symlink_metadata(item.content_path()).is_err() {
            return Err(TrashError::NotFound(item.trash_name().to_string()).into());
        }

        let parent = target
            .parent()
            .ok_or_else(|| anyhow::anyhow!("restore target has no parent: {}", target.display()))?;
        fs::create_dir_all(parent).map_err(io_error_with_help("create parent directory", parent))?;

        let dest = resolve_destination(&target, opts.on_conflict);
        let occupied = fs::symlink_metadata(&dest).is_ok();
        if occupied && opts.on_conflict != OnConflict::Overwrite {
            return Err(self.conflict(item, &dest));
        }

        match (opts.mode, occupied) {
            (mode, true) => self.overwrite(item, parent, &dest, mode)?,
            (RestoreMode::Copy, false) => {
                self.preflight_space(item, parent)?;
                copy_and_commit(item.content_path(), &dest, false).map_err(|e| self.map_conflict(e, item, &dest))?;
            }
            (RestoreMode::Move, false) => self.move_out(item, parent, &dest)?,
        }
        if opts.mode == RestoreMode::Move {
            fs::remove_file(item.info_path()).map_err(io_error_with_help("remove trashinfo", item.info_path()))?;
            let _ = fsync_dir(self.store.info_dir());
        }

        info!(
            trash_name = %item.trash_name(),
            dest = %dest.display(),
            mode = ?opts.mode,
            "Restored item"
        );
        Ok(Restored {
            trash_name: item.trash_name().to_string(),
            destination: dest,
            mode: opts.mode,
        })
    }

    /// Resolve a selector and apply the ambiguity decision.
    pub fn resolve(&self, selector: &Selector, ambiguity: Ambiguity) -> Result<Vec<TrashItem>> {
        let mut matches = self.store.select(selector)?;
        if matches.len() <= 1 {
            return Ok(matches);
        }
        match ambiguity {
            Ambiguity::All => Ok(matches),
            Ambiguity::Newest => Ok(matches.pop().into_iter().collect()),
            Ambiguity::Refuse => Err(TrashError::Ambiguous {
                selector: selector.to_string(),
                candidates: matches
                    .iter()
                    .map(|i| Candidate {
                        trash_name: i.trash_name().to_string(),
                        original_path: i.original_path().map(Path::to_path_buf),
                        deleted_at: i.deleted_at(),
                    })
                    .collect(),
            }
            .into()),
        }
    }

    /// Restore every selector independently; failures are collected per item.
    pub fn restore_all(
        &self,
        selectors: &[Selector],
        into_dir: Option<&Path>,
        opts: &RestoreOptions,
    ) -> Result<BatchReport<Restored>> {
        let mut report = BatchReport::default();
        for selector in selectors {
            if shutdown::is_requested() {
                report.push_failure(ItemFailure::new(selector.to_string(), None, TrashError::Interrupted.into()));
                continue;
            }
            let items = match self.resolve(selector, opts.ambiguity) {
                Ok(items) => items,
                Err(e) => {
                    if e.downcast_ref::<TrashError>().is_some_and(TrashError::is_environment) {
                        return Err(e);
                    }
                    report.push_failure(ItemFailure::new(selector.to_string(), None, e));
                    continue;
                }
            };
            for item in items {
                match self.restore(&item, into_dir, opts) {
                    Ok(r) => report.push_ok(r),
                    Err(e) => {
                        warn!(trash_name = %item.trash_name(), error = %e, "restore failed");
                        report.push_failure(ItemFailure::new(
                            item.trash_name(),
                            item.original_path().map(Path::to_path_buf),
                            e,
                        ));
                    }
                }
            }
        }
        Ok(report)
    }

    fn same_device(&self, item: &TrashItem, parent: &Path) -> bool {
        match (device_of(item.content_path()).ok().flatten(), device_of(parent).ok().flatten()) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Replace an existing destination. The restored entry is prepared under a staging
    /// name in the destination directory (renamed there on the same device, otherwise a
    /// verified copy) and swapped in last. Any failure before the swap leaves the existing
    /// destination and the trash item as they were.
    fn overwrite(&self, item: &TrashItem, parent: &Path, dest: &Path, mode: RestoreMode) -> Result<()> {
        let staging = staging_path(parent);
        let mut moved = false;
        if mode == RestoreMode::Move && self.same_device(item, parent) {
            match commit_noclobber(item.content_path(), &staging) {
                Ok(()) => moved = true,
                Err(e) if is_cross_device(&e) => {
                    debug!(trash_name = %item.trash_name(), "rename crossed devices; copying instead");
                }
                Err(e) => return Err(io_error_with_help("stage restore", &staging)(e)),
            }
        }
        if !moved {
            self.preflight_space(item, parent)?;
            copy_verified(item.content_path(), &staging)?;
        }

        debug!(dest = %dest.display(), "replacing existing destination");
        if let Err(e) = replace_entry(&staging, dest) {
            let undo = if moved {
                commit_noclobber(&staging, item.content_path())
            } else {
                remove_entry(&staging)
            };
            if let Err(u) = undo {
                warn!(staging = %staging.display(), error = %u, "could not clean up staged restore");
            }
            return Err(io_error_with_help("replace existing destination", dest)(e));
        }
        if mode == RestoreMode::Move && !moved {
            remove_entry(item.content_path()).map_err(io_error_with_help("remove trashed content", item.content_path()))?;
        }
        Ok(())
    }

    fn move_out(&self, item: &TrashItem, parent: &Path, dest: &Path) -> Result<()> {
        if self.same_device(item, parent) {
            match commit_noclobber(item.content_path(), dest) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(self.conflict(item, dest)),
                Err(e) if is_cross_device(&e) => {
                    debug!(trash_name = %item.trash_name(), "rename crossed devices; copying instead");
                }
                Err(e) => return Err(io_error_with_help("restore", dest)(e)),
            }
        }
        self.preflight_space(item, parent)?;
        copy_and_commit(item.content_path(), dest, false).map_err(|e| self.map_conflict(e, item, dest))?;
        remove_entry(item.content_path()).map_err(io_error_with_help("remove trashed content", item.content_path()))?;
        Ok(())
    }

    fn preflight_space(&self, item: &TrashItem, dir: &Path) -> Result<()> {
        if self.store.config().space_check == SpaceCheck::Skip {
            return Ok(());
        }
        let required = entry_size(item.content_path()).map_err(io_error_with_help("estimate size", item.content_path()))?;
        ensure_space_for_copy(dir, required)
    }

    fn conflict(&self, item: &TrashItem, dest: &Path) -> anyhow::Error {
        TrashError::DestinationConflict {
            trash_name: item.trash_name().to_string(),
            dest: dest.to_path_buf(),
        }
        .into()
    }

    /// A racing creator of `dest` surfaces from the copy path as a plain io error.
    fn map_conflict(&self, e: anyhow::Error, item: &TrashItem, dest: &Path) -> anyhow::Error {
        if e.downcast_ref::<TrashError>().is_none() && fs::symlink_metadata(dest).is_ok() {
            return self.conflict(item, dest);
        }
        e
    }
}
