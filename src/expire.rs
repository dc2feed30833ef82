//! Expirer: permanent deletion by filter and orphan reconciliation.
//!
//! Items are removed content first and record last, so an interrupted purge leaves a
//! metadata-only orphan that a later reconciliation finds.
//!
//! Reconciliation leaves alone anything that may still belong to a running trash or
//! restore: records younger than the grace window that have no content yet, and staging
//! entries whose owner is alive or which started within the window.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::errors::TrashError;
use crate::fs_ops::{create_exclusive, fsync_dir, io_error_with_help, parse_staging_name, remove_entry};
use crate::platform::process_alive;
use crate::query::{Filter, ListOptions, OrphanItem, OrphanKind, TrashItem};
use crate::report::{ItemFailure, PurgeReport};
use crate::shutdown;
use crate::store::TrashStore;
use crate::trashinfo::TrashInfo;

/// What `Expirer::orphans` does with what it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reconcile {
    /// Report only.
    #[default]
    None,
    /// Drop records without content and partial transfers; give ownerless content an
    /// unknown-origin record.
    Adopt,
    /// Like `Adopt`, but ownerless content is deleted instead of adopted.
    Purge,
}

/// Orphans found by a scan and what reconciliation did about them.
#[derive(Debug, Default)]
pub struct OrphanReport {
    pub orphans: Vec<OrphanItem>,
    pub outcome: PurgeReport,
}

/// Default age below which an incomplete entry is treated as in flight.
pub const RECONCILE_GRACE: Duration = Duration::from_secs(15 * 60);

pub struct Expirer<'a> {
    store: &'a TrashStore,
    grace: Duration,
}

impl<'a> Expirer<'a> {
    pub fn new(store: &'a TrashStore) -> Self {
        Self {
            store,
            grace: RECONCILE_GRACE,
        }
    }

    /// Override the in-flight grace window used by `orphans`.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Permanently delete every item matching `filter`.
    pub fn empty(&self, filter: &Filter) -> Result<PurgeReport> {
        let items: Vec<TrashItem> = self.store.list(filter, ListOptions::default())?.collect();
        let mut report = PurgeReport::default();
        for item in items {
            if shutdown::is_requested() {
                report.failures.push(ItemFailure::new(
                    item.trash_name(),
                    item.original_path().map(Path::to_path_buf),
                    TrashError::Interrupted.into(),
                ));
                continue;
            }
            match purge_item(&item) {
                Ok(bytes) => report.record_removed(bytes),
                Err(e) => {
                    warn!(trash_name = %item.trash_name(), error = %e, "purge failed");
                    report.failures.push(ItemFailure::new(
                        item.trash_name(),
                        item.original_path().map(Path::to_path_buf),
                        e,
                    ));
                }
            }
        }
        if report.count > 0 {
            let _ = fsync_dir(self.store.info_dir());
        }
        info!(count = report.count, bytes = report.bytes, failures = report.failures.len(), "Emptied trash");
        Ok(report)
    }

    /// Delete items trashed strictly before `before`. Running it twice deletes nothing
    /// the second time.
    pub fn expire(&self, before: NaiveDateTime) -> Result<PurgeReport> {
        debug!(before = %before, "expiring items");
        self.empty(&Filter::before(before))
    }

    /// Scan for orphans matching `filter` and reconcile them as requested.
    /// Corrupt records whose content still exists are never touched.
    pub fn orphans(&self, filter: &Filter, reconcile: Reconcile) -> Result<OrphanReport> {
        let orphans = self.store.orphans(filter)?;
        let mut outcome = PurgeReport::default();
        if reconcile != Reconcile::None {
            for orphan in &orphans {
                if shutdown::is_requested() {
                    outcome.failures.push(ItemFailure::new(
                        orphan.trash_name.clone(),
                        orphan.original_path.clone(),
                        TrashError::Interrupted.into(),
                    ));
                    continue;
                }
                if let Err(e) = self.reconcile_one(orphan, reconcile, &mut outcome) {
                    warn!(trash_name = %orphan.trash_name, kind = ?orphan.kind, error = %e, "reconcile failed");
                    outcome.failures.push(ItemFailure::new(
                        orphan.trash_name.clone(),
                        orphan.original_path.clone(),
                        e,
                    ));
                }
            }
            let _ = fsync_dir(self.store.info_dir());
            info!(
                removed = outcome.count,
                bytes = outcome.bytes,
                adopted = outcome.adopted.len(),
                skipped = outcome.skipped.len(),
                "Reconciled orphans"
            );
        }
        Ok(OrphanReport { orphans, outcome })
    }

    fn reconcile_one(&self, orphan: &OrphanItem, reconcile: Reconcile, out: &mut PurgeReport) -> Result<()> {
        if self.in_flight(orphan) {
            debug!(trash_name = %orphan.trash_name, kind = ?orphan.kind, "may belong to a running operation; left alone");
            out.skipped.push(orphan.trash_name.clone());
            return Ok(());
        }
        match orphan.kind {
            OrphanKind::MissingContent => {
                remove_record(orphan)?;
                out.record_removed(0);
            }
            OrphanKind::PartialTransfer => {
                let bytes = orphan.size();
                remove_content(orphan)?;
                out.record_removed(bytes);
            }
            OrphanKind::CorruptMetadata if orphan.content_path.is_some() => {
                debug!(trash_name = %orphan.trash_name, "corrupt record with content left for manual repair");
                out.skipped.push(orphan.trash_name.clone());
            }
            OrphanKind::CorruptMetadata => {
                remove_record(orphan)?;
                out.record_removed(0);
            }
            OrphanKind::MissingMetadata if reconcile == Reconcile::Purge => {
                let bytes = orphan.size();
                remove_content(orphan)?;
                out.record_removed(bytes);
            }
            OrphanKind::MissingMetadata => {
                self.adopt(orphan)?;
                out.adopted.push(orphan.trash_name.clone());
            }
        }
        Ok(())
    }

    /// Whether `orphan` could be the intermediate state of another invocation: a record
    /// not yet joined by its content (possibly still empty), or a staging copy.
    fn in_flight(&self, orphan: &OrphanItem) -> bool {
        let marker = match orphan.kind {
            OrphanKind::MissingContent => orphan.info_path.as_deref(),
            OrphanKind::CorruptMetadata if orphan.content_path.is_none() => orphan.info_path.as_deref(),
            OrphanKind::PartialTransfer => {
                if let Some((pid, started)) = parse_staging_name(&orphan.trash_name) {
                    if pid != std::process::id() && process_alive(pid) {
                        return true;
                    }
                    return self.is_recent(started);
                }
                orphan.content_path.as_deref()
            }
            OrphanKind::CorruptMetadata | OrphanKind::MissingMetadata => return false,
        };
        marker
            .and_then(|p| fs::symlink_metadata(p).ok())
            .and_then(|m| m.modified().ok())
            .is_some_and(|t| self.is_recent(t))
    }

    /// Timestamps in the future count as recent.
    fn is_recent(&self, t: SystemTime) -> bool {
        t.elapsed().map_or(true, |age| age < self.grace)
    }

    /// Give ownerless content an unknown-origin record dated by its mtime (else now).
    fn adopt(&self, orphan: &OrphanItem) -> Result<()> {
        let deleted_at = orphan
            .content_path
            .as_deref()
            .and_then(|p| fs::symlink_metadata(p).ok())
            .and_then(|m| m.modified().ok())
            .map(|t| DateTime::<Local>::from(t).naive_local())
            .unwrap_or_else(|| Local::now().naive_local());
        let info_path = self.store.info_path(&orphan.trash_name);
        let file = create_exclusive(&info_path).map_err(io_error_with_help("create trashinfo", &info_path))?;
        if let Err(e) = TrashInfo::unknown_origin(deleted_at).write_to(file) {
            let _ = fs::remove_file(&info_path);
            return Err(io_error_with_help("write trashinfo", &info_path)(e));
        }
        info!(trash_name = %orphan.trash_name, "Adopted ownerless content");
        Ok(())
    }
}

/// Size first, then content, then record.
fn purge_item(item: &TrashItem) -> Result<u64> {
    let bytes = item.size();
    match remove_entry(item.content_path()) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error_with_help("remove trashed content", item.content_path())(e)),
    }
    fs::remove_file(item.info_path()).map_err(io_error_with_help("remove trashinfo", item.info_path()))?;
    debug!(trash_name = %item.trash_name(), bytes, "purged item");
    Ok(bytes)
}

fn remove_record(orphan: &OrphanItem) -> Result<()> {
    if let Some(p) = orphan.info_path.as_deref() {
        fs::remove_file(p).map_err(io_error_with_help("remove trashinfo", p))?;
    }
    Ok(())
}

fn remove_content(orphan: &OrphanItem) -> Result<()> {
    if let Some(p) = orphan.content_path.as_deref() {
        remove_entry(p).map_err(io_error_with_help("remove orphaned content", p))?;
    }
    Ok(())
}
