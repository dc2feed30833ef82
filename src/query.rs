//! Query engine: filtered, optionally time-ordered views of the trash inventory.
//!
//! Only valid items (record decodes and content exists) are listed. Everything else is
//! an orphan and is reported by `TrashStore::orphans` with the same filter shape.

mod filter;
mod item;
mod orphans;

pub use filter::{Filter, NamePattern};
pub use item::TrashItem;
pub use orphans::{OrphanItem, OrphanKind};

use anyhow::Result;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::errors::TrashError;
use crate::fs_ops::{EntryKind, io_error_with_help};
use crate::store::TrashStore;
use crate::trashinfo::{TrashInfo, trash_name_of};

#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Sort ascending by deletion time (ties by trash name).
    pub by_time: bool,
    /// Compute every item's size while listing.
    pub with_sizes: bool,
}

/// How a restore (or lookup) names the item(s) it wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Exact trash name.
    TrashName(String),
    /// Exact recorded original path.
    OriginalPath(PathBuf),
    /// A trash name if one matches exactly, otherwise an original file name.
    Name(String),
}

impl Selector {
    /// Text with a path separator selects by original path, anything else by name.
    pub fn parse(s: &str) -> Self {
        if s.contains(std::path::MAIN_SEPARATOR) || s.contains('/') {
            Selector::OriginalPath(PathBuf::from(s))
        } else {
            Selector::Name(s.to_string())
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::TrashName(n) | Selector::Name(n) => f.write_str(n),
            Selector::OriginalPath(p) => write!(f, "{}", p.display()),
        }
    }
}

impl TrashStore {
    /// Lazily iterate valid items matching `filter`. With a time bound or `by_time`
    /// the items are collected and sorted first.
    pub fn list<'a>(
        &'a self,
        filter: &'a Filter,
        options: ListOptions,
    ) -> Result<Box<dyn Iterator<Item = TrashItem> + 'a>> {
        let entries = fs::read_dir(self.info_dir()).map_err(|e| TrashError::Environment {
            path: self.info_dir().to_path_buf(),
            reason: format!("cannot read metadata directory: {e}"),
        })?;

        let iter = entries
            .filter_map(|entry| match entry {
                Ok(e) => Some(e.file_name()),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable metadata entry");
                    None
                }
            })
            .filter_map(|file_name| {
                let file_name = file_name.to_str()?;
                trash_name_of(file_name).map(str::to_string)
            })
            .filter_map(move |name| self.load_item(&name).ok())
            .filter(move |item| filter.matches(item))
            .map(move |item| {
                if options.with_sizes {
                    item.size();
                }
                item
            });

        if options.by_time || filter.has_time_bound() {
            let mut items: Vec<TrashItem> = iter.collect();
            items.sort_by(|a, b| {
                a.deleted_at()
                    .cmp(&b.deleted_at())
                    .then_with(|| a.trash_name().cmp(b.trash_name()))
            });
            return Ok(Box::new(items.into_iter()));
        }
        Ok(Box::new(iter))
    }

    /// Look up one valid item by trash name.
    pub fn get(&self, trash_name: &str) -> Result<TrashItem> {
        if trash_name.is_empty() || trash_name.contains('/') || trash_name == "." || trash_name == ".." {
            return Err(TrashError::NotFound(trash_name.to_string()).into());
        }
        if !self.info_path(trash_name).exists() {
            return Err(TrashError::NotFound(trash_name.to_string()).into());
        }
        self.load_item(trash_name)
    }

    /// All valid items matching `selector`, oldest first. Never empty on success.
    pub fn select(&self, selector: &Selector) -> Result<Vec<TrashItem>> {
        let mut matches = match selector {
            Selector::TrashName(name) => vec![self.get(name)?],
            Selector::Name(name) => match self.get(name) {
                Ok(item) => vec![item],
                Err(e) if is_not_found(&e) => self.collect_where(|item| {
                    item.original_name().is_some_and(|n| n.to_string_lossy() == name.as_str())
                })?,
                Err(e) => return Err(e),
            },
            Selector::OriginalPath(path) => {
                let wanted = absolutize(path)?;
                self.collect_where(|item| item.original_path() == Some(wanted.as_path()))?
            }
        };
        if matches.is_empty() {
            return Err(TrashError::NotFound(selector.to_string()).into());
        }
        matches.sort_by(|a, b| {
            a.deleted_at()
                .cmp(&b.deleted_at())
                .then_with(|| a.trash_name().cmp(b.trash_name()))
        });
        trace!(selector = %selector, count = matches.len(), "selector resolved");
        Ok(matches)
    }

    fn collect_where(&self, pred: impl Fn(&TrashItem) -> bool) -> Result<Vec<TrashItem>> {
        let all = Filter::everything();
        Ok(self.list(&all, ListOptions::default())?.filter(|i| pred(i)).collect())
    }

    /// Build an item from its record; fails with NotFound when the content is missing.
    fn load_item(&self, trash_name: &str) -> Result<TrashItem> {
        let info_path = self.info_path(trash_name);
        let info = TrashInfo::load(&info_path).inspect_err(|e| {
            debug!(trash_name = %trash_name, error = %e, "record not listed");
        })?;
        let content_path = self.content_path(trash_name);
        let meta = fs::symlink_metadata(&content_path).map_err(|e| -> anyhow::Error {
            if e.kind() == std::io::ErrorKind::NotFound {
                debug!(trash_name = %trash_name, "record without content not listed");
                TrashError::NotFound(trash_name.to_string()).into()
            } else {
                io_error_with_help("stat trashed content", &content_path)(e)
            }
        })?;
        Ok(TrashItem::new(
            trash_name.to_string(),
            info,
            EntryKind::of(meta.file_type()),
            content_path,
            info_path,
        ))
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<TrashError>(), Some(TrashError::NotFound(_)))
}

/// Absolute, lexically normalised form of a user-supplied path (no symlink resolution).
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    let mut out = PathBuf::new();
    for comp in joined.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
