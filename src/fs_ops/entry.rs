//! Trash payload kinds and whole-entry helpers.
//! Files, directories and symlinks are interchangeable payloads; the kind only matters
//! for size computation, copy traversal and removal.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    /// Classify without following symlinks. Special files (fifos, sockets) count as files.
    pub fn of(ft: fs::FileType) -> Self {
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    pub fn probe(path: &Path) -> io::Result<Self> {
        fs::symlink_metadata(path).map(|m| Self::of(m.file_type()))
    }
}

/// Entry count and apparent byte total of a tree (symlinks are not followed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub entries: u64,
    pub bytes: u64,
}

pub fn tree_stats(path: &Path) -> io::Result<TreeStats> {
    let meta = fs::symlink_metadata(path)?;
    if !meta.is_dir() {
        return Ok(TreeStats {
            entries: 1,
            bytes: meta.len(),
        });
    }

    let mut stats = TreeStats::default();
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        let m = entry.metadata()?;
        stats.entries += 1;
        if !m.is_dir() {
            stats.bytes = stats.bytes.saturating_add(m.len());
        }
    }
    Ok(stats)
}

/// Apparent size in bytes of a file, symlink or directory tree.
pub fn entry_size(path: &Path) -> io::Result<u64> {
    tree_stats(path).map(|s| s.bytes)
}

/// Remove a file, symlink or directory tree. Read-only directories inside a tree are
/// made writable and the removal retried once.
pub fn remove_entry(path: &Path) -> io::Result<()> {
    match EntryKind::probe(path)? {
        EntryKind::Directory => match fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                debug!(path = %path.display(), "retrying removal after clearing read-only directories");
                make_dirs_writable(path);
                fs::remove_dir_all(path)
            }
            other => other,
        },
        EntryKind::File | EntryKind::Symlink => fs::remove_file(path),
    }
}

fn make_dirs_writable(root: &Path) {
    for entry in WalkDir::new(root).follow_links(false).into_iter().filter_map(Result::ok) {
        if entry.file_type().is_dir() {
            let _ = crate::platform::make_dir_writable(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stats_of_tree() {
        let td = tempdir().unwrap();
        let d = td.path().join("d");
        fs::create_dir_all(d.join("sub")).unwrap();
        fs::write(d.join("a"), b"12345").unwrap();
        fs::write(d.join("sub/b"), b"123").unwrap();
        let s = tree_stats(&d).unwrap();
        assert_eq!(s, TreeStats { entries: 4, bytes: 8 });
        assert_eq!(entry_size(&d.join("a")).unwrap(), 5);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let td = tempdir().unwrap();
        let big = td.path().join("big");
        fs::write(&big, vec![0u8; 4096]).unwrap();
        let link = td.path().join("link");
        std::os::unix::fs::symlink(&big, &link).unwrap();
        assert_eq!(EntryKind::probe(&link).unwrap(), EntryKind::Symlink);
        assert!(entry_size(&link).unwrap() < 4096);
    }

    #[test]
    fn remove_entry_handles_all_kinds() {
        let td = tempdir().unwrap();
        let f = td.path().join("f");
        fs::write(&f, b"x").unwrap();
        let d = td.path().join("d");
        fs::create_dir_all(d.join("deep/er")).unwrap();
        fs::write(d.join("deep/er/file"), b"x").unwrap();
        remove_entry(&f).unwrap();
        remove_entry(&d).unwrap();
        assert!(!f.exists());
        assert!(!d.exists());
    }
}
