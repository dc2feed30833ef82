//! Verified copy used whenever a rename cannot cross filesystems:
//! - Copies into a hidden staging name next to the destination
//! - Directory trees: directories first, regular files in parallel, symlinks recreated as links
//! - Verifies entry count and byte total against the source before committing
//! - Commits staging -> destination without clobbering, then optionally removes the source
//!
//! A failure at any step removes the staging copy and leaves the source untouched.

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::TrashError;
use crate::shutdown;

use super::atomic::commit_noclobber;
use super::entry::{TreeStats, remove_entry, tree_stats};
use super::helpers::io_error_with_help;
use super::io_copy::copy_streaming;
use super::meta::preserve_metadata;
use super::util::staging_path;

/// Copy `src` to `dst` (which must not exist) and check the copy matches the source.
/// Returns the verified stats. On error the partial `dst` is removed.
pub fn copy_verified(src: &Path, dst: &Path) -> Result<TreeStats> {
    let expected = tree_stats(src).map_err(io_error_with_help("measure source", src))?;
    let result = copy_tree(src, dst).and_then(|()| {
        let actual = tree_stats(dst).map_err(io_error_with_help("measure copy", dst))?;
        if actual != expected {
            bail!(
                "copy verification failed for '{}': expected {} entries/{} bytes, found {} entries/{} bytes",
                src.display(),
                expected.entries,
                expected.bytes,
                actual.entries,
                actual.bytes
            );
        }
        Ok(())
    });
    if let Err(e) = result {
        match remove_entry(dst) {
            Err(rm) if rm.kind() != std::io::ErrorKind::NotFound => {
                warn!(path = %dst.display(), error = %rm, "could not remove partial copy");
            }
            _ => {}
        }
        return Err(e);
    }
    Ok(expected)
}

/// Copy `src` into a staging name beside `dst`, verify it, then commit it to `dst`.
/// With `remove_source`, the source is deleted only after the commit succeeded.
pub fn copy_and_commit(src: &Path, dst: &Path, remove_source: bool) -> Result<TreeStats> {
    let dir = dst
        .parent()
        .ok_or_else(|| anyhow!("destination has no parent: {}", dst.display()))?;
    let staging = staging_path(dir);
    debug!(src = %src.display(), staging = %staging.display(), "copying via staging entry");

    let stats = copy_verified(src, &staging)?;
    if let Err(e) = commit_noclobber(&staging, dst) {
        let _ = remove_entry(&staging);
        return Err(io_error_with_help("commit copied entry", dst)(e));
    }

    if remove_source {
        remove_entry(src).map_err(io_error_with_help("remove source after copy", src))?;
    }
    Ok(stats)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src).map_err(io_error_with_help("stat", src))?;
    let ft = meta.file_type();

    if ft.is_symlink() {
        return copy_symlink(src, dst);
    }
    if ft.is_file() {
        copy_streaming(src, dst).map_err(io_error_with_help("copy file", dst))?;
        preserve_metadata(&meta, dst).map_err(io_error_with_help("preserve metadata", dst))?;
        return Ok(());
    }
    if !ft.is_dir() {
        return Err(refuse_special(src));
    }

    let mut dirs: Vec<(PathBuf, fs::Metadata)> = Vec::new();
    let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut links: Vec<(PathBuf, PathBuf)> = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        let ft = entry.file_type();
        if ft.is_dir() {
            let m = entry.metadata().with_context(|| format!("stat {}", entry.path().display()))?;
            fs::create_dir(&target).map_err(io_error_with_help("create directory", &target))?;
            dirs.push((target, m));
        } else if ft.is_symlink() {
            links.push((entry.into_path(), target));
        } else if ft.is_file() {
            files.push((entry.into_path(), target));
        } else {
            return Err(refuse_special(entry.path()));
        }
    }

    files.par_iter().try_for_each(|(from, to)| -> Result<()> {
        if shutdown::is_requested() {
            return Err(TrashError::Interrupted.into());
        }
        let m = fs::symlink_metadata(from).map_err(io_error_with_help("stat", from))?;
        copy_streaming(from, to).map_err(io_error_with_help("copy file", to))?;
        preserve_metadata(&m, to).map_err(io_error_with_help("preserve metadata", to))?;
        Ok(())
    })?;

    for (from, to) in &links {
        copy_symlink(from, to)?;
    }

    // Deepest first, so setting a parent's mtime is not undone by writes into a child.
    for (dir, m) in dirs.iter().rev() {
        preserve_metadata(m, dir).map_err(io_error_with_help("preserve metadata", dir))?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(io_error_with_help("read symlink", src))?;
    std::os::unix::fs::symlink(&target, dst).map_err(io_error_with_help("create symlink", dst))?;
    if let Ok(m) = fs::symlink_metadata(src) {
        let _ = preserve_metadata(&m, dst);
    }
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _dst: &Path) -> Result<()> {
    Err(TrashError::Refused {
        path: src.to_path_buf(),
        reason: "copying symbolic links across volumes is not supported on this platform".into(),
    }
    .into())
}

fn refuse_special(path: &Path) -> anyhow::Error {
    TrashError::Refused {
        path: path.to_path_buf(),
        reason: "special files (sockets, fifos, devices) cannot be copied".into(),
    }
    .into()
}
