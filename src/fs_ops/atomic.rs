//! Atomic filesystem primitives.
//! - Exclusive create (the metadata commit and collision check in one step).
//! - Durable rename: rename, then best-effort fsync of the destination directory.
//! - No-clobber commit: never replaces an existing destination.
//! - Replace: swaps a fully prepared entry in for an existing one.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::warn;

use super::entry::{EntryKind, remove_entry};
use super::util::{fsync_dir, is_cross_device, staging_path};

// Attempts at finding an unused aside name before giving up.
const ASIDE_ATTEMPTS: usize = 8;

/// Create `path`, failing with `AlreadyExists` if anything is there (including a dangling symlink).
pub fn create_exclusive(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

pub fn rename_durable(src: &Path, dst: &Path) -> io::Result<()> {
    fs::rename(src, dst)?;
    if let Some(parent) = dst.parent() {
        // Ignore fsync errors to avoid turning a successful rename into a failure.
        let _ = fsync_dir(parent);
    }
    Ok(())
}

/// Move `src` to `dst` on the same filesystem without replacing an existing `dst`.
///
/// Non-directories are hard-linked then unlinked, so a concurrently created `dst`
/// surfaces as `AlreadyExists`. Directories use an existence check followed by rename.
/// A cross-device error is returned unchanged so callers can fall back to copying.
pub fn commit_noclobber(src: &Path, dst: &Path) -> io::Result<()> {
    let kind = EntryKind::probe(src)?;
    if kind != EntryKind::Directory {
        match fs::hard_link(src, dst) {
            Ok(()) => {
                fs::remove_file(src)?;
                if let Some(parent) = dst.parent() {
                    let _ = fsync_dir(parent);
                }
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists || is_cross_device(&e) => {
                return Err(e);
            }
            // Filesystems without hard links: fall through to the checked rename.
            Err(_) => {}
        }
    }

    if fs::symlink_metadata(dst).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", dst.display()),
        ));
    }
    rename_durable(src, dst)
}

/// Put the prepared entry `staged` at `dst`, replacing whatever is there.
///
/// A non-directory over a non-directory is one atomic rename. When either side is a
/// directory the old entry is first renamed aside, and it is only removed once `staged`
/// is in place; if that rename fails the old entry is put back.
pub fn replace_entry(staged: &Path, dst: &Path) -> io::Result<()> {
    let staged_is_dir = EntryKind::probe(staged)? == EntryKind::Directory;
    let dst_is_dir = match EntryKind::probe(dst) {
        Ok(kind) => kind == EntryKind::Directory,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return rename_durable(staged, dst),
        Err(e) => return Err(e),
    };
    if !staged_is_dir && !dst_is_dir {
        return rename_durable(staged, dst);
    }

    let dir = dst
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    let aside = (0..ASIDE_ATTEMPTS)
        .map(|_| staging_path(dir))
        .find(|p| p != staged && fs::symlink_metadata(p).is_err())
        .ok_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "no free name to move the old entry aside"))?;
    fs::rename(dst, &aside)?;
    if let Err(e) = fs::rename(staged, dst) {
        if let Err(back) = fs::rename(&aside, dst) {
            warn!(aside = %aside.display(), error = %back, "could not put the old entry back");
        }
        return Err(e);
    }
    let _ = fsync_dir(dir);
    if let Err(e) = remove_entry(&aside) {
        warn!(aside = %aside.display(), error = %e, "replaced entry left behind");
    }
    Ok(())
}
