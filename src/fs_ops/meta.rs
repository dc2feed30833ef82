//! Metadata preservation for copied entries.
//! Copies permissions and timestamps so a cross-device trash or restore looks like a move.

use filetime::{FileTime, set_file_times, set_symlink_file_times};
use std::fs;
use std::io;
use std::path::Path;

use super::entry::EntryKind;

/// Apply `src_meta`'s timestamps (and, for non-symlinks, permissions) to `dest`.
pub(super) fn preserve_metadata(src_meta: &fs::Metadata, dest: &Path) -> io::Result<()> {
    let mtime = FileTime::from_last_modification_time(src_meta);
    let atime = FileTime::from_last_access_time(src_meta);

    if EntryKind::of(src_meta.file_type()) == EntryKind::Symlink {
        return set_symlink_file_times(dest, atime, mtime);
    }

    fs::set_permissions(dest, src_meta.permissions())?;
    set_file_times(dest, atime, mtime)
}
