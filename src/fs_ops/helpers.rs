//! I/O helper utilities.
//!
//! Small adapters that enrich io::Error with the operation, the path and a platform-aware
//! hint, for use with map_err in anyhow::Result code paths.
//!
//! Usage:
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create dir", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

fn hint_for(e: &io::Error) -> Option<&'static str> {
    #[cfg(unix)]
    {
        if let Some(code) = e.raw_os_error() {
            let hint = match code {
                libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
                libc::EXDEV => Some("different filesystem; a rename is not possible here"),
                libc::EBUSY => Some("resource busy; another process is using it"),
                libc::ENOENT => Some("path not found; it may have been removed concurrently"),
                libc::EEXIST => Some("already exists"),
                libc::ENOTEMPTY => Some("directory not empty"),
                libc::ENOSPC => Some("no space left on device"),
                libc::EROFS => Some("read-only filesystem"),
                libc::ELOOP => Some("too many levels of symbolic links"),
                libc::ENAMETOOLONG => Some("file name or path too long"),
                _ => None,
            };
            if hint.is_some() {
                return hint;
            }
        }
    }

    match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::NotFound => Some("path not found; it may have been removed concurrently"),
        io::ErrorKind::AlreadyExists => Some("already exists"),
        _ => None,
    }
}

fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    if let Some(hint) = hint_for(e) {
        msg.push_str(" (");
        msg.push_str(hint);
        msg.push(')');
    }
    msg
}

/// Adapter for anyhow::Result code.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}
