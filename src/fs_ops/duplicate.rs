//! Restore-destination collision policy.
//!
//! Policy:
//! - Fail: keep the requested path; the caller reports a conflict if it exists.
//! - Overwrite: keep the requested path; the caller replaces what is there.
//! - Rename: pick a free sibling by appending " (n)" before the extension.
//!
//! This only decides the name from current filesystem state; the final commit still
//! uses a no-clobber primitive, so a racing creator is reported rather than replaced.

use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnConflict {
    #[default]
    Fail,
    Overwrite,
    Rename,
}

const MAX_SUFFIX: u32 = 10_000;

#[cfg(windows)]
const MAX_FILENAME_LEN: usize = 240;
#[cfg(not(windows))]
const MAX_FILENAME_LEN: usize = 255;

/// Path to restore to under `policy`. Only `Rename` ever differs from `candidate`.
pub fn resolve_destination(candidate: &Path, policy: OnConflict) -> PathBuf {
    match policy {
        OnConflict::Fail | OnConflict::Overwrite => candidate.to_path_buf(),
        OnConflict::Rename => unique_sibling(candidate),
    }
}

/// Examples:
/// - "movie.mkv" -> "movie (2).mkv", "movie (3).mkv", ...
/// - ".env" -> ".env (2)"
/// - "archive.tar.gz" -> "archive.tar (2).gz"
fn unique_sibling(candidate: &Path) -> PathBuf {
    if !occupied(candidate) {
        return candidate.to_path_buf();
    }
    let name = candidate.file_name().unwrap_or_else(|| OsStr::new("restored"));
    let base = Path::new(name);
    let stem = base.file_stem().unwrap_or(name).to_os_string();
    let ext = base.extension().map(OsStr::to_os_string);

    for n in 2..=MAX_SUFFIX {
        let next = candidate.with_file_name(name_with_suffix(&stem, ext.as_deref(), &format!(" ({n})")));
        if !occupied(&next) {
            return next;
        }
        if n == 4 {
            trace!(name = ?name, "restore: several collisions, still searching for a free suffix");
        }
    }
    candidate.with_file_name(name_with_suffix(&stem, ext.as_deref(), " (final)"))
}

fn occupied(p: &Path) -> bool {
    std::fs::symlink_metadata(p).is_ok()
}

#[cfg(unix)]
fn name_len(s: &OsStr) -> usize {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().len()
}

#[cfg(not(unix))]
fn name_len(s: &OsStr) -> usize {
    s.to_string_lossy().len()
}

/// `stem + suffix [+ "." + ext]`, shortening the stem so the result fits MAX_FILENAME_LEN.
fn name_with_suffix(stem: &OsStr, ext: Option<&OsStr>, suffix: &str) -> OsString {
    let overhead = suffix.len() + ext.map(|e| 1 + name_len(e)).unwrap_or(0);
    let budget = MAX_FILENAME_LEN.saturating_sub(overhead).max(1);

    let mut out = if name_len(stem) <= budget {
        stem.to_os_string()
    } else {
        let lossy = stem.to_string_lossy();
        let mut acc = String::new();
        for ch in lossy.chars() {
            if acc.len() + ch.len_utf8() > budget {
                break;
            }
            acc.push(ch);
        }
        if acc.is_empty() {
            acc.push('f');
        }
        OsString::from(acc)
    };
    out.push(suffix);
    if let Some(e) = ext {
        out.push(".");
        out.push(e);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn free_candidate_is_kept() {
        let td = tempdir().unwrap();
        let c = td.path().join("file.txt");
        assert_eq!(resolve_destination(&c, OnConflict::Rename), c);
    }

    #[test]
    fn collisions_increment_suffix() {
        let td = tempdir().unwrap();
        let d = td.path();
        fs::write(d.join("file.txt"), b"1").unwrap();
        assert_eq!(
            resolve_destination(&d.join("file.txt"), OnConflict::Rename),
            d.join("file (2).txt")
        );
        fs::write(d.join("file (2).txt"), b"2").unwrap();
        assert_eq!(
            resolve_destination(&d.join("file.txt"), OnConflict::Rename),
            d.join("file (3).txt")
        );
    }

    #[test]
    fn dotfiles_and_multi_extensions() {
        let td = tempdir().unwrap();
        let d = td.path();
        fs::write(d.join(".env"), b"a").unwrap();
        fs::write(d.join("archive.tar.gz"), b"a").unwrap();
        assert_eq!(resolve_destination(&d.join(".env"), OnConflict::Rename), d.join(".env (2)"));
        assert_eq!(
            resolve_destination(&d.join("archive.tar.gz"), OnConflict::Rename),
            d.join("archive.tar (2).gz")
        );
    }

    #[test]
    fn fail_and_overwrite_keep_candidate() {
        let td = tempdir().unwrap();
        let c = td.path().join("thing.bin");
        fs::write(&c, b"x").unwrap();
        assert_eq!(resolve_destination(&c, OnConflict::Fail), c);
        assert_eq!(resolve_destination(&c, OnConflict::Overwrite), c);
    }

    #[test]
    fn long_stems_are_shortened() {
        let stem = "a".repeat(300);
        let name = name_with_suffix(OsStr::new(&stem), Some(OsStr::new("txt")), " (2)");
        assert!(name_len(&name) <= MAX_FILENAME_LEN);
        assert!(name.to_string_lossy().ends_with(" (2).txt"));
    }
}
