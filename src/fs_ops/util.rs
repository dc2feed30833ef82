use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const STAGING_PREFIX: &str = ".trashctl.";
const STAGING_SUFFIX: &str = ".partial";

/// Hidden sibling name used while a copy is in flight: ".trashctl.<pid>.<nanos>.partial".
pub fn staging_path(dir: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    dir.join(format!("{STAGING_PREFIX}{pid}.{nanos}{STAGING_SUFFIX}"))
}

pub fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

/// Owning process id and creation time encoded in a staging name.
pub fn parse_staging_name(name: &str) -> Option<(u32, SystemTime)> {
    let inner = name.strip_prefix(STAGING_PREFIX)?.strip_suffix(STAGING_SUFFIX)?;
    let (pid, nanos) = inner.split_once('.')?;
    let nanos: u64 = nanos.parse().ok()?;
    Some((pid.parse().ok()?, UNIX_EPOCH + Duration::from_nanos(nanos)))
}

pub fn is_cross_device(e: &io::Error) -> bool {
    // std::io::ErrorKind::CrossesDevices is not stable on every toolchain we target,
    // so detect EXDEV / ERROR_NOT_SAME_DEVICE via raw OS error codes.
    match e.raw_os_error() {
        #[cfg(unix)]
        Some(code) => code == libc::EXDEV,
        #[cfg(windows)]
        Some(code) => code == 17,
        #[cfg(not(any(unix, windows)))]
        Some(_) => false,
        None => false,
    }
}

/// Device id of the filesystem holding `path` (without following a final symlink).
#[cfg(unix)]
pub fn device_of(path: &Path) -> io::Result<Option<u64>> {
    use std::os::unix::fs::MetadataExt;
    fs::symlink_metadata(path).map(|m| Some(m.dev()))
}

#[cfg(not(unix))]
pub fn device_of(path: &Path) -> io::Result<Option<u64>> {
    fs::symlink_metadata(path).map(|_| None)
}

#[cfg(unix)]
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
