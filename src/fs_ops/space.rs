//! Free-space pre-flight for cross-device copies.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::errors::TrashError;
use crate::fs_ops::io_error_with_help;
use crate::platform::free_space_bytes;

/// Headroom kept free on the destination filesystem beyond the payload itself.
const SPACE_CUSHION: u64 = 4 * 1024 * 1024;

pub fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{} B", n)
    }
}

/// Fail with `TrashError::InsufficientSpace` when `dst_dir` cannot hold `required` bytes.
pub fn ensure_space_for_copy(dst_dir: &Path, required: u64) -> Result<()> {
    let available = free_space_bytes(dst_dir).map_err(io_error_with_help("query free space", dst_dir))?;
    debug!(
        dest = %dst_dir.display(),
        required = %format_bytes(required),
        available = %format_bytes(available),
        "space pre-flight"
    );
    if available < required.saturating_add(SPACE_CUSHION) {
        return Err(TrashError::InsufficientSpace {
            required,
            available,
            dest: dst_dir.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_units() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn huge_requirement_is_rejected() {
        let td = tempfile::tempdir().unwrap();
        let err = ensure_space_for_copy(td.path(), u64::MAX - 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrashError>(),
            Some(TrashError::InsufficientSpace { .. })
        ));
    }
}
