//! Trash-root validation.
//! Ensures the root and its `files/` and `info/` subareas exist, are directories and are
//! writable before any mutating operation. Every failure is a `TrashError::Environment`.

use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::TrashError;
use crate::fs_ops::{create_exclusive, staging_path};
use crate::platform::set_dir_mode_0700;

use super::paths::default_trash_root;
use super::types::Config;

fn env_err(path: &Path, reason: impl Into<String>) -> anyhow::Error {
    TrashError::Environment {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Validate (and, where allowed, create) the trash root and its subareas.
    pub fn validate(&self) -> Result<()> {
        let root = &self.trash_root;
        if root.as_os_str().is_empty() {
            return Err(env_err(
                root,
                "no trash root configured and neither XDG_DATA_HOME nor HOME is set",
            ));
        }
        if !root.is_absolute() {
            return Err(env_err(root, "trash root must be an absolute path"));
        }

        match fs::metadata(root) {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return Err(env_err(root, "exists but is not a directory")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let is_default = default_trash_root().as_deref() == Some(root.as_path());
                if !self.create_root && !is_default {
                    return Err(env_err(root, "does not exist (create_root is disabled)"));
                }
                fs::create_dir_all(root).map_err(|e| env_err(root, format!("cannot create: {e}")))?;
                let _ = set_dir_mode_0700(root);
                info!(root = %root.display(), "Created trash root");
            }
            Err(e) => return Err(env_err(root, format!("cannot stat: {e}"))),
        }

        ensure_subarea(&self.files_dir())?;
        ensure_subarea(&self.info_dir())?;
        debug!(root = %root.display(), "trash root validated");
        Ok(())
    }
}

/// Subareas are created on demand, then probed for writability.
fn ensure_subarea(dir: &Path) -> Result<()> {
    match fs::symlink_metadata(dir) {
        Ok(m) if m.is_dir() => {}
        Ok(_) => return Err(env_err(dir, "exists but is not a directory")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir(dir).map_err(|e| env_err(dir, format!("cannot create: {e}")))?;
            let _ = set_dir_mode_0700(dir);
        }
        Err(e) => return Err(env_err(dir, format!("cannot stat: {e}"))),
    }
    is_writable_probe(dir).map_err(|e| env_err(dir, format!("not writable: {e}")))
}

/// Non-destructive probe: exclusive-create a staging-named file and remove it again.
fn is_writable_probe(dir: &Path) -> std::io::Result<()> {
    let probe = staging_path(dir);
    drop(create_exclusive(&probe)?);
    fs::remove_file(&probe)
}
