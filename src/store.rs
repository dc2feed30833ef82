//! Trash store: owns the validated trash root and the trash protocol.
//! The query engine, restorer and expirer all borrow a `TrashStore`.

mod names;
mod trash;

pub use names::{MAX_NAME_ATTEMPTS, NameCandidates};

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::fs_ops::device_of;
use crate::trashinfo::info_file_name;

/// An opened trash root. Opening validates (and where allowed creates) `files/` and `info/`.
#[derive(Debug)]
pub struct TrashStore {
    config: Config,
    root: PathBuf,
    files_dir: PathBuf,
    info_dir: PathBuf,
    root_device: Option<u64>,
}

impl TrashStore {
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let root = dunce::canonicalize(&config.trash_root).unwrap_or_else(|_| config.trash_root.clone());
        let files_dir = root.join(crate::config::FILES_DIR);
        let info_dir = root.join(crate::config::INFO_DIR);
        let root_device = device_of(&files_dir).ok().flatten();
        debug!(root = %root.display(), ?root_device, "opened trash store");
        Ok(Self {
            config,
            root,
            files_dir,
            info_dir,
            root_device,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Canonical trash root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    pub fn info_dir(&self) -> &Path {
        &self.info_dir
    }

    pub fn content_path(&self, trash_name: &str) -> PathBuf {
        self.files_dir.join(trash_name)
    }

    pub fn info_path(&self, trash_name: &str) -> PathBuf {
        self.info_dir.join(info_file_name(trash_name))
    }

    pub(crate) fn root_device(&self) -> Option<u64> {
        self.root_device
    }
}
