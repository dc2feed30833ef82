//! Core library for `trashctl`.
//!
//! A crash-safe manager for a FreeDesktop.org style trash bin: trash paths, list and
//! filter the inventory, restore, empty or expire, and reconcile orphans. The CLI in
//! `main.rs` is a thin layer over the types re-exported here.

pub mod cli;
pub mod config;
pub mod errors;
pub mod expire;
pub mod fs_ops;
pub mod output;
pub mod platform;
pub mod query;
pub mod report;
pub mod restore;
pub mod shutdown;
pub mod store;
pub mod trashinfo;

pub use config::{
    CONFIG_ENV, Config, LogLevel, SpaceCheck, default_config_path, default_trash_root,
    load_config, path_has_symlink_ancestor,
};
pub use errors::{Candidate, TrashError};
pub use expire::{Expirer, OrphanReport, RECONCILE_GRACE, Reconcile};
pub use fs_ops::OnConflict;
pub use query::{Filter, ListOptions, NamePattern, OrphanItem, OrphanKind, Selector, TrashItem};
pub use report::{BatchReport, ItemFailure, PurgeReport};
pub use restore::{Ambiguity, RestoreMode, RestoreOptions, Restored, Restorer};
pub use store::TrashStore;
pub use trashinfo::TrashInfo;
