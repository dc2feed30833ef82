//! Filesystem operations used by the trash store: atomic primitives, verified copies,
//! collision naming for restores and free-space checks.

mod atomic;
mod copy;
mod duplicate;
mod entry;
mod helpers;
mod io_copy;
mod meta;
mod space;
mod util;

pub use atomic::{commit_noclobber, create_exclusive, rename_durable, replace_entry};
pub use copy::{copy_and_commit, copy_verified};
pub use duplicate::{OnConflict, resolve_destination};
pub use entry::{EntryKind, TreeStats, entry_size, remove_entry, tree_stats};
pub use helpers::io_error_with_help;
pub use space::{ensure_space_for_copy, format_bytes};
pub use util::{device_of, fsync_dir, is_cross_device, is_staging_name, parse_staging_name, staging_path};
