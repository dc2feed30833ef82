//! Configuration: types, default paths, XML loading and trash-root validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{
    CONFIG_ENV, default_config_path, default_trash_root, path_has_symlink_ancestor,
};
pub use types::{Config, LogLevel, SpaceCheck};
pub use xml::{load_config, load_config_from_xml_path};

/// Directory holding content entries, relative to the trash root.
pub const FILES_DIR: &str = "files";
/// Directory holding `.trashinfo` records, relative to the trash root.
pub const INFO_DIR: &str = "info";
