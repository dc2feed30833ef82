//! Core configuration types.
//! - Config holds the trash root and policies, passed explicitly into `TrashStore::open`.
//! - LogLevel and SpaceCheck parse from config text and CLI flags.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::paths;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Free-space pre-flight before a cross-device trash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpaceCheck {
    /// Walk the source tree and compare with free space plus a cushion.
    #[default]
    Estimate,
    /// Copy without checking; a full disk surfaces as an I/O error mid-copy.
    Skip,
}

impl FromStr for SpaceCheck {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "estimate" | "walk" | "full" => Ok(SpaceCheck::Estimate),
            "skip" | "none" | "off" => Ok(SpaceCheck::Skip),
            other => Err(format!("invalid space check policy: '{other}'")),
        }
    }
}

impl fmt::Display for SpaceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpaceCheck::Estimate => "estimate",
            SpaceCheck::Skip => "skip",
        })
    }
}

/// Runtime configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trash base directory holding `files/` and `info/`
    pub trash_root: PathBuf,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Pre-flight policy for cross-device trashes
    pub space_check: SpaceCheck,
    /// Create a missing, explicitly configured trash root
    pub create_root: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trash_root: paths::default_trash_root().unwrap_or_default(),
            log_level: LogLevel::Normal,
            log_file: None,
            space_check: SpaceCheck::Estimate,
            create_root: true,
        }
    }
}

impl Config {
    /// Construct a Config for an explicit trash root; other fields use defaults.
    pub fn new(trash_root: impl Into<PathBuf>) -> Self {
        Self {
            trash_root: trash_root.into(),
            ..Default::default()
        }
    }

    pub fn files_dir(&self) -> PathBuf {
        self.trash_root.join(super::FILES_DIR)
    }

    pub fn info_dir(&self) -> PathBuf {
        self.trash_root.join(super::INFO_DIR)
    }
}
