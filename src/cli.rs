//! CLI definition and parsing.
//! Defines Args and its subcommands and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Dates accept ISO forms and relative forms like `3 days ago`, `2w` or `yesterday`.
//! - Sizes accept plain bytes or a K/M/G/T suffix (powers of 1024).

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand, ValueHint};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::types::{Config, LogLevel, SpaceCheck};
use crate::expire::Reconcile;
use crate::fs_ops::OnConflict;
use crate::query::{Filter, NamePattern, absolutize};
use crate::restore::{Ambiguity, RestoreMode, RestoreOptions};

/// Manage the desktop trash bin safely from the command line.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Crash-safe manager for the FreeDesktop.org trash bin",
    arg_required_else_help = true
)]
pub struct Args {
    /// Use this trash root instead of the configured or default one.
    #[arg(long, global = true, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub trash_dir: Option<PathBuf>,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json_logs: bool,

    /// Do not estimate free space before a cross-device trash.
    #[arg(long, global = true)]
    pub skip_space_check: bool,

    /// Print the config file location and the resolved trash root, then exit.
    #[arg(long, help = "Print the config file location and trash root used by trashctl and exit")]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Move files or directories into the trash.
    Put {
        #[arg(required = true, value_name = "PATH", value_hint = ValueHint::AnyPath)]
        paths: Vec<PathBuf>,
    },

    /// List trashed items.
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Show per-item sizes and a total.
        #[arg(long)]
        size: bool,
        /// Sort oldest first.
        #[arg(long)]
        by_time: bool,
        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Restore items by trash name, original file name or original path.
    Restore {
        #[arg(required = true, value_name = "SELECTOR")]
        selectors: Vec<String>,
        /// Restore into this directory instead of the original location.
        #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
        to: Option<PathBuf>,
        /// Restore a copy and keep the item in the trash.
        #[arg(long)]
        copy: bool,
        /// Replace an existing destination.
        #[arg(long, conflicts_with = "rename")]
        overwrite: bool,
        /// Restore next to an existing destination as `name (2).ext`.
        #[arg(long)]
        rename: bool,
        /// Restore every item a selector matches.
        #[arg(long, conflicts_with = "newest")]
        all: bool,
        /// Restore only the most recently trashed match.
        #[arg(long)]
        newest: bool,
    },

    /// Permanently delete items (everything when no filter is given).
    Empty {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Permanently delete items trashed before WHEN.
    Expire {
        #[arg(value_name = "WHEN", value_parser = parse_when)]
        when: NaiveDateTime,
    },

    /// Report (and optionally reconcile) orphaned content and records.
    Orphans {
        #[command(flatten)]
        filter: FilterArgs,
        /// Drop dangling records and partial copies; adopt ownerless content.
        #[arg(long, conflicts_with = "purge")]
        adopt: bool,
        /// Drop dangling records and partial copies; delete ownerless content.
        #[arg(long)]
        purge: bool,
    },
}

/// Filter flags shared by list, empty and orphans.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Trashed strictly before WHEN.
    #[arg(long, value_name = "WHEN", value_parser = parse_when)]
    pub before: Option<NaiveDateTime>,
    /// Trashed at or after WHEN.
    #[arg(long, value_name = "WHEN", value_parser = parse_when)]
    pub after: Option<NaiveDateTime>,
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,
    /// Glob (with `*?[{`) or substring matched against trash and original names.
    #[arg(long, value_name = "PATTERN")]
    pub name: Option<String>,
    /// Originally located under DIR.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub under: Option<PathBuf>,
}

impl FilterArgs {
    pub fn is_empty(&self) -> bool {
        self.before.is_none()
            && self.after.is_none()
            && self.min_size.is_none()
            && self.max_size.is_none()
            && self.name.is_none()
            && self.under.is_none()
    }

    pub fn to_filter(&self) -> Result<Filter> {
        let name_pattern = self.name.as_deref().map(NamePattern::new).transpose()?;
        let original_path_prefix = self
            .under
            .as_deref()
            .map(|p| absolutize(&unquote_path(p)))
            .transpose()?;
        Ok(Filter {
            trashed_before: self.before,
            trashed_after: self.after,
            min_size: self.min_size,
            max_size: self.max_size,
            name_pattern,
            original_path_prefix,
        })
    }
}

impl Command {
    /// Restore flags folded into library options; `None` for other subcommands.
    pub fn restore_options(&self) -> Option<RestoreOptions> {
        let Command::Restore {
            copy,
            overwrite,
            rename,
            all,
            newest,
            ..
        } = self
        else {
            return None;
        };
        let ambiguity = if *all {
            Ambiguity::All
        } else if *newest {
            Ambiguity::Newest
        } else {
            Ambiguity::Refuse
        };
        let mut opts = RestoreOptions::new(ambiguity);
        if *copy {
            opts.mode = RestoreMode::Copy;
        }
        opts.on_conflict = if *overwrite {
            OnConflict::Overwrite
        } else if *rename {
            OnConflict::Rename
        } else {
            OnConflict::Fail
        };
        Some(opts)
    }

    /// Reconciliation requested by `orphans`.
    pub fn reconcile(&self) -> Reconcile {
        match self {
            Command::Orphans { adopt: true, .. } => Reconcile::Adopt,
            Command::Orphans { purge: true, .. } => Reconcile::Purge,
            _ => Reconcile::None,
        }
    }
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(root) = &self.trash_dir {
            cfg.trash_root = unquote_path(root);
            // An explicit root on the command line is always created when missing.
            cfg.create_root = true;
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if self.skip_space_check {
            cfg.space_check = SpaceCheck::Skip;
        }
    }
}

/// Strip one pair of wrapping quotes left over from shell or PowerShell quoting.
/// Only applies when the literal path does not exist; whitespace, unbalanced quotes and
/// trailing separators are always kept, since they can be part of a real file name.
pub fn unquote_path(p: &Path) -> PathBuf {
    if fs::symlink_metadata(p).is_ok() {
        return p.to_path_buf();
    }
    let Some(raw) = p.to_str() else {
        return p.to_path_buf();
    };
    let wrapped = raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"')) || (raw.starts_with('\'') && raw.ends_with('\'')));
    if wrapped {
        PathBuf::from(&raw[1..raw.len() - 1])
    } else {
        p.to_path_buf()
    }
}

const MAX_RELATIVE_AMOUNT: i64 = 10_000_000;

/// Parse a point in time relative to now (local time).
pub fn parse_when(s: &str) -> Result<NaiveDateTime, String> {
    parse_when_at(s, Local::now().naive_local()).map_err(|e| e.to_string())
}

/// Parse `s` with `now` as the reference instant.
pub fn parse_when_at(s: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let text = s.trim().to_ascii_lowercase();
    let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);
    match text.as_str() {
        "now" => return Ok(now),
        "today" => return Ok(midnight(now.date())),
        "yesterday" => return Ok(midnight(now.date()) - Duration::days(1)),
        _ => {}
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(&text.to_uppercase(), fmt) {
            return Ok(t);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Ok(midnight(d));
    }

    let rel = text.strip_suffix("ago").map(str::trim_end).unwrap_or(&text);
    let split = rel
        .find(|c: char| !c.is_ascii_digit())
        .with_context(|| format!("unrecognised date '{s}'"))?;
    let (num, unit) = rel.split_at(split);
    let n: i64 = num
        .parse()
        .with_context(|| format!("unrecognised date '{s}'"))?;
    if n > MAX_RELATIVE_AMOUNT {
        anyhow::bail!("date '{s}' is too far in the past");
    }
    let span = match unit.trim() {
        "s" | "sec" | "secs" | "second" | "seconds" => Duration::seconds(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::minutes(n),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::hours(n),
        "d" | "day" | "days" => Duration::days(n),
        "w" | "week" | "weeks" => Duration::weeks(n),
        "mo" | "month" | "months" => Duration::days(30 * n),
        "y" | "year" | "years" => Duration::days(365 * n),
        other => anyhow::bail!("unknown time unit '{other}' in '{s}'"),
    };
    now.checked_sub_signed(span)
        .with_context(|| format!("date '{s}' is out of range"))
}

/// Parse a byte count with an optional binary suffix (`512`, `10K`, `3MiB`, `1g`).
pub fn parse_size(s: &str) -> Result<u64, String> {
    let text = s.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (num, suffix) = text.split_at(split);
    let n: u64 = num.parse().map_err(|_| format!("invalid size '{s}'"))?;
    let shift = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        "t" | "tb" | "tib" => 40,
        _ => return Err(format!("invalid size suffix in '{s}'")),
    };
    n.checked_mul(1u64 << shift)
        .ok_or_else(|| format!("size '{s}' is too large"))
}

pub fn parse() -> Args {
    Args::parse()
}
