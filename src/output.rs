use owo_colors::OwoColorize;
use serde::Serialize;

use crate::errors::TrashError;
use crate::expire::OrphanReport;
use crate::fs_ops::{EntryKind, format_bytes};
use crate::query::TrashItem;
use crate::report::{ItemFailure, PurgeReport};
use crate::trashinfo::DELETION_DATE_FORMAT;

/// Small wrapper around stdout/stderr printing to provide consistent, colored
/// user-facing messages. Colors are enabled only when output is a TTY.
fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Print a plain user-facing line (no prefix). Use this for primary outputs
/// such as list rows which users may script against.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// One row of `list --json`.
#[derive(Debug, Serialize)]
pub struct ListEntry<'a> {
    pub trash_name: &'a str,
    /// `null` for unknown origin.
    pub original_path: Option<String>,
    pub deleted_at: String,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl<'a> ListEntry<'a> {
    pub fn new(item: &'a TrashItem, with_size: bool) -> Self {
        Self {
            trash_name: item.trash_name(),
            original_path: item.original_path().map(|p| p.display().to_string()),
            deleted_at: item.deleted_at().format(DELETION_DATE_FORMAT).to_string(),
            kind: item.kind(),
            size: with_size.then(|| item.size()),
        }
    }
}

fn origin_text(item: &TrashItem) -> String {
    item.original_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(unknown origin)".to_string())
}

/// Render one list row: date, optional size, trash name and origin.
pub fn list_row(item: &TrashItem, with_size: bool) -> String {
    let when = item.deleted_at().format("%Y-%m-%d %H:%M:%S");
    let mut row = format!("{when}  ");
    if with_size {
        row.push_str(&format!("{:>10}  ", format_bytes(item.size())));
    }
    row.push_str(item.trash_name());
    if item.kind() == EntryKind::Directory {
        row.push('/');
    }
    row.push_str("  ");
    row.push_str(&origin_text(item));
    row
}

/// Print the human list and, with sizes, a total line. Returns the number of rows.
pub fn print_list<I: IntoIterator<Item = TrashItem>>(items: I, with_size: bool) -> usize {
    let mut count = 0usize;
    let mut total = 0u64;
    for item in items {
        print_user(&list_row(&item, with_size));
        if with_size {
            total = total.saturating_add(item.size());
        }
        count += 1;
    }
    if with_size {
        let line = format!("{count} item(s), {} total", format_bytes(total));
        if is_tty() {
            println!("{}", line.bold());
        } else {
            println!("{line}");
        }
    }
    count
}

pub fn print_list_json<I: IntoIterator<Item = TrashItem>>(items: I, with_size: bool) -> anyhow::Result<()> {
    let items: Vec<TrashItem> = items.into_iter().collect();
    let rows: Vec<ListEntry<'_>> = items.iter().map(|i| ListEntry::new(i, with_size)).collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

pub fn print_purge(verb: &str, report: &PurgeReport) {
    print_success(&format!(
        "{verb} {} item(s), freed {}",
        report.count,
        format_bytes(report.bytes)
    ));
}

pub fn print_orphans(report: &OrphanReport) {
    let mut total = 0u64;
    for o in &report.orphans {
        let size = o.size();
        total = total.saturating_add(size);
        let origin = o
            .original_path
            .as_deref()
            .map(|p| format!("  {}", p.display()))
            .unwrap_or_default();
        let reason = o.reason.as_deref().map(|r| format!("  ({r})")).unwrap_or_default();
        print_user(&format!(
            "{:<16} {:>10}  {}{origin}{reason}",
            kind_label(o.kind),
            format_bytes(size),
            o.trash_name
        ));
    }
    print_info(&format!(
        "{} orphan(s), {} of content",
        report.orphans.len(),
        format_bytes(total)
    ));
    let r = &report.outcome;
    if r.count > 0 || !r.adopted.is_empty() || !r.skipped.is_empty() {
        print_success(&format!(
            "removed {} orphan part(s) ({}), adopted {}, left {} alone (in use or needing manual repair)",
            r.count,
            format_bytes(r.bytes),
            r.adopted.len(),
            r.skipped.len()
        ));
    }
}

fn kind_label(kind: crate::query::OrphanKind) -> &'static str {
    use crate::query::OrphanKind::*;
    match kind {
        MissingContent => "missing-content",
        MissingMetadata => "missing-metadata",
        CorruptMetadata => "corrupt-metadata",
        PartialTransfer => "partial-transfer",
    }
}

/// One line per failed item: subject, original path and cause.
pub fn print_failures(failures: &[ItemFailure]) {
    for f in failures {
        let origin = f
            .original_path
            .as_deref()
            .map(|p| format!(" ({})", p.display()))
            .unwrap_or_default();
        print_error(&format!("{}{origin}: {:#}", f.subject, f.error));
        if let Some(TrashError::Ambiguous { candidates, .. }) = f.trash_error() {
            print_candidates(candidates);
        }
    }
}

/// Disambiguation list for an ambiguous selector.
pub fn print_candidates(candidates: &[crate::errors::Candidate]) {
    for c in candidates {
        let origin = c
            .original_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(unknown origin)".to_string());
        eprintln!(
            "  {}  {}  {}",
            c.deleted_at.format("%Y-%m-%d %H:%M:%S"),
            c.trash_name,
            origin
        );
    }
}
