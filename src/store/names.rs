//! Trash-name candidates: `photo.jpg`, `photo_2.jpg`, `photo_3.jpg`, ...
//! The counter goes before the last extension; names without one get it appended.
//! A base that looks like an in-flight staging entry is prefixed with `_` so it can never
//! be mistaken for one.

use crate::fs_ops::is_staging_name;
use crate::trashinfo::TRASHINFO_EXTENSION;

/// Bound on candidates tried for one item before giving up.
pub const MAX_NAME_ATTEMPTS: u32 = 1000;

// Longest file name most filesystems accept; the metadata record adds ".trashinfo".
const MAX_FILENAME_LEN: usize = 255;

/// Iterator over candidate trash names for `base`, at most MAX_NAME_ATTEMPTS long.
pub struct NameCandidates {
    stem: String,
    ext: Option<String>,
    next: u32,
}

impl NameCandidates {
    pub fn new(base: &str) -> Self {
        let escaped;
        let base = if is_staging_name(base) {
            escaped = format!("_{base}");
            escaped.as_str()
        } else {
            base
        };
        let (stem, ext) = split_extension(base);
        Self {
            stem: stem.to_string(),
            ext: ext.map(str::to_string),
            next: 1,
        }
    }
}

impl Iterator for NameCandidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next > MAX_NAME_ATTEMPTS {
            return None;
        }
        let n = self.next;
        self.next += 1;
        let suffix = if n == 1 { String::new() } else { format!("_{n}") };
        Some(compose(&self.stem, self.ext.as_deref(), &suffix))
    }
}

/// Split on the last dot, ignoring a leading dot (".bashrc" has no extension).
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

fn compose(stem: &str, ext: Option<&str>, suffix: &str) -> String {
    let reserved = 1 + TRASHINFO_EXTENSION.len() + suffix.len() + ext.map_or(0, |e| e.len() + 1);
    let budget = MAX_FILENAME_LEN.saturating_sub(reserved).max(1);
    let mut out = truncate_to(stem, budget).to_string();
    out.push_str(suffix);
    if let Some(e) = ext {
        out.push('.');
        out.push_str(e);
    }
    out
}

fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
