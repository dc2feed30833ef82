//! Listing filters: one record with fixed optional fields.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use globset::{Glob, GlobMatcher};
use std::fmt;
use std::path::{Path, PathBuf};

use super::item::TrashItem;

/// Name matcher: a glob when the pattern has any of `*?[{`, a substring otherwise.
#[derive(Clone)]
pub enum NamePattern {
    Glob { pattern: String, matcher: GlobMatcher },
    Substring(String),
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.contains(['*', '?', '[', '{']) {
            let matcher = Glob::new(pattern)
                .with_context(|| format!("invalid name pattern '{pattern}'"))?
                .compile_matcher();
            Ok(NamePattern::Glob {
                pattern: pattern.to_string(),
                matcher,
            })
        } else {
            Ok(NamePattern::Substring(pattern.to_string()))
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        match self {
            NamePattern::Glob { matcher, .. } => matcher.is_match(name),
            NamePattern::Substring(s) => name.contains(s.as_str()),
        }
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Glob { pattern, .. } => write!(f, "Glob({pattern:?})"),
            NamePattern::Substring(s) => write!(f, "Substring({s:?})"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Deleted strictly before this instant.
    pub trashed_before: Option<NaiveDateTime>,
    /// Deleted at or after this instant.
    pub trashed_after: Option<NaiveDateTime>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    /// Matched against the trash name and the original file name.
    pub name_pattern: Option<NamePattern>,
    /// Component-wise prefix of the original path.
    pub original_path_prefix: Option<PathBuf>,
}

impl Filter {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn before(t: NaiveDateTime) -> Self {
        Self {
            trashed_before: Some(t),
            ..Self::default()
        }
    }

    pub fn has_time_bound(&self) -> bool {
        self.trashed_before.is_some() || self.trashed_after.is_some()
    }

    pub fn has_size_bound(&self) -> bool {
        self.min_size.is_some() || self.max_size.is_some()
    }

    pub(crate) fn time_matches(&self, t: NaiveDateTime) -> bool {
        self.trashed_before.is_none_or(|b| t < b) && self.trashed_after.is_none_or(|a| t >= a)
    }

    pub(crate) fn size_matches(&self, bytes: u64) -> bool {
        self.min_size.is_none_or(|m| bytes >= m) && self.max_size.is_none_or(|m| bytes <= m)
    }

    pub(crate) fn name_matches(&self, trash_name: &str, original_name: Option<&str>) -> bool {
        match &self.name_pattern {
            None => true,
            Some(p) => p.is_match(trash_name) || original_name.is_some_and(|n| p.is_match(n)),
        }
    }

    pub(crate) fn prefix_matches(&self, original: &Path) -> bool {
        self.original_path_prefix
            .as_deref()
            .is_none_or(|prefix| original.starts_with(prefix))
    }

    /// Cheap checks first; the size is only computed when a size bound is set.
    pub fn matches(&self, item: &TrashItem) -> bool {
        if !self.time_matches(item.deleted_at()) {
            return false;
        }
        let original_name = item.original_name().map(|n| n.to_string_lossy());
        if !self.name_matches(item.trash_name(), original_name.as_deref()) {
            return false;
        }
        if self.original_path_prefix.is_some() {
            match item.original_path() {
                Some(p) if self.prefix_matches(p) => {}
                _ => return false,
            }
        }
        !self.has_size_bound() || self.size_matches(item.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn before_is_strict_after_is_inclusive() {
        let f = Filter {
            trashed_before: Some(at(12)),
            trashed_after: Some(at(10)),
            ..Filter::default()
        };
        assert!(!f.time_matches(at(9)));
        assert!(f.time_matches(at(10)));
        assert!(f.time_matches(at(11)));
        assert!(!f.time_matches(at(12)));
    }

    #[test]
    fn glob_versus_substring() {
        let g = NamePattern::new("*.log").unwrap();
        assert!(g.is_match("server.log"));
        assert!(!g.is_match("server.log.gz"));
        let s = NamePattern::new("port").unwrap();
        assert!(s.is_match("report.pdf"));
        assert!(!s.is_match("PORT.txt"));
    }

    #[test]
    fn bad_glob_is_an_error() {
        assert!(NamePattern::new("[unclosed").is_err());
    }

    #[test]
    fn prefix_is_component_wise() {
        let f = Filter {
            original_path_prefix: Some(PathBuf::from("/home/u/docs")),
            ..Filter::default()
        };
        assert!(f.prefix_matches(Path::new("/home/u/docs/a.txt")));
        assert!(!f.prefix_matches(Path::new("/home/u/docs2/a.txt")));
    }

    #[test]
    fn name_matches_either_name() {
        let f = Filter {
            name_pattern: Some(NamePattern::new("draft").unwrap()),
            ..Filter::default()
        };
        assert!(f.name_matches("draft_2.txt", None));
        assert!(f.name_matches("x_2.txt", Some("draft.txt")));
        assert!(!f.name_matches("x.txt", Some("y.txt")));
    }

    #[test]
    fn size_bounds_are_inclusive() {
        let f = Filter {
            min_size: Some(10),
            max_size: Some(20),
            ..Filter::default()
        };
        assert!(f.size_matches(10));
        assert!(f.size_matches(20));
        assert!(!f.size_matches(21));
    }
}
