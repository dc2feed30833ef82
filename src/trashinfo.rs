//! Trashinfo codec.
//!
//! Encodes and decodes the FreeDesktop.org `.trashinfo` record:
//!
//! ```text
//! [Trash Info]
//! Path=/home/me/some%20file.txt
//! DeletionDate=2024-05-01T13:37:00
//! ```
//!
//! Notes:
//! - Encoding is deterministic; the path is percent-escaped byte by byte (RFC 2396 style).
//! - Decoding is strict: anything malformed is a `ParseError`, never repaired.
//! - An empty `Path=` value marks content of unknown origin (written by orphan adoption).

use anyhow::Result;
use chrono::{NaiveDateTime, Timelike};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::errors::TrashError;
use crate::fs_ops::io_error_with_help;

pub const TRASHINFO_HEADER: &str = "[Trash Info]";
pub const TRASHINFO_EXTENSION: &str = "trashinfo";
pub const DELETION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Bytes left as-is in `Path=`: RFC 2396 unreserved characters plus the separator.
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'/');

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing [Trash Info] header")]
    MissingHeader,
    #[error("missing required key {0}")]
    MissingKey(&'static str),
    #[error("duplicate key {0}")]
    DuplicateKey(&'static str),
    #[error("line {0} is not a key=value pair")]
    MalformedLine(usize),
    #[error("invalid percent escape in path '{0}'")]
    BadEscape(String),
    #[error("path is not absolute: '{0}'")]
    RelativePath(String),
    #[error("invalid deletion date '{0}'")]
    BadDate(String),
    #[error("record is not valid UTF-8")]
    NotUtf8,
}

/// Decoded metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashInfo {
    original_path: Option<PathBuf>,
    deleted_at: NaiveDateTime,
}

impl TrashInfo {
    /// Record for a trashed path. The timestamp is truncated to whole seconds.
    pub fn new(original_path: impl Into<PathBuf>, deleted_at: NaiveDateTime) -> Self {
        Self {
            original_path: Some(original_path.into()),
            deleted_at: truncate_to_seconds(deleted_at),
        }
    }

    /// Record for adopted content whose original location is unknown.
    pub fn unknown_origin(deleted_at: NaiveDateTime) -> Self {
        Self {
            original_path: None,
            deleted_at: truncate_to_seconds(deleted_at),
        }
    }

    pub fn original_path(&self) -> Option<&Path> {
        self.original_path.as_deref()
    }

    pub fn deleted_at(&self) -> NaiveDateTime {
        self.deleted_at
    }

    /// Serialize into the on-disk text layout.
    pub fn encode(&self) -> String {
        let path = self
            .original_path
            .as_deref()
            .map(|p| percent_encode(path_bytes(p).as_ref(), PATH_ESCAPE).to_string())
            .unwrap_or_default();
        format!(
            "{TRASHINFO_HEADER}\nPath={path}\nDeletionDate={}\n",
            self.deleted_at.format(DELETION_DATE_FORMAT)
        )
    }

    /// Strictly parse a record.
    pub fn decode(text: &str) -> Result<Self, ParseError> {
        let mut lines = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .enumerate()
            .filter(|(_, l)| !is_blank_or_comment(l));

        match lines.next() {
            Some((_, l)) if l.trim() == TRASHINFO_HEADER => {}
            _ => return Err(ParseError::MissingHeader),
        }

        let mut path: Option<Option<PathBuf>> = None;
        let mut date: Option<NaiveDateTime> = None;

        for (idx, line) in lines {
            if line.trim_start().starts_with('[') {
                break;
            }
            let (key, value) = line
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or(ParseError::MalformedLine(idx + 1))?;
            match key {
                "Path" => {
                    if path.is_some() {
                        return Err(ParseError::DuplicateKey("Path"));
                    }
                    path = Some(decode_path(value)?);
                }
                "DeletionDate" => {
                    if date.is_some() {
                        return Err(ParseError::DuplicateKey("DeletionDate"));
                    }
                    let parsed = NaiveDateTime::parse_from_str(value, DELETION_DATE_FORMAT)
                        .map_err(|_| ParseError::BadDate(value.to_string()))?;
                    date = Some(parsed);
                }
                _ => {}
            }
        }

        Ok(Self {
            original_path: path.ok_or(ParseError::MissingKey("Path"))?,
            deleted_at: date.ok_or(ParseError::MissingKey("DeletionDate"))?,
        })
    }

    /// Read and decode a record file. Parse failures surface as `TrashError::CorruptMetadata`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(io_error_with_help("read trashinfo", path))?;
        let corrupt = |reason: String| TrashError::CorruptMetadata {
            path: path.to_path_buf(),
            reason,
        };
        let text = String::from_utf8(bytes).map_err(|_| corrupt(ParseError::NotUtf8.to_string()))?;
        Self::decode(&text).map_err(|e| corrupt(e.to_string()).into())
    }

    /// Write the encoded record into a freshly created file and flush it to stable storage.
    pub fn write_to(&self, mut file: fs::File) -> std::io::Result<()> {
        file.write_all(self.encode().as_bytes())?;
        file.sync_all()
    }
}

/// File name of the record for `trash_name` inside `info/`.
pub fn info_file_name(trash_name: &str) -> String {
    format!("{trash_name}.{TRASHINFO_EXTENSION}")
}

/// Inverse of `info_file_name`; None for files that are not records.
pub fn trash_name_of(info_file_name: &str) -> Option<&str> {
    info_file_name
        .strip_suffix(TRASHINFO_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .filter(|s| !s.is_empty())
}

fn truncate_to_seconds(t: NaiveDateTime) -> NaiveDateTime {
    t.with_nanosecond(0).unwrap_or(t)
}

fn is_blank_or_comment(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

fn decode_path(value: &str) -> Result<Option<PathBuf>, ParseError> {
    if value.is_empty() {
        return Ok(None);
    }
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(ParseError::BadEscape(value.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let raw: Vec<u8> = percent_decode_str(value).collect();
    if raw.contains(&0) {
        return Err(ParseError::BadEscape(value.to_string()));
    }
    let path = path_from_bytes(raw).ok_or(ParseError::NotUtf8)?;
    if !path.is_absolute() {
        return Err(ParseError::RelativePath(value.to_string()));
    }
    Ok(Some(path))
}

#[cfg(unix)]
fn path_bytes(p: &Path) -> std::borrow::Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    std::borrow::Cow::Borrowed(p.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(p: &Path) -> std::borrow::Cow<'_, [u8]> {
    std::borrow::Cow::Owned(p.to_string_lossy().into_owned().into_bytes())
}

#[cfg(unix)]
fn path_from_bytes(raw: Vec<u8>) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStringExt;
    Some(PathBuf::from(OsString::from_vec(raw)))
}

#[cfg(not(unix))]
fn path_from_bytes(raw: Vec<u8>) -> Option<PathBuf> {
    String::from_utf8(raw).ok().map(|s| PathBuf::from(OsString::from(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn encodes_fixed_layout() {
        let info = TrashInfo::new("/home/me/a file%.txt", at(13, 37, 0));
        assert_eq!(
            info.encode(),
            "[Trash Info]\nPath=/home/me/a%20file%25.txt\nDeletionDate=2024-05-01T13:37:00\n"
        );
    }

    #[test]
    fn round_trip_preserves_record() {
        for p in ["/plain", "/with space/and%percent", "/ünïcødé/名前", "/q?x#y=z&w"] {
            let info = TrashInfo::new(p, at(1, 2, 3));
            let back = TrashInfo::decode(&info.encode()).unwrap();
            assert_eq!(back, info);
        }
        let unknown = TrashInfo::unknown_origin(at(4, 5, 6));
        assert_eq!(TrashInfo::decode(&unknown.encode()).unwrap(), unknown);
    }

    #[test]
    fn encoding_is_deterministic() {
        let info = TrashInfo::new("/x/y z", at(0, 0, 0));
        assert_eq!(info.encode(), info.encode());
    }

    #[test]
    fn new_truncates_subsecond_precision() {
        let t = at(1, 1, 1).with_nanosecond(500_000_000).unwrap();
        let info = TrashInfo::new("/a", t);
        assert_eq!(info.deleted_at(), at(1, 1, 1));
    }

    #[test]
    fn tolerates_comments_unknown_keys_and_crlf() {
        let text = "# made elsewhere\r\n[Trash Info]\r\nPath=/a/b\r\nX-Extra=1\r\nDeletionDate=2024-05-01T00:00:01\r\n";
        let info = TrashInfo::decode(text).unwrap();
        assert_eq!(info.original_path(), Some(Path::new("/a/b")));
    }

    #[test]
    fn rejects_malformed_records() {
        let cases: &[(&str, ParseError)] = &[
            ("", ParseError::MissingHeader),
            ("[Other]\nPath=/a\n", ParseError::MissingHeader),
            ("[Trash Info]\nDeletionDate=2024-05-01T00:00:00\n", ParseError::MissingKey("Path")),
            ("[Trash Info]\nPath=/a\n", ParseError::MissingKey("DeletionDate")),
            (
                "[Trash Info]\nPath=/a\nPath=/b\nDeletionDate=2024-05-01T00:00:00\n",
                ParseError::DuplicateKey("Path"),
            ),
            ("[Trash Info]\ngarbage\n", ParseError::MalformedLine(2)),
            (
                "[Trash Info]\nPath=/a%zz\nDeletionDate=2024-05-01T00:00:00\n",
                ParseError::BadEscape("/a%zz".into()),
            ),
            (
                "[Trash Info]\nPath=rel/a\nDeletionDate=2024-05-01T00:00:00\n",
                ParseError::RelativePath("rel/a".into()),
            ),
            (
                "[Trash Info]\nPath=/a\nDeletionDate=yesterday\n",
                ParseError::BadDate("yesterday".into()),
            ),
            (
                "[Trash Info]\nPath=/a\nDeletionDate=2024-05-01T00:00:00Z\n",
                ParseError::BadDate("2024-05-01T00:00:00Z".into()),
            ),
        ];
        for (text, expected) in cases {
            assert_eq!(&TrashInfo::decode(text).unwrap_err(), expected, "input: {text:?}");
        }
    }

    #[test]
    fn second_group_ends_record() {
        let text = "[Trash Info]\nPath=/a\nDeletionDate=2024-05-01T00:00:00\n[Other]\nPath=/b\n";
        let info = TrashInfo::decode(text).unwrap();
        assert_eq!(info.original_path(), Some(Path::new("/a")));
    }

    #[test]
    fn info_file_names() {
        assert_eq!(info_file_name("a.txt"), "a.txt.trashinfo");
        assert_eq!(trash_name_of("a.txt.trashinfo"), Some("a.txt"));
        assert_eq!(trash_name_of(".trashinfo"), None);
        assert_eq!(trash_name_of("a.txt"), None);
    }

    #[test]
    fn load_reports_corrupt_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bad.trashinfo");
        fs::write(&p, b"not a record").unwrap();
        let err = TrashInfo::load(&p).unwrap_err();
        match err.downcast_ref::<TrashError>() {
            Some(TrashError::CorruptMetadata { path, .. }) => assert_eq!(path, &p),
            other => panic!("expected corrupt metadata, got {other:?}"),
        }
    }
}
