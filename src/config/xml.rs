//! XML configuration support.
//! - Reads config.xml with quick_xml + serde; unknown elements are rejected.
//! - A missing file means defaults; a malformed file is an environment error.
//!
//! Example:
//! ```xml
//! <config>
//!   <trash_root>/home/me/.local/share/Trash</trash_root>
//!   <log_level>info</log_level>
//!   <log_file>/home/me/.local/state/trashctl.log</log_file>
//!   <space_check>skip</space_check>
//!   <create_root>false</create_root>
//! </config>
//! ```

use anyhow::Result;
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::paths::default_config_path;
use super::types::{Config, LogLevel, SpaceCheck};
use crate::errors::TrashError;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    trash_root: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    space_check: Option<String>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    create_root: Option<bool>,
}

// Accepts " true " and friends; anything else is left unset.
fn de_bool_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

fn invalid(path: &Path, reason: String) -> anyhow::Error {
    TrashError::Environment {
        path: path.to_path_buf(),
        reason,
    }
    .into()
}

fn xml_to_config(parsed: XmlConfig, path: &Path) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(root) = non_empty(parsed.trash_root.as_deref()) {
        let root = PathBuf::from(root);
        if !root.is_absolute() {
            return Err(invalid(
                path,
                format!("trash_root must be absolute, got '{}'", root.display()),
            ));
        }
        cfg.trash_root = root;
    }
    if let Some(level) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = level.parse::<LogLevel>().map_err(|e| invalid(path, e))?;
    }
    cfg.log_file = non_empty(parsed.log_file.as_deref()).map(PathBuf::from);
    if let Some(policy) = non_empty(parsed.space_check.as_deref()) {
        cfg.space_check = policy.parse::<SpaceCheck>().map_err(|e| invalid(path, e))?;
    }
    if let Some(create) = parsed.create_root {
        cfg.create_root = create;
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .map_err(|e| invalid(path, format!("cannot read config: {e}")))?;
    let parsed: XmlConfig =
        from_xml_str(&contents).map_err(|e| invalid(path, format!("cannot parse config: {e}")))?;
    xml_to_config(parsed, path)
}

/// Resolve and load the config file. Returns the config and the file it came from,
/// or defaults and `None` when no file exists.
pub fn load_config() -> Result<(Config, Option<PathBuf>)> {
    let Some(path) = default_config_path() else {
        debug!("no config directory available; using defaults");
        return Ok((Config::default(), None));
    };
    if !path.exists() {
        debug!(path = %path.display(), "config file not found; using defaults");
        return Ok((Config::default(), None));
    }
    let cfg = load_config_from_xml_path(&path)?;
    debug!(path = %path.display(), root = %cfg.trash_root.display(), "loaded config");
    Ok((cfg, Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, body: &str) -> PathBuf {
        let p = dir.join("config.xml");
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn reads_all_fields() {
        let td = tempdir().unwrap();
        let p = write(
            td.path(),
            "<config>\n  <trash_root> /srv/trash </trash_root>\n  <log_level>debug</log_level>\n  <log_file>/tmp/t.log</log_file>\n  <space_check>skip</space_check>\n  <create_root>false</create_root>\n</config>\n",
        );
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.trash_root, PathBuf::from("/srv/trash"));
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/t.log")));
        assert_eq!(cfg.space_check, SpaceCheck::Skip);
        assert!(!cfg.create_root);
    }

    #[test]
    fn empty_elements_keep_defaults() {
        let td = tempdir().unwrap();
        let p = write(td.path(), "<config><log_file>  </log_file></config>");
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.log_file, None);
        assert_eq!(cfg.space_check, SpaceCheck::Estimate);
        assert!(cfg.create_root);
    }

    #[test]
    fn unknown_field_is_environment_error() {
        let td = tempdir().unwrap();
        let p = write(td.path(), "<config><download_base>/x</download_base></config>");
        let err = load_config_from_xml_path(&p).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrashError>(),
            Some(TrashError::Environment { .. })
        ));
    }

    #[test]
    fn relative_root_is_rejected() {
        let td = tempdir().unwrap();
        let p = write(td.path(), "<config><trash_root>rel/Trash</trash_root></config>");
        let err = load_config_from_xml_path(&p).unwrap_err();
        assert!(err.to_string().contains("must be absolute"));
    }
}
