#![cfg(unix)]
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::tempdir;

use trashctl::{Config, Filter, TrashError, TrashStore};

fn running_as_root() -> bool {
    // Root ignores directory write bits, which defeats these tests' premise.
    unsafe { libc::geteuid() == 0 }
}

fn set_mode(path: &Path, mode: u32) {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn unremovable_original_keeps_content_and_record_together() {
    if running_as_root() {
        eprintln!("skipping: running as root");
        return;
    }
    let td = tempdir().unwrap();
    let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
    let locked = td.path().join("locked");
    fs::create_dir(&locked).unwrap();
    let src = locked.join("f.txt");
    fs::write(&src, b"payload").unwrap();
    // The link into files/ succeeds; unlinking from a read-only directory does not.
    set_mode(&locked, 0o555);

    let result = store.trash(&src);
    set_mode(&locked, 0o755);

    let err = result.unwrap_err();
    match err.downcast_ref::<TrashError>() {
        Some(TrashError::OriginalNotRemoved { trash_name, .. }) => assert_eq!(trash_name, "f.txt"),
        other => panic!("expected OriginalNotRemoved, got {other:?}"),
    }
    assert_eq!(entries(store.files_dir()), ["f.txt"]);
    assert_eq!(entries(store.info_dir()), ["f.txt.trashinfo"]);
    assert!(store.orphans(&Filter::everything()).unwrap().is_empty());
    assert!(store.get("f.txt").is_ok());
}

#[test]
fn move_failing_before_commit_withdraws_the_record() {
    if running_as_root() {
        eprintln!("skipping: running as root");
        return;
    }
    let td = tempdir().unwrap();
    let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
    let parent = td.path().join("readonly");
    let src = parent.join("album");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("track.ogg"), b"ogg").unwrap();
    // Renaming a directory out of a read-only parent fails before anything moves.
    set_mode(&parent, 0o555);

    let result = store.trash(&src);
    set_mode(&parent, 0o755);

    assert!(result.is_err());
    assert!(src.join("track.ogg").exists());
    assert!(entries(store.files_dir()).is_empty());
    assert!(entries(store.info_dir()).is_empty());
    assert!(store.orphans(&Filter::everything()).unwrap().is_empty());
}
