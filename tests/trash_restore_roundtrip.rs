use assert_fs::prelude::*;
use std::fs;

use trashctl::{Ambiguity, Config, RestoreOptions, Restorer, Selector, TrashStore};

fn open_store(temp: &assert_fs::TempDir) -> TrashStore {
    TrashStore::open(Config::new(temp.path().join("Trash"))).unwrap()
}

#[test]
fn file_roundtrip_is_byte_identical() {
    let temp = assert_fs::TempDir::new().unwrap();
    let store = open_store(&temp);
    let src = temp.child("docs/report.pdf");
    src.write_binary(&[0u8, 1, 2, 3, 255]).unwrap();
    let original = dunce::canonicalize(src.path()).unwrap();

    let item = store.trash(src.path()).unwrap();
    assert!(!src.path().exists());
    assert_eq!(item.original_path(), Some(original.as_path()));
    assert!(store.info_path(item.trash_name()).exists());

    let restored = Restorer::new(&store)
        .restore(&item, None, &RestoreOptions::new(Ambiguity::Refuse))
        .unwrap();
    assert_eq!(restored.destination, original);
    assert_eq!(fs::read(&original).unwrap(), [0u8, 1, 2, 3, 255]);
    assert!(!store.info_path(item.trash_name()).exists());
    assert!(!store.content_path(item.trash_name()).exists());
}

#[test]
fn directory_roundtrip_recreates_missing_parent() {
    let temp = assert_fs::TempDir::new().unwrap();
    let store = open_store(&temp);
    let dir = temp.child("work/project");
    dir.child("a.txt").write_str("a").unwrap();
    dir.child("sub/b.txt").write_str("b").unwrap();

    let item = store.trash(dir.path()).unwrap();
    fs::remove_dir(temp.child("work").path()).unwrap();

    Restorer::new(&store)
        .restore(&item, None, &RestoreOptions::new(Ambiguity::Refuse))
        .unwrap();
    dir.child("a.txt").assert("a");
    dir.child("sub/b.txt").assert("b");
}

#[test]
fn colliding_names_are_distinct_and_both_restorable() {
    let temp = assert_fs::TempDir::new().unwrap();
    let store = open_store(&temp);
    let one = temp.child("one/notes.txt");
    let two = temp.child("two/notes.txt");
    one.write_str("first").unwrap();
    two.write_str("second").unwrap();

    let a = store.trash(one.path()).unwrap();
    let b = store.trash(two.path()).unwrap();
    assert_eq!(a.trash_name(), "notes.txt");
    assert_eq!(b.trash_name(), "notes_2.txt");

    let report = Restorer::new(&store)
        .restore_all(
            &[Selector::Name("notes.txt".into())],
            None,
            &RestoreOptions::new(Ambiguity::Refuse),
        )
        .unwrap();
    // An exact trash name wins over original-name matches.
    assert_eq!(report.succeeded.len(), 1);
    one.assert("first");

    let report = Restorer::new(&store)
        .restore_all(
            &[Selector::TrashName("notes_2.txt".into())],
            None,
            &RestoreOptions::new(Ambiguity::Refuse),
        )
        .unwrap();
    assert!(report.is_success());
    two.assert("second");
}

#[test]
fn batch_keeps_going_after_item_failure() {
    let temp = assert_fs::TempDir::new().unwrap();
    let store = open_store(&temp);
    let ok = temp.child("ok.txt");
    ok.write_str("x").unwrap();
    let missing = temp.path().join("missing.txt");

    let report = store.trash_all(&[missing.clone(), ok.path().to_path_buf()]).unwrap();
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].code(), Some(70));
    assert!(!report.is_success());
}

#[cfg(unix)]
#[test]
fn symlink_is_trashed_as_a_link() {
    let temp = assert_fs::TempDir::new().unwrap();
    let store = open_store(&temp);
    let target = temp.child("target.txt");
    target.write_str("keep me").unwrap();
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(target.path(), &link).unwrap();

    let item = store.trash(&link).unwrap();
    let meta = fs::symlink_metadata(store.content_path(item.trash_name())).unwrap();
    assert!(meta.file_type().is_symlink());
    target.assert("keep me");
}
