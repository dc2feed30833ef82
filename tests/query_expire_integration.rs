use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tempfile::tempdir;

use trashctl::{
    Config, Expirer, Filter, ListOptions, NamePattern, OrphanKind, Reconcile, TrashStore,
};

fn record_text(original: &str, when: NaiveDateTime) -> String {
    format!(
        "[Trash Info]\nPath={original}\nDeletionDate={}\n",
        when.format("%Y-%m-%dT%H:%M:%S")
    )
}

/// Place a valid item on disk the way another trash client would.
fn plant(store: &TrashStore, name: &str, original: &str, when: NaiveDateTime, body: &[u8]) {
    fs::write(store.content_path(name), body).unwrap();
    fs::write(store.info_path(name), record_text(original, when)).unwrap();
}

fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 11, d).unwrap().and_hms_opt(9, 15, 0).unwrap()
}

fn names<I: Iterator<Item = trashctl::TrashItem>>(it: I) -> Vec<String> {
    it.map(|i| i.trash_name().to_string()).collect()
}

#[test]
fn before_filter_returns_older_items_ascending() {
    let td = tempdir().unwrap();
    let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
    plant(&store, "d", "/home/u/d", day(4), b"d");
    plant(&store, "b", "/home/u/b", day(2), b"b");
    plant(&store, "a", "/home/u/a", day(1), b"a");
    plant(&store, "c", "/home/u/c", day(3), b"c");

    let f = Filter::before(day(3));
    assert_eq!(names(store.list(&f, ListOptions::default()).unwrap()), ["a", "b"]);

    let f = Filter {
        trashed_after: Some(day(3)),
        ..Filter::default()
    };
    assert_eq!(names(store.list(&f, ListOptions::default()).unwrap()), ["c", "d"]);
}

#[test]
fn name_and_prefix_filters() {
    let td = tempdir().unwrap();
    let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
    plant(&store, "server.log", "/var/log/server.log", day(1), b"log");
    plant(&store, "notes.md", "/home/u/notes.md", day(2), b"md");
    plant(&store, "x_2", "/home/u/logs/old.log", day(3), b"renamed");

    let f = Filter {
        name_pattern: Some(NamePattern::new("*.log").unwrap()),
        ..Filter::default()
    };
    let opts = ListOptions {
        by_time: true,
        with_sizes: false,
    };
    assert_eq!(names(store.list(&f, opts).unwrap()), ["server.log", "x_2"]);

    let f = Filter {
        original_path_prefix: Some(PathBuf::from("/home/u")),
        ..Filter::default()
    };
    assert_eq!(names(store.list(&f, opts).unwrap()), ["notes.md", "x_2"]);
}

#[test]
fn expire_two_weeks_is_idempotent() {
    let td = tempdir().unwrap();
    let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
    let now = Local::now().naive_local();
    plant(&store, "ancient", "/h/ancient", now - Duration::days(40), b"1234");
    plant(&store, "older", "/h/older", now - Duration::days(15), b"12");
    plant(&store, "recent", "/h/recent", now - Duration::days(3), b"1");

    let expirer = Expirer::new(&store);
    let cutoff = now - Duration::weeks(2);
    let first = expirer.expire(cutoff).unwrap();
    assert_eq!(first.count, 2);
    assert_eq!(first.bytes, 6);
    assert!(first.is_success());

    let second = expirer.expire(cutoff).unwrap();
    assert_eq!(second.count, 0);

    let left = names(store.list(&Filter::everything(), ListOptions::default()).unwrap());
    assert_eq!(left, ["recent"]);
}

#[test]
fn interrupted_trash_leaves_a_detectable_metadata_only_orphan() {
    let td = tempdir().unwrap();
    let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
    plant(&store, "valid.txt", "/h/valid.txt", day(5), b"ok");

    // State after a crash between the record commit and the content move.
    fs::write(store.info_path("crashed.txt"), record_text("/h/crashed.txt", day(6))).unwrap();
    // Content whose record was deleted by hand.
    fs::write(store.content_path("stray.bin"), b"stray").unwrap();

    let orphans = store.orphans(&Filter::everything()).unwrap();
    let kinds: Vec<(&str, OrphanKind)> = orphans.iter().map(|o| (o.trash_name.as_str(), o.kind)).collect();
    assert_eq!(
        kinds,
        [
            ("crashed.txt", OrphanKind::MissingContent),
            ("stray.bin", OrphanKind::MissingMetadata)
        ]
    );
    assert_eq!(
        orphans[0].original_path.as_deref(),
        Some(Path::new("/h/crashed.txt"))
    );

    let listed = names(store.list(&Filter::everything(), ListOptions::default()).unwrap());
    assert_eq!(listed, ["valid.txt"]);
}

#[test]
fn purge_reconciliation_leaves_a_consistent_trash() {
    let td = tempdir().unwrap();
    let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
    plant(&store, "valid.txt", "/h/valid.txt", day(5), b"ok");
    fs::write(store.info_path("crashed.txt"), record_text("/h/crashed.txt", day(6))).unwrap();
    fs::write(store.content_path("stray.bin"), b"stray").unwrap();

    let report = Expirer::new(&store)
        .with_grace(StdDuration::ZERO)
        .orphans(&Filter::everything(), Reconcile::Purge)
        .unwrap();
    assert_eq!(report.orphans.len(), 2);
    assert_eq!(report.outcome.count, 2);
    assert_eq!(report.outcome.bytes, 5);

    assert!(store.orphans(&Filter::everything()).unwrap().is_empty());
    let listed = names(store.list(&Filter::everything(), ListOptions::default()).unwrap());
    assert_eq!(listed, ["valid.txt"]);
}

#[test]
fn empty_with_size_filter_only_touches_matches() {
    let td = tempdir().unwrap();
    let store = TrashStore::open(Config::new(td.path().join("Trash"))).unwrap();
    plant(&store, "big", "/h/big", day(1), &[7u8; 2048]);
    plant(&store, "small", "/h/small", day(1), b"s");

    let f = Filter {
        min_size: Some(1024),
        ..Filter::default()
    };
    let report = Expirer::new(&store).empty(&f).unwrap();
    assert_eq!((report.count, report.bytes), (1, 2048));
    assert!(store.get("small").is_ok());
    assert!(store.get("big").is_err());
}
