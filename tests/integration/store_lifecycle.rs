//! Comment store lifecycle against a real workspace directory.

use crate::integration::test_utils::{read_store_json, TestWorkspace};
use margin::level::AbstractionLevel;
use margin::store::{CommentStore, CURRENT_FORMAT_VERSION};
use std::fs;

fn comments(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_open_creates_empty_document() {
    let ws = TestWorkspace::new();
    let store = CommentStore::open(&ws.root);
    assert_eq!(store.path(), ws.store_file());

    let json = read_store_json(&ws.store_file());
    assert_eq!(json["formatVersion"], CURRENT_FORMAT_VERSION);
    assert_eq!(json["metadata"]["totalFiles"], 0);
    assert!(json["entries"].as_object().unwrap().is_empty());
}

#[test]
fn test_entries_round_trip_through_disk() {
    let ws = TestWorkspace::new();
    let file = ws.write("src/main.rs", "fn main() {}\n");

    let mut store = CommentStore::open(&ws.root);
    store.put_entry(
        &file,
        AbstractionLevel::LineByLine,
        comments(&["Entry point", ""]),
        "fn main() {}\n",
        "gpt-4o-mini",
        "rust",
    );
    drop(store);

    let reopened = CommentStore::open(&ws.root);
    assert!(reopened.has_valid_entry(&file, AbstractionLevel::LineByLine, "fn main() {}\n"));
    assert!(!reopened.has_valid_entry(&file, AbstractionLevel::LineByLine, "fn main() { }\n"));
    assert_eq!(
        reopened.get_entry(&file, AbstractionLevel::LineByLine).unwrap(),
        &["Entry point".to_string(), String::new()]
    );
    let entry = reopened.entry(&file, AbstractionLevel::LineByLine).unwrap();
    assert_eq!(entry.model, "gpt-4o-mini");
    assert_eq!(entry.abstraction_level, AbstractionLevel::LineByLine);
}

#[test]
fn test_relative_and_absolute_paths_share_a_key() {
    let ws = TestWorkspace::new();
    let file = ws.write("pkg/mod.py", "x = 1\n");

    let mut store = CommentStore::open(&ws.root);
    store.put_entry(&file, AbstractionLevel::Overview, comments(&["Sets x."]), "x = 1\n", "m", "python");

    assert_eq!(store.key_for(&file), "pkg/mod.py");
    assert!(store.has_valid_entry(std::path::Path::new("pkg/mod.py"), AbstractionLevel::Overview, "x = 1\n"));
    assert!(store.has_valid_entry(&ws.root.join("pkg/../pkg/mod.py"), AbstractionLevel::Overview, "x = 1\n"));
}

#[test]
fn test_metadata_tracks_mutations() {
    let ws = TestWorkspace::new();
    let a = ws.write("a.rs", "a");
    let b = ws.write("b.rs", "b");

    let mut store = CommentStore::open(&ws.root);
    store.put_entry(&a, AbstractionLevel::Overview, comments(&["A"]), "a", "m", "rust");
    store.put_entry(&a, AbstractionLevel::LineByLine, comments(&["a1"]), "a", "m", "rust");
    store.put_entry(&b, AbstractionLevel::Overview, comments(&["B"]), "b", "m", "rust");

    let stats = store.stats();
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_comments, 3);
    assert!(stats.storage_bytes > 0);

    store.remove_entry(&a, AbstractionLevel::Overview);
    assert_eq!(store.stats().total_comments, 2);
    assert_eq!(store.stats().total_files, 2);

    store.remove_entry(&a, AbstractionLevel::LineByLine);
    assert_eq!(store.stats().total_files, 1);

    let json = read_store_json(&ws.store_file());
    assert_eq!(json["metadata"]["totalFiles"], 1);
    assert_eq!(json["metadata"]["totalComments"], 1);
    assert!(json["entries"].get("a.rs").is_none());
}

#[test]
fn test_list_is_most_recent_first() {
    let ws = TestWorkspace::new();
    let old = ws.write("old.rs", "o");
    let new = ws.write("new.rs", "n");

    let mut store = CommentStore::open(&ws.root);
    store.put_entry(&old, AbstractionLevel::Overview, comments(&["o"]), "o", "m", "rust");
    std::thread::sleep(std::time::Duration::from_millis(5));
    store.put_entry(&new, AbstractionLevel::Functional, comments(&["n1", "n2"]), "n", "m", "rust");

    let rows = store.list_stored_files();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].path, "new.rs");
    assert_eq!(rows[0].levels, vec![AbstractionLevel::Functional]);
    assert_eq!(rows[0].total_comments, 2);
    assert_eq!(rows[1].path, "old.rs");
}

#[test]
fn test_clear_and_prune() {
    let ws = TestWorkspace::new();
    let keep = ws.write("keep.rs", "k");
    let gone = ws.write("gone.rs", "g");

    let mut store = CommentStore::open(&ws.root);
    store.put_entry(&keep, AbstractionLevel::Overview, comments(&["k"]), "k", "m", "rust");
    store.put_entry(&gone, AbstractionLevel::Overview, comments(&["g"]), "g", "m", "rust");

    fs::remove_file(&gone).unwrap();
    assert_eq!(store.prune_missing_files(), 1);
    assert_eq!(store.prune_missing_files(), 0);
    assert_eq!(store.list_stored_files()[0].path, "keep.rs");

    store.clear();
    assert_eq!(store.stats().total_files, 0);
    assert!(CommentStore::open(&ws.root).document().entries.is_empty());
}

#[test]
fn test_corrupt_file_is_replaced_on_next_write() {
    let ws = TestWorkspace::new();
    fs::write(ws.store_file(), "{ this is not json").unwrap();
    let file = ws.write("a.rs", "a");

    let mut store = CommentStore::open(&ws.root);
    assert!(store.document().entries.is_empty());
    assert_eq!(fs::read_to_string(ws.store_file()).unwrap(), "{ this is not json");

    store.put_entry(&file, AbstractionLevel::Overview, comments(&["A"]), "a", "m", "rust");
    let json = read_store_json(&ws.store_file());
    assert_eq!(json["entries"]["a.rs"]["1"]["comments"][0], "A");
}

#[test]
fn test_custom_file_name() {
    let ws = TestWorkspace::new();
    let store = CommentStore::open_with_file_name(&ws.root, "cache/notes.json");
    assert!(store.path().ends_with("cache/notes.json"));
    assert!(ws.root.join("cache/notes.json").is_file());
}
