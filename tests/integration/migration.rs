//! Loading cache files written by older releases.

use crate::integration::test_utils::{read_store_json, TestWorkspace};
use margin::fingerprint;
use margin::level::AbstractionLevel;
use margin::store::{CommentStore, CURRENT_FORMAT_VERSION};
use serde_json::json;
use std::fs;

#[test]
fn test_unversioned_document_is_upgraded_in_place() {
    let ws = TestWorkspace::new();
    let file = ws.write("src/index.ts", "export const x = 1;\n");
    let legacy = json!({
        "entries": {
            "src/index.ts": {
                "1": {
                    "comments": ["Exports a constant."],
                    "fingerprint": fingerprint::digest("export const x = 1;\n"),
                    "generatedAt": "2024-03-01T10:00:00Z",
                    "model": "gpt-4",
                    "language": "typescript"
                }
            }
        }
    });
    fs::write(ws.store_file(), serde_json::to_string_pretty(&legacy).unwrap()).unwrap();

    let store = CommentStore::open(&ws.root);
    assert!(store.has_valid_entry(&file, AbstractionLevel::Overview, "export const x = 1;\n"));

    let json = read_store_json(&ws.store_file());
    assert_eq!(json["formatVersion"], CURRENT_FORMAT_VERSION);
    assert_eq!(json["metadata"]["totalFiles"], 1);
    assert_eq!(json["metadata"]["totalComments"], 1);
    assert_eq!(json["metadata"]["createdAt"], "2024-03-01T10:00:00Z");
    assert_eq!(json["entries"]["src/index.ts"]["1"]["abstractionLevel"], 1);
}

#[test]
fn test_version_one_entries_gain_defaults() {
    let ws = TestWorkspace::new();
    let file = ws.write("tool.go", "package main\n");
    let legacy = json!({
        "formatVersion": "1.0",
        "metadata": {
            "totalFiles": 5,
            "totalComments": 99,
            "createdAt": "2023-12-31T00:00:00Z",
            "lastUpdated": "2024-01-01T00:00:00Z"
        },
        "entries": {
            "tool.go": { "2": { "comments": ["Main package."], "fingerprint": "stale" } }
        }
    });
    fs::write(ws.store_file(), legacy.to_string()).unwrap();

    let store = CommentStore::open(&ws.root);
    let entry = store.entry(&file, AbstractionLevel::KeyComponents).unwrap();
    assert_eq!(entry.model, "unknown");
    assert_eq!(entry.language, "unknown");
    assert!(!store.has_valid_entry(&file, AbstractionLevel::KeyComponents, "package main\n"));

    let stats = store.stats();
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.total_comments, 1);
    assert_eq!(stats.format_version, CURRENT_FORMAT_VERSION);
}

#[test]
fn test_invalid_levels_are_dropped_and_rest_kept() {
    let ws = TestWorkspace::new();
    let legacy = json!({
        "formatVersion": "2.0",
        "entries": {
            "a.rb": {
                "0": { "comments": ["bad"], "fingerprint": "f" },
                "3": { "comments": ["good"], "fingerprint": "f", "generatedAt": "2024-01-01T00:00:00Z", "model": "m", "language": "ruby" }
            },
            "b.rb": { "7": { "comments": ["bad"], "fingerprint": "f" } }
        }
    });
    fs::write(ws.store_file(), legacy.to_string()).unwrap();

    let store = CommentStore::open(&ws.root);
    assert_eq!(store.document().entries.len(), 1);
    assert_eq!(
        store.get_entry(std::path::Path::new("a.rb"), AbstractionLevel::Functional).unwrap(),
        &["good".to_string()]
    );

    let json = read_store_json(&ws.store_file());
    assert!(json["entries"].get("b.rb").is_none());
    assert!(json["entries"]["a.rb"].get("0").is_none());
}

#[test]
fn test_current_document_is_not_rewritten() {
    let ws = TestWorkspace::new();
    let file = ws.write("a.rs", "a");
    let mut store = CommentStore::open(&ws.root);
    store.put_entry(&file, AbstractionLevel::Overview, vec!["A".into()], "a", "m", "rust");
    drop(store);

    let before = fs::read_to_string(ws.store_file()).unwrap();
    let _ = CommentStore::open(&ws.root);
    assert_eq!(fs::read_to_string(ws.store_file()).unwrap(), before);
}

#[test]
fn test_legacy_entries_with_odd_fields_survive_upgrade() {
    let ws = TestWorkspace::new();
    let epoch = ws.write("epoch.ts", "let a = 1;\n");
    let nofp = ws.write("nofp.ts", "let b = 2;\n");
    let legacy = json!({
        "formatVersion": "1.0",
        "entries": {
            "epoch.ts": {
                "5": {
                    "comments": ["Declares a."],
                    "fingerprint": fingerprint::digest("let a = 1;\n"),
                    "generatedAt": 1700000000000i64,
                    "model": "gpt-4",
                    "language": "typescript"
                }
            },
            "nofp.ts": { "1": { "comments": ["summary"], "model": "gpt-4" } }
        }
    });
    fs::write(ws.store_file(), legacy.to_string()).unwrap();

    let store = CommentStore::open(&ws.root);
    assert_eq!(
        store.get_entry(&epoch, AbstractionLevel::LineByLine).unwrap(),
        &["Declares a.".to_string()]
    );
    assert!(store.has_valid_entry(&epoch, AbstractionLevel::LineByLine, "let a = 1;\n"));
    assert_eq!(
        store.get_entry(&nofp, AbstractionLevel::Overview).unwrap(),
        &["summary".to_string()]
    );
    assert!(!store.has_valid_entry(&nofp, AbstractionLevel::Overview, "let b = 2;\n"));
    assert_eq!(store.stats().total_files, 2);

    let json = read_store_json(&ws.store_file());
    assert_eq!(json["entries"]["epoch.ts"]["5"]["generatedAt"], "2023-11-14T22:13:20Z");
    assert_eq!(json["entries"]["nofp.ts"]["1"]["fingerprint"], "");
    assert_eq!(json["metadata"]["totalComments"], 2);
}

#[test]
fn test_null_entries_loads_as_empty_document() {
    let ws = TestWorkspace::new();
    fs::write(ws.store_file(), r#"{"formatVersion":"1.0","entries":null}"#).unwrap();

    let store = CommentStore::open(&ws.root);
    assert!(store.document().entries.is_empty());

    let json = read_store_json(&ws.store_file());
    assert_eq!(json["formatVersion"], CURRENT_FORMAT_VERSION);
    assert!(json["entries"].as_object().unwrap().is_empty());
}
