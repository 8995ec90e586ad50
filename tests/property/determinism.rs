//! Property-based tests for fingerprint and alignment guarantees

use margin::fingerprint;
use margin::reconcile::{reconcile_line_comments, source_lines};
use margin::store::{store_key, KeyRoot};
use proptest::prelude::*;
use std::path::Path;

/// Same content always yields the same 64-char hex fingerprint
#[test]
fn test_fingerprint_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(".*", ".*"), |(a, b)| {
            let fa = fingerprint::digest(&a);
            prop_assert_eq!(&fa, &fingerprint::digest(&a));
            prop_assert_eq!(fa.len(), 64);
            prop_assert!(fa.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            prop_assert!(fingerprint::matches(&fa, &a));
            if a != b {
                prop_assert_ne!(fa, fingerprint::digest(&b));
            }
            Ok(())
        })
        .unwrap();
}

/// Reconciled comments line up 1:1 with the source, blanks stay blank
#[test]
fn test_reconcile_alignment_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    let source = prop::collection::vec("[ a-z(){};]{0,12}", 0..30).prop_map(|lines| lines.join("\n"));
    let reply = prop::collection::vec("[ 0-9a-zA-Z.:/*#-]{0,20}", 0..40).prop_map(|lines| lines.join("\n"));

    runner
        .run(&(source, reply), |(source, reply)| {
            let comments = reconcile_line_comments(&reply, &source);
            let lines = source_lines(&source);
            prop_assert_eq!(comments.len(), lines.len());
            for (line, comment) in lines.iter().zip(&comments) {
                if line.trim().is_empty() {
                    prop_assert!(comment.is_empty());
                } else {
                    prop_assert!(!comment.is_empty());
                }
            }
            Ok(())
        })
        .unwrap();
}

/// Spelling variants of the same workspace path map to one store key
#[test]
fn test_store_key_normalization_property() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let root = KeyRoot::new(Path::new("/ws"));

    runner
        .run(&prop::collection::vec("[a-z]{1,8}", 1..5), |segments| {
            let relative = segments.join("/");
            let plain = store_key(Some(&root), Path::new(&relative));
            let dotted = store_key(Some(&root), Path::new(&format!("./{}", relative)));
            let absolute = store_key(Some(&root), Path::new(&format!("/ws/{}", relative)));
            let detour = store_key(Some(&root), Path::new(&format!("/ws/x/../{}", relative)));
            prop_assert_eq!(&plain, &relative);
            prop_assert_eq!(&dotted, &relative);
            prop_assert_eq!(&absolute, &relative);
            prop_assert_eq!(&detour, &relative);
            Ok(())
        })
        .unwrap();
}
