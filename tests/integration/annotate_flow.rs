//! End-to-end annotation: cache-first lookup, generation, persistence.

use crate::integration::test_utils::{read_store_json, ScriptedProvider, TestWorkspace};
use margin::annotate::Annotator;
use margin::error::ApiError;
use margin::generation::CommentaryGenerator;
use margin::level::AbstractionLevel;
use margin::provider::CompletionOptions;
use margin::reconcile::FALLBACK_LINE_COMMENT;
use margin::store::CommentStore;

fn annotator(ws: &TestWorkspace, provider: &ScriptedProvider) -> Annotator {
    Annotator::new(
        CommentStore::open(&ws.root),
        CommentaryGenerator::new(Box::new(provider.clone()), CompletionOptions::default()),
    )
}

#[tokio::test]
async fn test_line_by_line_is_aligned_and_persisted() {
    let ws = TestWorkspace::new();
    let file = ws.write("src/app.py", "import os\n\nprint(os.getcwd())");
    let provider = ScriptedProvider::new(
        "scripted-1",
        vec![Ok("1. Imports the os module\n3. Prints the working directory".to_string())],
    );

    let mut annotator = annotator(&ws, &provider);
    let annotation = annotator
        .annotate(&file, AbstractionLevel::LineByLine, false)
        .await
        .unwrap();

    assert!(!annotation.cached);
    assert_eq!(annotation.model, "scripted-1");
    assert_eq!(annotation.language, "python");
    assert_eq!(
        annotation.comments,
        vec!["Imports the os module", "", "Prints the working directory"]
    );
    assert!(provider.user_prompt(0).contains("   1 | import os"));

    let json = read_store_json(&ws.store_file());
    let entry = &json["entries"]["src/app.py"]["5"];
    assert_eq!(entry["comments"][2], "Prints the working directory");
    assert_eq!(entry["language"], "python");
    assert_eq!(entry["fingerprint"], margin::fingerprint::digest("import os\n\nprint(os.getcwd())").as_str());
}

#[tokio::test]
async fn test_short_reply_is_padded() {
    let ws = TestWorkspace::new();
    let file = ws.write("a.rs", "fn a() {}\nfn b() {}\nfn c() {}");
    let provider = ScriptedProvider::new("m", vec![Ok("Defines a".to_string())]);

    let annotation = annotator(&ws, &provider)
        .annotate(&file, AbstractionLevel::LineByLine, false)
        .await
        .unwrap();
    assert_eq!(annotation.comments.len(), 3);
    assert_eq!(annotation.comments[0], "Defines a");
    assert_eq!(annotation.comments[1], FALLBACK_LINE_COMMENT);
    assert_eq!(annotation.comments[2], FALLBACK_LINE_COMMENT);
}

#[tokio::test]
async fn test_cache_survives_reopen_without_provider() {
    let ws = TestWorkspace::new();
    let file = ws.write("lib.rs", "pub fn add(a: i32, b: i32) -> i32 { a + b }\n");
    let provider = ScriptedProvider::new("m", vec![Ok("Adds two integers.".to_string())]);

    annotator(&ws, &provider)
        .annotate(&file, AbstractionLevel::Overview, false)
        .await
        .unwrap();
    assert_eq!(provider.call_count(), 1);

    let mut offline = Annotator::cache_only(CommentStore::open(&ws.root), "no provider");
    let hit = offline
        .annotate(&file, AbstractionLevel::Overview, false)
        .await
        .unwrap();
    assert!(hit.cached);
    assert_eq!(hit.comments, vec!["Adds two integers."]);

    let miss = offline
        .annotate(&file, AbstractionLevel::Functional, false)
        .await
        .unwrap_err();
    assert!(matches!(miss, ApiError::ProviderNotConfigured(_)));
}

#[tokio::test]
async fn test_levels_are_cached_independently() {
    let ws = TestWorkspace::new();
    let file = ws.write("lib.rs", "fn main() {}\n");
    let provider = ScriptedProvider::new(
        "m",
        vec![Ok("Overview.".to_string()), Ok("Structure.".to_string())],
    );
    let mut annotator = annotator(&ws, &provider);

    annotator.annotate(&file, AbstractionLevel::Overview, false).await.unwrap();
    annotator.annotate(&file, AbstractionLevel::Structural, false).await.unwrap();
    let again = annotator
        .annotate(&file, AbstractionLevel::Overview, false)
        .await
        .unwrap();

    assert!(again.cached);
    assert_eq!(again.comments, vec!["Overview."]);
    assert_eq!(provider.call_count(), 2);
    assert_eq!(annotator.store().stats().total_comments, 2);
}

#[tokio::test]
async fn test_edit_triggers_regeneration() {
    let ws = TestWorkspace::new();
    let file = ws.write("lib.rs", "fn one() {}");
    let provider = ScriptedProvider::new(
        "m",
        vec![Ok("First.".to_string()), Ok("Second.".to_string())],
    );
    let mut annotator = annotator(&ws, &provider);

    annotator.annotate(&file, AbstractionLevel::Overview, false).await.unwrap();
    ws.write("lib.rs", "fn two() {}");
    let fresh = annotator
        .annotate(&file, AbstractionLevel::Overview, false)
        .await
        .unwrap();

    assert!(!fresh.cached);
    assert_eq!(fresh.comments, vec!["Second."]);
    assert!(provider.user_prompt(1).contains("fn two() {}"));
}

#[tokio::test]
async fn test_provider_failure_leaves_store_untouched() {
    let ws = TestWorkspace::new();
    let file = ws.write("lib.rs", "fn main() {}");
    let provider = ScriptedProvider::new("m", vec![Err("connection refused".to_string())]);

    let err = annotator(&ws, &provider)
        .annotate(&file, AbstractionLevel::Overview, false)
        .await
        .unwrap_err();
    match err {
        ApiError::GenerationFailed(message) => assert!(message.contains("connection refused")),
        other => panic!("unexpected error: {:?}", other),
    }

    let json = read_store_json(&ws.store_file());
    assert!(json["entries"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_file_never_reaches_provider() {
    let ws = TestWorkspace::new();
    let file = ws.write("README.md", "# Title");
    let provider = ScriptedProvider::new("m", vec![Ok("unused".to_string())]);

    let err = annotator(&ws, &provider)
        .annotate(&file, AbstractionLevel::Overview, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::UnsupportedFile(_)));
    assert_eq!(provider.call_count(), 0);
}
