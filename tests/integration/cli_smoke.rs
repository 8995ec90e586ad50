//! Smoke tests that drive the `margin` binary in an isolated workspace.

use crate::integration::test_utils::TestWorkspace;
use margin::level::AbstractionLevel;
use margin::store::CommentStore;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Run the binary from `ws` with config and credentials isolated from the host.
fn margin(ws: &Path, args: &[&str]) -> Output {
    let home = ws.join(".test-home");
    fs::create_dir_all(&home).unwrap();
    Command::new(env!("CARGO_BIN_EXE_margin"))
        .current_dir(ws)
        .env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("NO_COLOR", "1")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("MARGIN_API_KEY")
        .env_remove("MARGIN_LOG")
        .env_remove("MARGIN_LOG_FORMAT")
        .env_remove("MARGIN_LOG_OUTPUT")
        .env_remove("MARGIN_LOG_MODULES")
        .env_remove("MARGIN_PROVIDER__PROVIDER_TYPE")
        .env_remove("MARGIN_PROVIDER__MODEL")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_hello() {
    let ws = TestWorkspace::new();
    let output = margin(&ws.root, &["--quiet", "hello"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Hello from margin"));
}

#[test]
fn test_show_prints_numbered_source() {
    let ws = TestWorkspace::new();
    ws.write("app.py", "import os\nprint(os.getcwd())\n");

    let output = margin(&ws.root, &["--quiet", "show", "app.py"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("app.py (python)"));
    assert!(out.contains("print(os.getcwd())"));
}

#[test]
fn test_status_json_reports_defaults() {
    let ws = TestWorkspace::new();
    let output = margin(&ws.root, &["--quiet", "status", "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["provider"], "openai");
    assert_eq!(report["model"], "gpt-4o-mini");
    assert!(report["api_key"].as_str().unwrap().starts_with("missing"));
    assert_eq!(report["workspace_root"], ws.root.to_string_lossy().as_ref());
    assert_eq!(report["stats"]["total_files"], 0);
}

#[test]
fn test_workspace_config_is_applied() {
    let ws = TestWorkspace::new();
    ws.write(
        ".margin/config.toml",
        "[provider]\nprovider_type = \"ollama\"\nmodel = \"llama3.2\"\n",
    );

    let output = margin(&ws.root, &["--quiet", "status", "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["provider"], "ollama");
    assert_eq!(report["model"], "llama3.2");
    assert_eq!(report["api_key"], "not required");
}

#[test]
fn test_annotate_without_provider_fails_with_hint() {
    let ws = TestWorkspace::new();
    ws.write("lib.rs", "fn main() {}\n");

    let output = margin(&ws.root, &["--quiet", "annotate", "lib.rs"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Provider not configured"), "stderr: {}", err);
    assert!(err.contains("Hint:"));
}

#[test]
fn test_annotate_serves_cache_without_provider() {
    let ws = TestWorkspace::new();
    let file = ws.write("lib.rs", "fn main() {}\n");
    let mut store = CommentStore::open(&ws.root);
    store.put_entry(
        &file,
        AbstractionLevel::Overview,
        vec!["Empty entry point.".to_string()],
        "fn main() {}\n",
        "gpt-4o-mini",
        "rust",
    );
    drop(store);

    let output = margin(
        &ws.root,
        &["--quiet", "annotate", "lib.rs", "--level", "1", "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["cached"], true);
    assert_eq!(value["comments"][0], "Empty entry point.");
}

#[test]
fn test_annotate_rejects_bad_input() {
    let ws = TestWorkspace::new();
    ws.write("notes.txt", "hello");
    ws.write("lib.rs", "fn main() {}");

    let unsupported = margin(&ws.root, &["--quiet", "annotate", "notes.txt"]);
    assert_eq!(unsupported.status.code(), Some(1));
    assert!(stderr(&unsupported).contains("Unsupported file type"));

    let bad_level = margin(&ws.root, &["--quiet", "level", "lib.rs", "7"]);
    assert_eq!(bad_level.status.code(), Some(1));
    assert!(stderr(&bad_level).contains("Invalid abstraction level 7"));

    let missing = margin(&ws.root, &["--quiet", "annotate", "gone.rs"]);
    assert_eq!(missing.status.code(), Some(1));
    assert!(stderr(&missing).contains("No readable source file"));
}

#[test]
fn test_cache_commands() {
    let ws = TestWorkspace::new();
    let file = ws.write("a.rs", "fn a() {}");
    let mut store = CommentStore::open(&ws.root);
    store.put_entry(&file, AbstractionLevel::Overview, vec!["A".into()], "fn a() {}", "m", "rust");
    store.put_entry(&file, AbstractionLevel::Structural, vec!["S".into()], "fn a() {}", "m", "rust");
    drop(store);

    let stats = margin(&ws.root, &["--quiet", "cache", "stats", "--format", "json"]);
    assert!(stats.status.success(), "stderr: {}", stderr(&stats));
    let value: serde_json::Value = serde_json::from_str(&stdout(&stats)).unwrap();
    assert_eq!(value["total_files"], 1);
    assert_eq!(value["total_comments"], 2);
    assert_eq!(value["format_version"], "2.0");

    let list = margin(&ws.root, &["--quiet", "cache", "list", "--format", "json"]);
    let rows: serde_json::Value = serde_json::from_str(&stdout(&list)).unwrap();
    assert_eq!(rows[0]["path"], "a.rs");
    assert_eq!(rows[0]["levels"], serde_json::json!([1, 4]));

    let removed = margin(&ws.root, &["--quiet", "cache", "remove", "a.rs", "--level", "1"]);
    assert!(stdout(&removed).contains("Removed level 1 commentary for a.rs"));

    let cleared = margin(&ws.root, &["--quiet", "cache", "clear"]);
    assert!(stdout(&cleared).contains("Cleared cached commentary for 1 file(s)"));
    assert_eq!(CommentStore::open(&ws.root).stats().total_files, 0);
}

#[test]
fn test_log_output_to_file() {
    let ws = TestWorkspace::new();
    let output = margin(
        &ws.root,
        &["--log-level", "info", "--log-output", "file", "status"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let log = fs::read_to_string(ws.root.join(".margin").join("margin.log")).unwrap();
    assert!(log.contains("margin starting"), "log: {}", log);
}
