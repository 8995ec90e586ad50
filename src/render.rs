//! Terminal rendering of source files and their commentary.
//!
//! Line-by-line commentary is shown as a table with one row per source line;
//! summary levels print the paragraph above the numbered source.

use crate::annotate::Annotation;
use crate::error::{ApiError, StoreError};
use crate::level::CommentShape;
use crate::reconcile::source_lines;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Pretty-printed JSON for command output.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::from(StoreError::from(e)))
}

/// Numbered source listing; the width of the gutter follows the line count.
pub fn render_source(content: &str) -> String {
    let lines = source_lines(content);
    let width = lines.len().to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$} | {}", i + 1, line, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Raw file view: a heading plus the numbered source.
pub fn render_raw(title: &str, content: &str, color: bool) -> String {
    format!("{}\n\n{}", heading(title, color), render_source(content))
}

/// Commentary view for `annotation` against the current `source`.
pub fn render_annotation(annotation: &Annotation, source: &str, color: bool) -> String {
    let origin = if annotation.cached { "cached" } else { "generated" };
    let title = format!(
        "{} · level {} ({}) · {} · {}",
        annotation.path.display(),
        annotation.level,
        annotation.level.label(),
        annotation.model,
        origin
    );

    let body = match annotation.level.shape() {
        CommentShape::PerLine => line_table(source, &annotation.comments).to_string(),
        CommentShape::Single => {
            let summary = annotation
                .comments
                .first()
                .map(String::as_str)
                .unwrap_or_default();
            format!("{}\n\n{}", summary, render_source(source))
        }
    };

    format!("{}\n\n{}", heading(&title, color), body)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationView<'a> {
    #[serde(flatten)]
    annotation: &'a Annotation,
    lines: Vec<LineView<'a>>,
}

#[derive(Serialize)]
struct LineView<'a> {
    line: usize,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

/// JSON form of the commentary view, pairing each source line with its comment
/// for line-level commentary.
pub fn render_annotation_json(annotation: &Annotation, source: &str) -> Result<String, ApiError> {
    let lines = match annotation.level.shape() {
        CommentShape::PerLine => source_lines(source)
            .into_iter()
            .enumerate()
            .map(|(i, line)| LineView {
                line: i + 1,
                source: line,
                comment: annotation.comments.get(i).map(String::as_str),
            })
            .collect(),
        CommentShape::Single => Vec::new(),
    };
    to_json(&AnnotationView { annotation, lines })
}

fn line_table(source: &str, comments: &[String]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Source", "Comment"]);
    for (i, line) in source_lines(source).into_iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(line),
            Cell::new(comments.get(i).map(String::as_str).unwrap_or_default()),
        ]);
    }
    table
}

pub fn heading(title: &str, color: bool) -> String {
    if color {
        format!("{}", title.bold().underline())
    } else {
        title.to_string()
    }
}
