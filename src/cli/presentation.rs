//! Presentation for status and cache commands (text and json).

use crate::error::ApiError;
use crate::render::{heading, to_json};
use crate::store::{StoreStats, StoredFileSummary};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde::Serialize;
use std::path::PathBuf;

/// Everything `margin status` reports.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub workspace_root: PathBuf,
    pub store_path: PathBuf,
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub config_files: Vec<PathBuf>,
    pub stats: StoreStats,
}

pub fn format_status(report: &StatusReport, format: &str, color: bool) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(report);
    }
    let mut lines = vec![
        heading("margin status", color),
        format!("  Workspace:   {}", report.workspace_root.display()),
        format!("  Store:       {}", report.store_path.display()),
        format!("  Provider:    {} ({})", report.provider, report.model),
        format!("  API key:     {}", report.api_key),
    ];
    if report.config_files.is_empty() {
        lines.push("  Config:      defaults".to_string());
    } else {
        for (i, path) in report.config_files.iter().enumerate() {
            let label = if i == 0 { "  Config:      " } else { "               " };
            lines.push(format!("{}{}", label, path.display()));
        }
    }
    lines.push(String::new());
    lines.push(format_stats_text(&report.stats));
    Ok(lines.join("\n"))
}

pub fn format_stats(stats: &StoreStats, format: &str) -> Result<String, ApiError> {
    if format == "json" {
        to_json(stats)
    } else {
        Ok(format_stats_text(stats))
    }
}

fn format_stats_text(stats: &StoreStats) -> String {
    format!(
        "Cache:\n  Files:       {}\n  Comments:    {}\n  Size:        {}\n  Created:     {}\n  Updated:     {}\n  Format:      {}",
        stats.total_files,
        stats.total_comments,
        human_bytes(stats.storage_bytes),
        stats.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        stats.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        stats.format_version
    )
}

pub fn format_file_list(rows: &[StoredFileSummary], format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(&rows);
    }
    if rows.is_empty() {
        return Ok("No cached commentary.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["File", "Levels", "Comments", "Last updated"]);
    for row in rows {
        let levels = row
            .levels
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(",");
        table.add_row(vec![
            row.path.clone(),
            levels,
            row.total_comments.to_string(),
            row.last_updated.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    Ok(table.to_string())
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
