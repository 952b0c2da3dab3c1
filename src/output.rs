//! Plain-text and JSON rendering of dashboard outcomes.

use crate::dashboard::Outcome;
use crate::db::{TabularResult, Value};
use crate::error::{DashboardError, Result};
use std::str::FromStr;

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// How outcomes are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Bordered text table.
    #[default]
    Text,
    /// JSON document.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Renders an outcome in the requested format.
pub fn render(outcome: &Outcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(outcome)),
        OutputFormat::Json => serde_json::to_string_pretty(outcome)
            .map_err(|e| DashboardError::internal(format!("Failed to encode output: {e}"))),
    }
}

/// Renders an outcome as a titled text table or status line.
pub fn render_text(outcome: &Outcome) -> String {
    let mut lines = Vec::new();

    match outcome {
        Outcome::Table { title, result, .. } => {
            lines.push(title.clone());
            lines.extend(render_table(result));
        }
        Outcome::Updated { title, .. } => lines.push(title.clone()),
    }

    lines.push(outcome.summary());
    lines.join("\n")
}

/// Renders a result as bordered table lines.
pub fn render_table(result: &TabularResult) -> Vec<String> {
    if result.column_names.is_empty() {
        return vec!["(empty result)".to_string()];
    }

    let widths = column_widths(result);
    let mut lines = Vec::with_capacity(result.rows.len() + 4);

    lines.push(border(&widths, '┌', '┬', '┐'));
    lines.push(cells(result.column_names.iter().map(String::as_str), &widths));
    lines.push(border(&widths, '├', '┼', '┤'));
    for row in &result.rows {
        let values: Vec<String> = row.iter().map(Value::to_display_string).collect();
        lines.push(cells(values.iter().map(String::as_str), &widths));
    }
    lines.push(border(&widths, '└', '┴', '┘'));

    lines
}

/// Calculates the width of each column from its header and values.
fn column_widths(result: &TabularResult) -> Vec<usize> {
    let mut widths: Vec<usize> = result
        .column_names
        .iter()
        .map(|name| name.chars().count().max(MIN_COLUMN_WIDTH))
        .collect();

    for row in &result.rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.to_display_string().chars().count());
        }
    }

    widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
}

/// Truncates a string to fit within the given width, adding ellipsis if needed.
fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{kept}...")
    }
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|&w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}", segments.join(&mid.to_string()))
}

fn cells<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::from("│");
    for (value, &width) in values.zip(widths) {
        let text = truncate(value, width);
        line.push_str(&format!(" {text:width$} │"));
    }
    line
}
