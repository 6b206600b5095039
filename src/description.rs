//! Recovers key/value properties from HTML tables embedded in KML
//! descriptions, as written by most GIS exports:
//!
//! ```text
//! <table>
//!   <tr><td>Owner</td>
//!       <td>Alice</td></tr>
//! </table>
//! ```
//!
//! This is a line-based heuristic, not an HTML parser. A row is kept only
//! when its text, tags removed, is exactly two non-empty lines.

use std::sync::LazyLock;

use geojson::JsonObject;
use regex::Regex;
use serde_json::Value;

static RE_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<table").expect("valid table regex"));
static RE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<tr\b[^>]*>").expect("valid row regex"));
static RE_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<td\b[^>]*>").expect("valid cell regex"));
static RE_HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid html tag regex"));

pub fn is_table(description: &str) -> bool {
    RE_TABLE.is_match(description)
}

/// Extracts `(field, value)` pairs from the rows of a description table.
/// Rows that do not reduce to exactly two lines are skipped.
pub fn table_rows(description: &str) -> Vec<(String, String)> {
    RE_ROW
        .split(description)
        .filter(|segment| RE_CELL.is_match(segment))
        .filter_map(parse_row)
        .collect()
}

fn parse_row(segment: &str) -> Option<(String, String)> {
    let text = RE_HTML_TAG.replace_all(segment, "").replace('\r', "");
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [field, value] => Some((field.to_string(), value.to_string())),
        _ => None,
    }
}

/// Merges the table rows into `properties`. A key that already holds a
/// value keeps it under `og_<key>` before being overwritten. Returns the
/// number of rows merged.
pub fn merge_table(properties: &mut JsonObject, description: &str) -> usize {
    let rows = table_rows(description);
    for (field, value) in &rows {
        if let Some(original) = properties.get(field).cloned() {
            properties.insert(format!("og_{field}"), original);
        }
        properties.insert(field.clone(), Value::String(value.clone()));
    }
    rows.len()
}
