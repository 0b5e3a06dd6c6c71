//! Export and review helpers over the stored dataset.

use crate::{error::{Result, ScrapeError}, record::{FieldValue, Record, View}, store::Dataset};
use chrono::{Local, TimeZone};
use std::path::{Path, PathBuf};

/// Pretty JSON array of one view's records
pub fn records_json(records: &[Record]) -> Result<String> {
    serde_json::to_string_pretty(records).map_err(|e| ScrapeError::storage("failed to encode records", e))
}

/// Pretty JSON of the whole dataset, in its persisted layout
pub fn dataset_json(dataset: &Dataset) -> Result<String> {
    serde_json::to_string_pretty(dataset).map_err(|e| ScrapeError::storage("failed to encode dataset", e))
}

/// CSV of one view's records.
///
/// Columns come from the first record (`id` first, then its fields in order).
/// Returns `None` for an empty list.
pub fn records_csv(records: &[Record]) -> Option<String> {
    let first = records.first()?;
    let columns: Vec<&str> = std::iter::once("id")
        .chain(first.fields.keys().map(String::as_str))
        .collect();

    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(columns.join(","));
    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| match *column {
                "id" => record.id.as_deref().map(csv_text).unwrap_or_default(),
                name => record.get(name).map(csv_cell).unwrap_or_default(),
            })
            .collect();
        rows.push(cells.join(","));
    }

    Some(rows.join("\n"))
}

fn csv_cell(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        // lists are always quoted as a JSON string
        FieldValue::List(items) => serde_json::Value::String(items.join(", ")).to_string(),
        FieldValue::Text(text) => csv_text(text),
    }
}

fn csv_text(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// One CSV document per non-empty view
pub fn csv_bundle(dataset: &Dataset) -> Vec<(View, String)> {
    View::ALL
        .iter()
        .filter_map(|view| records_csv(dataset.records(*view)).map(|csv| (*view, csv)))
        .collect()
}

/// Write the bundle as `<view>.csv` files under `dir`
pub async fn write_csv_bundle(dataset: &Dataset, dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ScrapeError::storage("failed to create export directory", e))?;

    let mut written = Vec::new();
    for (view, csv) in csv_bundle(dataset) {
        let path = dir.join(format!("{}.csv", view));
        tokio::fs::write(&path, csv)
            .await
            .map_err(|e| ScrapeError::storage(&format!("failed to write {}", path.display()), e))?;
        written.push(path);
    }

    Ok(written)
}

/// Records whose JSON form contains `term`, ignoring case
pub fn filter_records<'a>(records: &'a [Record], term: &str) -> Vec<&'a Record> {
    let needle = term.to_lowercase();
    records
        .iter()
        .filter(|record| {
            needle.is_empty()
                || serde_json::to_string(record)
                    .map(|json| json.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        })
        .collect()
}

/// `Contacts: 3 | Deals: 1 | Tasks: 0 | Last synced: 14:02:11`
pub fn summary_line(dataset: &Dataset) -> String {
    format!(
        "Contacts: {} | Deals: {} | Tasks: {} | Last synced: {}",
        dataset.contacts.len(),
        dataset.deals.len(),
        dataset.tasks.len(),
        format_last_sync(dataset.last_sync)
    )
}

fn format_last_sync(millis: i64) -> String {
    if millis <= 0 {
        return "Never".to_string();
    }

    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => "Never".to_string(),
    }
}
