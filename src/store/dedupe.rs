use crate::record::Record;
use std::collections::HashSet;

/// Legacy 32-bit shift-subtract string hash.
///
/// Reproduces `s.split('').reduce((h, c) => (h << 5) - h + c.charCodeAt(0), 0)`
/// evaluated with JavaScript number semantics: the shift operand is truncated
/// to i32 on every step while the subtraction and addition are not. Keys that
/// were persisted by earlier versions of the extension therefore stay stable.
fn legacy_hash(s: &str) -> i64 {
    s.encode_utf16().fold(0i64, |h, unit| {
        let shifted = (h as i32).wrapping_shl(5) as i64;
        shifted - h + unit as i64
    })
}

/// Identity for records without a natural id: a hash of `title + relatedTo + due`.
///
/// Needs a title and at least one of `relatedTo` or `due`.
pub fn fallback_key(record: &Record) -> Option<String> {
    let title = record.text("title")?;
    let related = record.text("relatedTo");
    let due = record.text("due");
    if related.is_none() && due.is_none() {
        return None;
    }

    let joined = format!("{}{}{}", title, related.unwrap_or(""), due.unwrap_or(""));
    Some(legacy_hash(&joined).to_string())
}

/// Key deciding whether two records are the same entity
pub fn identity_key(record: &Record) -> Option<String> {
    match record.natural_id() {
        Some(id) => Some(id.to_string()),
        None => fallback_key(record),
    }
}

/// Collapse a raw list to one record per identity key.
///
/// The first occurrence wins and input order is kept: rows come in render
/// order, freshest first. Records without an identity key are dropped. Every
/// output record has `id` set to its key.
pub fn dedupe(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    let input_len = records.len();

    let unique: Vec<Record> = records
        .into_iter()
        .filter_map(|mut record| {
            let key = identity_key(&record)?;
            if !seen.insert(key.clone()) {
                return None;
            }
            record.id = Some(key);
            Some(record)
        })
        .collect();

    if unique.len() != input_len {
        log::debug!("Deduplicated {} raw record(s) into {}", input_len, unique.len());
    }
    unique
}
