//! Filename sanitization.
//!
//! Model-authored names are untrusted. Every name is reduced to a single flat
//! segment before it reaches the filesystem or an archive entry.

use crate::parser::{FileRecord, FALLBACK_FILENAME};

fn is_unsafe(c: char) -> bool {
    c.is_whitespace()
        || c.is_control()
        || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

/// Reduces `name` to a safe, flat file name.
///
/// Every unsafe character (whitespace, separators, `:` and the
/// Windows-reserved set) is replaced with `_` first, so a nested path keeps
/// its directory parts as a prefix: `src/lib.rs` becomes `src_lib.rs`.
/// The result holds no separator and is therefore a single segment.
/// Names that end up empty, `.` or `..` become `unknown.txt`.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if is_unsafe(c) { '_' } else { c })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// Archive file stem for a model identifier: sanitized and lowercased.
pub fn archive_stem(model: &str) -> String {
    let stem = sanitize_name(model).to_lowercase();
    if stem == FALLBACK_FILENAME {
        "model".to_string()
    } else {
        stem
    }
}

/// Sanitizes every record name and collapses duplicates.
///
/// When two records map to the same name the later content wins; the entry
/// keeps the position of the first occurrence.
pub fn dedupe_records(records: Vec<FileRecord>) -> Vec<FileRecord> {
    let mut out: Vec<FileRecord> = Vec::with_capacity(records.len());
    for record in records {
        let filename = sanitize_name(&record.filename);
        match out.iter_mut().find(|r| r.filename == filename) {
            Some(existing) => existing.content = record.content,
            None => out.push(FileRecord::new(filename, record.content)),
        }
    }
    out
}
