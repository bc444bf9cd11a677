//! JSON manifest grammar.
//!
//! Accepts responses that describe their files as JSON: the whole response,
//! a response whose only fence is an unnamed ```` ```json ```` block, or the
//! first balanced `{...}`/`[...]` span in prose without any fence. A JSON
//! block sitting next to other fences, or carrying a file name of its own,
//! is a file and is left to the fence grammar. Recognised shapes:
//!
//! - `{"files": [{"filename": "...", "code": "..."}, ...]}`
//! - `[{"path": "...", "content": "..."}, ...]`, every item named
//! - `{"main.py": "...", "util.py": "..."}`

use serde_json::Value;

use super::fenced::scan_blocks;
use super::names::looks_like_filename;
use super::{FallbackNames, FileBlockGrammar, FileRecord};

const NAME_KEYS: &[&str] = &["filename", "file_name", "path", "name", "file"];
const CONTENT_KEYS: &[&str] = &["code", "content", "contents", "source", "text"];

/// Grammar for JSON file manifests.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManifestGrammar;

impl FileBlockGrammar for JsonManifestGrammar {
    fn name(&self) -> &'static str {
        "json_manifest"
    }

    fn extract(&self, response: &str) -> Vec<FileRecord> {
        for candidate in json_candidates(response) {
            let Ok(value) = serde_json::from_str::<Value>(&candidate) else {
                continue;
            };
            let records = records_from_value(&value);
            if !records.is_empty() {
                return records;
            }
        }
        Vec::new()
    }
}

/// Candidate JSON strings, most specific first.
fn json_candidates(response: &str) -> Vec<String> {
    let trimmed = response.trim();
    let mut candidates = Vec::new();
    if trimmed.is_empty() {
        return candidates;
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        candidates.push(trimmed.to_string());
    }

    let blocks = scan_blocks(trimmed);
    match blocks.as_slice() {
        [] => {
            if let Some(start) = trimmed.find(['{', '[']) {
                if let Some(end) = find_balanced_end(&trimmed[start..]) {
                    candidates.push(trimmed[start..=start + end].to_string());
                }
            }
        }
        [only] if only.name.is_none() && only.language() == "json" => {
            candidates.push(only.content.trim().to_string());
        }
        _ => {}
    }

    candidates
}

/// Finds the byte index of the bracket closing the one at position 0,
/// ignoring brackets inside string literals.
pub(crate) fn find_balanced_end(s: &str) -> Option<usize> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn records_from_value(value: &Value) -> Vec<FileRecord> {
    match value {
        // A bare array is only a manifest when every entry names its file.
        Value::Array(items) if items.iter().all(|item| item_name(item).is_some()) => {
            records_from_items(items)
        }
        Value::Array(_) => Vec::new(),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("files") {
                return records_from_items(items);
            }
            // A flat `{filename: content}` map.
            if !map.is_empty()
                && map
                    .iter()
                    .all(|(k, v)| v.is_string() && looks_like_filename(k))
            {
                return map
                    .iter()
                    .filter_map(|(k, v)| {
                        v.as_str().map(|content| FileRecord::new(k.clone(), content))
                    })
                    .collect();
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn item_name(item: &Value) -> Option<&str> {
    let obj = item.as_object()?;
    NAME_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

fn records_from_items(items: &[Value]) -> Vec<FileRecord> {
    let mut fallback = FallbackNames::default();
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let content = CONTENT_KEYS
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))?;
            let name = item_name(item)
                .map(str::to_string)
                .unwrap_or_else(|| fallback.next_name());
            Some(FileRecord::new(name, content))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<FileRecord> {
        JsonManifestGrammar.extract(text)
    }

    #[test]
    fn test_files_object() {
        let text = r#"{"files": [
            {"filename": "reverse.py", "code": "def reverse(s): return s[::-1]"},
            {"path": "tests/test_reverse.py", "content": "assert True"}
        ]}"#;
        let records = extract(text);
        assert_eq!(
            records,
            vec![
                FileRecord::new("reverse.py", "def reverse(s): return s[::-1]"),
                FileRecord::new("tests/test_reverse.py", "assert True"),
            ]
        );
    }

    #[test]
    fn test_bare_array_inside_prose() {
        let text = "Sure! Here you go:\n[{\"name\": \"a.js\", \"source\": \"let x = '[1]';\"}]\nEnjoy.";
        let records = extract(text);
        assert_eq!(records, vec![FileRecord::new("a.js", "let x = '[1]';")]);
    }

    #[test]
    fn test_json_fence() {
        let text = "Result:\n```json\n{\"files\": [{\"filename\": \"main.go\", \"code\": \"package main\"}]}\n```\n";
        assert_eq!(extract(text), vec![FileRecord::new("main.go", "package main")]);
    }

    #[test]
    fn test_flat_filename_map() {
        let text = r#"{"main.py": "print(1)", "util.py": "X = 2"}"#;
        let mut records = extract(text);
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        assert_eq!(
            records,
            vec![
                FileRecord::new("main.py", "print(1)"),
                FileRecord::new("util.py", "X = 2"),
            ]
        );
    }

    #[test]
    fn test_missing_name_gets_fallback() {
        let text = r#"{"files": [{"code": "one"}, {"code": "two"}]}"#;
        let records = extract(text);
        assert_eq!(records[0].filename, "unknown.txt");
        assert_eq!(records[1].filename, "unknown_2.txt");
    }

    #[test]
    fn test_bare_array_of_unnamed_rows_is_data() {
        assert!(extract(r#"[{"title": "Hello", "content": "First post"}]"#).is_empty());
    }

    #[test]
    fn test_named_json_fence_is_not_a_manifest() {
        let text = "### files.json\n```json\n{\"files\": [{\"filename\": \"a.py\", \"code\": \"x\"}]}\n```";
        assert!(extract(text).is_empty());
    }

    #[test]
    fn test_json_fence_among_other_fences_is_not_a_manifest() {
        let text = "```python app.py\nprint(1)\n```\n\n```json\n[{\"path\": \"b.py\", \"content\": \"y\"}]\n```";
        assert!(extract(text).is_empty());
    }

    #[test]
    fn test_unrelated_json_yields_nothing() {
        assert!(extract(r#"{"name": "pkg", "version": "1.0.0", "files": ["dist"]}"#).is_empty());
        assert!(extract("{not json at all").is_empty());
        assert!(extract("").is_empty());
        assert!(extract("no braces here").is_empty());
    }

    #[test]
    fn test_find_balanced_end() {
        assert_eq!(find_balanced_end("{\"a\": \"}\"}"), Some(9));
        assert_eq!(find_balanced_end("[1, [2]] tail"), Some(7));
        assert_eq!(find_balanced_end("{\"open\": 1"), None);
        assert_eq!(find_balanced_end("}"), None);
    }
}
