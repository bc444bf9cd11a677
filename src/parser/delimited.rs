//! Grammar for files separated by marker lines rather than code fences:
//!
//! ```text
//! --- FILE: main.py ---
//! print("hi")
//! --- END FILE ---
//! === util.py ===
//! X = 1
//! ```
//!
//! A file runs until the next opener, an `END` marker, a heading that is not
//! a file name, or the end of the response.

use std::sync::OnceLock;

use regex::Regex;

use super::names::looks_like_filename;
use super::{FileBlockGrammar, FileRecord};

/// Grammar for `--- FILE: name ---` style blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelimitedBlockGrammar;

fn opener_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:[-=*]{3,}|#{2,})\s*(?:begin\s+)?(?:file(?:name)?\s*:\s*)?(\S+)\s*(?:[-=*]{3,}|#{2,})?\s*$",
        )
        .expect("static regex")
    })
}

fn closer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*[-=#*]{3,}\s*end(?:\s+of)?(?:\s+file)?(?:\s*:\s*\S+)?\s*[-=#*]*\s*$")
            .expect("static regex")
    })
}

enum LineKind {
    Open(String),
    Close,
    Text,
}

fn classify(line: &str) -> LineKind {
    if closer_re().is_match(line) {
        return LineKind::Close;
    }
    if let Some(caps) = opener_re().captures(line) {
        let name = caps.get(1).map_or("", |m| {
            m.as_str()
                .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '*'))
                .trim_end_matches(['-', '=', '#', '*'])
        });
        if looks_like_filename(name) {
            return LineKind::Open(name.to_string());
        }
        if line.trim_start().starts_with('#') {
            return LineKind::Close;
        }
    }
    LineKind::Text
}

fn finish(name: String, lines: &[&str]) -> FileRecord {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    FileRecord::new(name, lines[start..end].join("\n"))
}

impl FileBlockGrammar for DelimitedBlockGrammar {
    fn name(&self) -> &'static str {
        "delimited"
    }

    fn extract(&self, response: &str) -> Vec<FileRecord> {
        let mut records = Vec::new();
        let mut current: Option<(String, Vec<&str>)> = None;

        for line in response.lines() {
            match classify(line) {
                LineKind::Open(name) => {
                    if let Some((prev, body)) = current.take() {
                        records.push(finish(prev, &body));
                    }
                    current = Some((name, Vec::new()));
                }
                LineKind::Close => {
                    if let Some((prev, body)) = current.take() {
                        records.push(finish(prev, &body));
                    }
                }
                LineKind::Text => {
                    if let Some((_, body)) = current.as_mut() {
                        body.push(line);
                    }
                }
            }
        }

        if let Some((prev, body)) = current {
            records.push(finish(prev, &body));
        }
        records
    }
}
