//! Filename detection helpers shared by the grammars.
//!
//! Models announce file names in many ways: in the fence info string, on a
//! heading or bold line above the block, in a `File:` label, or in a comment
//! on the first line of the code. These helpers recognise those markers and
//! return the raw (still untrusted) name.

use std::sync::OnceLock;

use regex::Regex;

/// Extension-less names that are still clearly files.
const BARE_FILENAMES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    "Containerfile",
    "Procfile",
    "Gemfile",
    "Rakefile",
    "Jenkinsfile",
    "Vagrantfile",
    "Justfile",
    "LICENSE",
    "README",
    "CMakeLists.txt",
];

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Optional directories, a stem, and an extension starting with a letter
        // so that version numbers such as "3.10" are not mistaken for files.
        Regex::new(r"^(?:[\w.\-]+[/\\])*\.?[\w\-+]+(?:\.[\w\-+]+)*\.[A-Za-z][A-Za-z0-9_+\-]{0,11}$")
            .expect("static regex")
    })
}

fn dotfile_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[\w.\-]+[/\\])*\.[A-Za-z][\w\-]*$").expect("static regex")
    })
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|[\s*_#>\-(\[])(?:file\s*name|filename|file|path)\s*[:=\-][`*"'\s]*([^\s`*"']+)"#)
            .expect("static regex")
    })
}

fn info_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:title|file(?:name)?|path)\s*=\s*["']?([^"'\s}]+)"#)
            .expect("static regex")
    })
}

fn backtick_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`\s]+)`").expect("static regex"))
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:#|//|--|;|%|/\*|<!--|\{-)\s*(?:file\s*name|filename|file|path)\s*:\s*(\S+?)\s*(?:\*/|-->|-\})?\s*$",
        )
        .expect("static regex")
    })
}

/// Whether `token` is plausibly a file name or relative path.
pub fn looks_like_filename(token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() || token.len() > 255 || token.contains("://") {
        return false;
    }
    if filename_re().is_match(token) || dotfile_re().is_match(token) {
        return true;
    }
    let last = token.rsplit(['/', '\\']).next().unwrap_or(token);
    BARE_FILENAMES.contains(&last)
}

/// Strips trailing punctuation that commonly follows a name in prose.
fn trim_token(token: &str) -> &str {
    token
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '*' | '(' | ')' | '[' | ']'))
        .trim_end_matches([':', ',', ';'])
}

/// Extracts a file name from a fence info string such as `python app.py`,
/// `app.py`, `python:src/app.py` or `python title="app.py"`.
pub fn from_info_string(info: &str) -> Option<String> {
    let info = info.trim();
    if info.is_empty() {
        return None;
    }
    if let Some(caps) = info_attr_re().captures(info) {
        let name = trim_token(caps.get(1)?.as_str());
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    info.split(|c: char| c.is_whitespace() || c == ':' || c == '{' || c == '}')
        .map(trim_token)
        .find(|t| looks_like_filename(t))
        .map(str::to_string)
}

/// Extracts a file name from a marker line written above a block, e.g.
/// `### app.py`, `**app.py**`, `File: app.py`, `` `app.py`: `` or `=== app.py ===`.
pub fn from_marker_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.len() > 300 {
        return None;
    }

    if let Some(caps) = label_re().captures(trimmed) {
        let name = trim_token(caps.get(1)?.as_str());
        if looks_like_filename(name) {
            return Some(name.to_string());
        }
    }

    // Heading, list bullet, bold or decorative rule around a bare name.
    let is_decorated = trimmed.starts_with(['#', '*', '=', '-', '>']);
    let undecorated = trimmed
        .trim_start_matches(|c: char| matches!(c, '#' | '>' | '=' | '-' | '*' | ' ' | '\t'))
        .trim_end_matches(|c: char| matches!(c, '=' | '-' | '*' | ' ' | '\t' | ':'));
    let undecorated = undecorated
        .strip_prefix(|c: char| c.is_ascii_digit())
        .and_then(|rest| rest.strip_prefix(". "))
        .unwrap_or(undecorated);

    let whole = trim_token(undecorated);
    if looks_like_filename(whole) {
        return Some(whole.to_string());
    }

    if is_decorated {
        if let Some(first) = undecorated.split_whitespace().next().map(trim_token) {
            if looks_like_filename(first) {
                return Some(first.to_string());
            }
        }
    }

    // Prose such as "Create `src/main.py` with:"; only trusted when the line
    // introduces the block.
    if trimmed.ends_with(':') {
        return backtick_re()
            .captures_iter(trimmed)
            .filter_map(|c| c.get(1))
            .map(|m| trim_token(m.as_str()))
            .find(|t| looks_like_filename(t))
            .map(str::to_string);
    }

    None
}

/// Extracts a file name from a `# file: app.py` style comment.
pub fn from_first_line_comment(line: &str) -> Option<String> {
    comment_re()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| trim_token(m.as_str()))
        .filter(|t| looks_like_filename(t))
        .map(str::to_string)
}
