//! Extraction of files from free-text model responses.
//!
//! Models are asked to format their answer as named source files, but they
//! rarely agree on how. A [`ResponseParser`] tries a list of
//! [`FileBlockGrammar`]s in order and keeps the records produced by the first
//! grammar that finds anything:
//!
//! 1. [`JsonManifestGrammar`]: a JSON document listing files, when it is the
//!    whole answer rather than one of several files.
//! 2. [`FencedBlockGrammar`]: Markdown code fences, named by the info string,
//!    a heading or label above the fence, or a first-line comment.
//! 3. [`DelimitedBlockGrammar`]: `--- FILE: name ---` style markers.
//!
//! File names returned here are raw; callers must sanitize them before using
//! them as paths.

mod delimited;
mod fenced;
mod json;
pub mod names;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use delimited::DelimitedBlockGrammar;
pub use fenced::FencedBlockGrammar;
pub use json::JsonManifestGrammar;

/// Name given to blocks that carry no recognisable file name.
pub const FALLBACK_FILENAME: &str = "unknown.txt";

/// A single file recovered from a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unsanitized name as written by the model.
    pub filename: String,
    pub content: String,
}

impl FileRecord {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// A syntax for file blocks inside a response.
pub trait FileBlockGrammar: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Extracts every file block this grammar recognises, in order of
    /// appearance. Returns an empty vector when the grammar does not apply.
    fn extract(&self, response: &str) -> Vec<FileRecord>;
}

/// Hands out `unknown.txt`, `unknown_2.txt`, ... for unnamed blocks.
#[derive(Debug, Default)]
pub(crate) struct FallbackNames {
    issued: usize,
}

impl FallbackNames {
    pub(crate) fn next_name(&mut self) -> String {
        self.issued += 1;
        if self.issued == 1 {
            FALLBACK_FILENAME.to_string()
        } else {
            format!("unknown_{}.txt", self.issued)
        }
    }
}

/// Ordered list of grammars applied to each response.
pub struct ResponseParser {
    grammars: Vec<Box<dyn FileBlockGrammar>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self {
            grammars: vec![
                Box::new(JsonManifestGrammar),
                Box::new(FencedBlockGrammar),
                Box::new(DelimitedBlockGrammar),
            ],
        }
    }
}

impl std::fmt::Debug for ResponseParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.grammars.iter().map(|g| g.name()).collect();
        f.debug_struct("ResponseParser")
            .field("grammars", &names)
            .finish()
    }
}

impl ResponseParser {
    /// Creates a parser with the default grammar order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with a custom grammar order.
    pub fn with_grammars(grammars: Vec<Box<dyn FileBlockGrammar>>) -> Self {
        Self { grammars }
    }

    /// Extracts file records from `response`.
    ///
    /// An empty or whitespace-only response yields no records. Line endings
    /// are normalised to `\n` before any grammar runs.
    pub fn parse(&self, response: &str) -> Vec<FileRecord> {
        if response.trim().is_empty() {
            return Vec::new();
        }
        let normalized = response.replace("\r\n", "\n");

        for grammar in &self.grammars {
            let records = grammar.extract(&normalized);
            if !records.is_empty() {
                debug!(
                    grammar = grammar.name(),
                    files = records.len(),
                    "Extracted files from response"
                );
                return records;
            }
        }

        debug!("No file blocks found in response");
        Vec::new()
    }
}

/// Parses `response` with the default grammars.
pub fn parse_files(response: &str) -> Vec<FileRecord> {
    ResponseParser::default().parse(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_then_fence() {
        let response = "### reverse.py\n```python\ndef reverse(s): return s[::-1]\n```";
        assert_eq!(
            parse_files(response),
            vec![FileRecord::new("reverse.py", "def reverse(s): return s[::-1]")]
        );
    }

    #[test]
    fn test_empty_response() {
        assert!(parse_files("").is_empty());
        assert!(parse_files("   \n\t").is_empty());
    }

    #[test]
    fn test_prose_only_response() {
        assert!(parse_files("I cannot help with that request.").is_empty());
    }

    #[test]
    fn test_crlf_is_normalised() {
        let response = "### a.py\r\n```python\r\nx = 1\r\ny = 2\r\n```\r\n";
        assert_eq!(parse_files(response), vec![FileRecord::new("a.py", "x = 1\ny = 2")]);
    }

    #[test]
    fn test_json_takes_precedence_over_fences() {
        let response = "```json\n{\"files\": [{\"filename\": \"m.py\", \"code\": \"pass\"}]}\n```";
        assert_eq!(parse_files(response), vec![FileRecord::new("m.py", "pass")]);
    }

    #[test]
    fn test_named_json_data_file_next_to_code() {
        let response = "\
### app.py
```python
import json
print(json.load(open('posts.json')))
```

### posts.json
```json
[{\"title\": \"Hello\", \"content\": \"First post\"}, {\"title\": \"Bye\", \"content\": \"Second\"}]
```";
        assert_eq!(
            parse_files(response),
            vec![
                FileRecord::new("app.py", "import json\nprint(json.load(open('posts.json')))"),
                FileRecord::new(
                    "posts.json",
                    "[{\"title\": \"Hello\", \"content\": \"First post\"}, {\"title\": \"Bye\", \"content\": \"Second\"}]"
                ),
            ]
        );
    }

    #[test]
    fn test_blank_unnamed_block_gets_fallback_name() {
        assert_eq!(parse_files("```\n\n```"), vec![FileRecord::new("unknown.txt", "")]);
    }

    #[test]
    fn test_delimited_markers_used_when_no_fences() {
        let response = "--- FILE: main.rs ---\nfn main() {}\n--- END ---\n";
        assert_eq!(parse_files(response), vec![FileRecord::new("main.rs", "fn main() {}")]);
    }

    #[test]
    fn test_fallback_names_sequence() {
        let mut names = FallbackNames::default();
        assert_eq!(names.next_name(), "unknown.txt");
        assert_eq!(names.next_name(), "unknown_2.txt");
        assert_eq!(names.next_name(), "unknown_3.txt");
    }

    struct Fixed;

    impl FileBlockGrammar for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn extract(&self, _response: &str) -> Vec<FileRecord> {
            vec![FileRecord::new("fixed.txt", "x")]
        }
    }

    #[test]
    fn test_custom_grammar_order() {
        let parser = ResponseParser::with_grammars(vec![Box::new(Fixed)]);
        assert_eq!(parser.parse("anything"), vec![FileRecord::new("fixed.txt", "x")]);
        assert!(format!("{parser:?}").contains("fixed"));
    }
}
