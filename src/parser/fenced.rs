//! Markdown code fence grammar.
//!
//! A block opens with at least three backticks or tildes and closes with a
//! line holding only the same character, repeated at least as many times.
//! An unclosed block runs to the end of the response.
//!
//! The file name is taken from, in order: the info string, the nearest of the
//! two non-empty lines above the fence (never reaching into the previous
//! block), and a `# file: name` comment on the first line of the body.
//! Blocks without a name get a fallback name, even when they are blank.

use super::names::{from_first_line_comment, from_info_string, from_marker_line};
use super::{FallbackNames, FileBlockGrammar, FileRecord};

/// Marker lines considered above a fence.
const MARKER_LOOKBACK: usize = 2;

/// Grammar for Markdown fenced code blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct FencedBlockGrammar;

struct Fence<'a> {
    marker: char,
    len: usize,
    info: &'a str,
}

fn open_fence(line: &str) -> Option<Fence<'_>> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(Fence { marker, len, info })
}

fn closes(line: &str, fence: &Fence<'_>) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() >= fence.len && trimmed.chars().all(|c| c == fence.marker)
}

/// One fenced block as found in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FencedBlock {
    /// Info string after the opening fence, e.g. `json` or `python app.py`.
    pub info: String,
    /// File name, if the block carries one.
    pub name: Option<String>,
    pub content: String,
}

impl FencedBlock {
    /// Language tag: the first word of the info string, lowercased.
    pub fn language(&self) -> String {
        self.info
            .split(|c: char| c.is_whitespace() || c == ':' || c == '{')
            .next()
            .unwrap_or("")
            .to_lowercase()
    }
}

/// Splits `response` into fenced blocks, in order of appearance.
pub(crate) fn scan_blocks(response: &str) -> Vec<FencedBlock> {
    let lines: Vec<&str> = response.lines().map(|l| l.trim_end_matches('\r')).collect();
    let mut blocks = Vec::new();
    let mut region_start = 0;
    let mut i = 0;

    while i < lines.len() {
        let Some(fence) = open_fence(lines[i]) else {
            i += 1;
            continue;
        };

        let body_start = i + 1;
        let mut end = body_start;
        while end < lines.len() && !closes(lines[end], &fence) {
            end += 1;
        }
        let body = &lines[body_start..end];

        let name = from_info_string(fence.info)
            .or_else(|| marker_above(&lines[region_start..i]))
            .or_else(|| {
                body.iter()
                    .find(|l| !l.trim().is_empty())
                    .and_then(|l| from_first_line_comment(l))
            });

        blocks.push(FencedBlock {
            info: fence.info.to_string(),
            name,
            content: body.join("\n"),
        });

        i = end + 1;
        region_start = i;
    }

    blocks
}

impl FileBlockGrammar for FencedBlockGrammar {
    fn name(&self) -> &'static str {
        "fenced"
    }

    fn extract(&self, response: &str) -> Vec<FileRecord> {
        let mut fallback = FallbackNames::default();
        scan_blocks(response)
            .into_iter()
            .map(|block| {
                let name = block.name.unwrap_or_else(|| fallback.next_name());
                FileRecord::new(name, block.content)
            })
            .collect()
    }
}

/// Looks for a file name on the last non-empty lines of `prose`.
fn marker_above(prose: &[&str]) -> Option<String> {
    prose
        .iter()
        .rev()
        .filter(|l| !l.trim().is_empty())
        .take(MARKER_LOOKBACK)
        .find_map(|l| from_marker_line(l))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<FileRecord> {
        FencedBlockGrammar.extract(text)
    }

    #[test]
    fn test_name_from_info_string() {
        let text = "```python app.py\nprint('hi')\n```";
        assert_eq!(extract(text), vec![FileRecord::new("app.py", "print('hi')")]);
    }

    #[test]
    fn test_name_from_heading_and_label() {
        let text = "\
Here is the solution.

### reverse.py
Implementation:
```python
def reverse(s): return s[::-1]
```

File: test_reverse.py
```python
from reverse import reverse
```";
        assert_eq!(
            extract(text),
            vec![
                FileRecord::new("reverse.py", "def reverse(s): return s[::-1]"),
                FileRecord::new("test_reverse.py", "from reverse import reverse"),
            ]
        );
    }

    #[test]
    fn test_name_from_first_line_comment() {
        let text = "```js\n// file: src/index.js\nexport default 1;\n```";
        assert_eq!(
            extract(text),
            vec![FileRecord::new(
                "src/index.js",
                "// file: src/index.js\nexport default 1;"
            )]
        );
    }

    #[test]
    fn test_unnamed_blocks_get_fallback_names() {
        let text = "```\none\n```\ntext\n```\ntwo\n```";
        assert_eq!(
            extract(text),
            vec![
                FileRecord::new("unknown.txt", "one"),
                FileRecord::new("unknown_2.txt", "two"),
            ]
        );
    }

    #[test]
    fn test_blank_unnamed_block_is_kept() {
        assert_eq!(extract("```\n\n```"), vec![FileRecord::new("unknown.txt", "")]);

        let text = "```\n\n```\n### a.py\n```\n```";
        assert_eq!(
            extract(text),
            vec![
                FileRecord::new("unknown.txt", ""),
                FileRecord::new("a.py", ""),
            ]
        );
    }

    #[test]
    fn test_scan_blocks_reports_language_and_name() {
        let blocks = scan_blocks("### data.json\n```json\n[]\n```\n```JSON\n{}\n```");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name.as_deref(), Some("data.json"));
        assert_eq!(blocks[0].language(), "json");
        assert_eq!(blocks[1].name, None);
        assert_eq!(blocks[1].language(), "json");
        assert_eq!(blocks[1].content, "{}");
    }

    #[test]
    fn test_marker_does_not_leak_into_next_block() {
        let text = "### a.py\n```\nA\n```\n```\nB\n```";
        assert_eq!(
            extract(text),
            vec![
                FileRecord::new("a.py", "A"),
                FileRecord::new("unknown.txt", "B"),
            ]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let text = "### main.go\n```go\npackage main\n\nfunc main() {}";
        assert_eq!(
            extract(text),
            vec![FileRecord::new("main.go", "package main\n\nfunc main() {}")]
        );
    }

    #[test]
    fn test_longer_fence_keeps_inner_fences() {
        let text = "### README.md\n````markdown\n# Title\n```\ncode\n```\n````";
        assert_eq!(
            extract(text),
            vec![FileRecord::new("README.md", "# Title\n```\ncode\n```")]
        );
    }

    #[test]
    fn test_tilde_fence() {
        let text = "~~~toml Cargo.toml\n[package]\n~~~";
        assert_eq!(extract(text), vec![FileRecord::new("Cargo.toml", "[package]")]);
    }

    #[test]
    fn test_no_fences() {
        assert!(extract("just prose\nwith ``inline`` code").is_empty());
    }
}
