//! Code span detection, so embeds and prose inside code are left alone.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// A byte range covered by a fenced block or an inline code span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRange {
    pub range: Range<usize>,
    /// Fenced block (```` ``` ```` or `~~~`) rather than inline code.
    pub fenced: bool,
}

// Inline code: ``double`` spans may contain single backticks.
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"``(?:[^`]|`[^`])+``|`[^`\n]+`").unwrap());

/// Returns the fence marker (char and run length) opening a line, if any.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let first = line.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = line.chars().take_while(|&c| c == first).count();
    (run >= 3).then_some((first, run))
}

fn closes_fence(line: &str, marker: (char, usize)) -> bool {
    let trimmed = line.trim_end();
    trimmed.chars().all(|c| c == marker.0) && trimmed.chars().count() >= marker.1
}

/// Find fenced blocks and inline code spans, sorted by start offset.
///
/// An unclosed fence runs to the end of the content.
pub fn find_code_ranges(content: &str) -> Vec<CodeRange> {
    let mut ranges = Vec::new();
    let mut open: Option<(usize, (char, usize))> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        match open {
            None => {
                if let Some(marker) = fence_marker(line) {
                    open = Some((start, marker));
                }
            }
            Some((block_start, marker)) => {
                if closes_fence(line, marker) {
                    ranges.push(CodeRange {
                        range: block_start..offset,
                        fenced: true,
                    });
                    open = None;
                }
            }
        }
    }

    if let Some((block_start, _)) = open {
        ranges.push(CodeRange {
            range: block_start..content.len(),
            fenced: true,
        });
    }

    let fenced_count = ranges.len();
    for m in INLINE_CODE.find_iter(content) {
        let inside_fence = ranges[..fenced_count]
            .iter()
            .any(|r| r.range.start <= m.start() && m.start() < r.range.end);
        if !inside_fence {
            ranges.push(CodeRange {
                range: m.range(),
                fenced: false,
            });
        }
    }

    ranges.sort_by_key(|r| r.range.start);
    ranges
}

/// Check if a byte offset falls inside any code range.
pub fn is_in_code(offset: usize, ranges: &[CodeRange]) -> bool {
    ranges.iter().any(|r| r.range.contains(&offset))
}

/// Return `content` with every code range removed.
pub fn strip_code(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for r in find_code_ranges(content) {
        if r.range.start < cursor {
            continue;
        }
        out.push_str(&content[cursor..r.range.start]);
        cursor = r.range.end;
    }
    out.push_str(&content[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block() {
        let content = "Some text\n\n```rust\nlet x = ![[a.png]];\n```\n\nMore text";
        let ranges = find_code_ranges(content);
        assert_eq!(ranges.len(), 1);
        assert!(ranges[0].fenced);
        assert_eq!(&content[ranges[0].range.clone()], "```rust\nlet x = ![[a.png]];\n```\n");
    }

    #[test]
    fn test_tilde_fence_and_longer_close() {
        let content = "~~~\ninner\n~~~~\nafter";
        let ranges = find_code_ranges(content);
        assert_eq!(ranges.len(), 1);
        assert!(strip_code(content).ends_with("after"));
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let content = "text\n```\nnever closed";
        let ranges = find_code_ranges(content);
        assert_eq!(ranges[0].range, 5..content.len());
    }

    #[test]
    fn test_inline_code() {
        let content = "Some `inline ![[x.png]]` here and ``a `b` c``";
        let ranges = find_code_ranges(content);
        assert_eq!(ranges.len(), 2);
        assert!(ranges.iter().all(|r| !r.fenced));
    }

    #[test]
    fn test_is_in_code() {
        let content = "before `code` after";
        let ranges = find_code_ranges(content);
        assert!(!is_in_code(0, &ranges));
        assert!(is_in_code(8, &ranges));
        assert!(!is_in_code(14, &ranges));
    }

    #[test]
    fn test_strip_code() {
        let content = "Ciao `x` mondo\n```\ncode\n```\nfine";
        assert_eq!(strip_code(content), "Ciao  mondo\nfine");
    }
}
