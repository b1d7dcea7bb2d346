//! YAML frontmatter reading and span-preserving rewriting.

use crate::error::{Result, SyncError};
use serde_yaml::{Mapping, Value};
use std::ops::Range;
use std::path::Path;

const DELIMITER: &str = "---";

/// Frontmatter extraction result.
#[derive(Debug, Clone)]
pub struct FrontmatterSplit<'a> {
    /// The raw YAML string (without delimiters).
    pub yaml: Option<&'a str>,
    /// Byte range of the whole block, delimiters and trailing newline included.
    pub span: Option<Range<usize>>,
    /// The content after the frontmatter.
    pub content: &'a str,
}

/// Parsed frontmatter together with the exact text it occupied.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub mapping: Mapping,
    pub span: Range<usize>,
}

/// Iterate lines with their starting byte offset, keeping line terminators.
fn lines_with_offsets(content: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    content.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line)
    })
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Split content into frontmatter and body.
///
/// The block must start at offset 0 with a `---` line and be closed by another
/// `---` line. Trailing whitespace on delimiter lines is tolerated, and the
/// closing delimiter may be the last line of the file.
pub fn split_frontmatter(content: &str) -> FrontmatterSplit<'_> {
    let absent = FrontmatterSplit {
        yaml: None,
        span: None,
        content,
    };

    let mut lines = lines_with_offsets(content);

    match lines.next() {
        Some((_, first)) if is_delimiter(first) && first.ends_with('\n') => {
            let yaml_start = first.len();
            for (start, line) in lines {
                if is_delimiter(line) {
                    let end = start + line.len();
                    return FrontmatterSplit {
                        yaml: Some(content[yaml_start..start].trim_end_matches(['\n', '\r'])),
                        span: Some(0..end),
                        content: &content[end..],
                    };
                }
            }
            absent
        }
        _ => absent,
    }
}

/// Read frontmatter from a document.
///
/// Returns `Ok(None)` when the text has no frontmatter block, and an
/// `InvalidFrontmatter` error when the delimiters are present but the section
/// is not a YAML mapping.
pub fn read_frontmatter(content: &str) -> Result<Option<FrontMatter>> {
    read_frontmatter_with_path(content, Path::new("<unknown>"))
}

/// Read frontmatter with path context for error messages.
pub fn read_frontmatter_with_path(content: &str, path: &Path) -> Result<Option<FrontMatter>> {
    let split = split_frontmatter(content);
    let (Some(yaml), Some(span)) = (split.yaml, split.span) else {
        return Ok(None);
    };

    let invalid = |message: String| SyncError::InvalidFrontmatter {
        path: path.to_path_buf(),
        message,
    };

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| invalid(e.to_string()))?;
    let mapping = match value {
        Value::Mapping(map) => map,
        Value::Null => Mapping::new(),
        other => {
            return Err(invalid(format!(
                "expected a mapping, found {}",
                value_kind(&other)
            )));
        }
    };

    Ok(Some(FrontMatter { mapping, span }))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Serialize a mapping back to a frontmatter block (with delimiters).
pub fn serialize_frontmatter(mapping: &Mapping) -> Result<String> {
    if mapping.is_empty() {
        return Ok(format!("{DELIMITER}\n{DELIMITER}\n"));
    }
    let yaml = serde_yaml::to_string(mapping)?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n"))
}

impl FrontMatter {
    /// Look up a string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.mapping.get(key)
    }

    /// Look up a key and return it as a non-empty, trimmed string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The body of `content` that follows this block.
    pub fn body<'a>(&self, content: &'a str) -> &'a str {
        &content[self.span.end..]
    }

    /// Replace this block inside `content` with `mapping`, leaving every byte
    /// outside the recorded span untouched.
    pub fn rewrite(&self, content: &str, mapping: &Mapping) -> Result<String> {
        let block = serialize_frontmatter(mapping)?;
        let mut out = String::with_capacity(content.len() + block.len());
        out.push_str(&content[..self.span.start]);
        out.push_str(&block);
        out.push_str(&content[self.span.end..]);
        Ok(out)
    }
}

/// Remove frontmatter from content.
pub fn remove_all_frontmatter(content: &str) -> &str {
    split_frontmatter(content).content
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_no_frontmatter() {
        let content = "Just some content";
        let split = split_frontmatter(content);
        assert!(split.yaml.is_none());
        assert!(split.span.is_none());
        assert_eq!(split.content, "Just some content");
    }

    #[test]
    fn test_split_with_frontmatter() {
        let content = "---\ntitle: Test\ntags: [a, b]\n---\n\nContent here";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("title: Test\ntags: [a, b]"));
        assert_eq!(split.content, "\nContent here");
        assert_eq!(split.span, Some(0..33));
    }

    #[test]
    fn test_split_frontmatter_at_eof() {
        let content = "---\ntitle: Test\n---";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("title: Test"));
        assert_eq!(split.content, "");
    }

    #[test]
    fn test_split_trailing_whitespace_and_crlf() {
        let content = "---  \r\ntitle: Test\r\n---\r\nBody";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("title: Test"));
        assert_eq!(split.content, "Body");
    }

    #[test]
    fn test_must_start_at_offset_zero() {
        let content = "\n---\ntitle: Test\n---\nBody";
        assert!(split_frontmatter(content).yaml.is_none());
    }

    #[test]
    fn test_no_closing_delimiter() {
        let content = "---\ntitle: Test\n\nContent without closing";
        let split = split_frontmatter(content);
        assert!(split.yaml.is_none());
        assert_eq!(split.content, content);
    }

    #[test]
    fn test_triple_dash_in_content() {
        let content = "---\ntitle: Test\n---\n\n---\n\nThis has triple dashes in content";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("title: Test"));
        assert!(split.content.contains("---"));
    }

    #[test]
    fn test_empty_block_is_empty_mapping() {
        let fm = read_frontmatter("---\n---\nBody").unwrap().unwrap();
        assert!(fm.mapping.is_empty());
        assert_eq!(fm.span, 0..8);
    }

    #[test]
    fn test_read_frontmatter() {
        let content = "---\ntitle: My Note\ndraft: true\ntags:\n  - rust\n  - cli\n---\n\nContent";
        let fm = read_frontmatter(content).unwrap().unwrap();

        assert_eq!(fm.get_str("title"), Some("My Note"));
        assert_eq!(fm.get("draft"), Some(&Value::Bool(true)));
        assert_eq!(fm.get("tags").unwrap().as_sequence().unwrap().len(), 2);
        assert_eq!(fm.body(content), "\nContent");
    }

    #[test]
    fn test_read_unicode_values() {
        let content = "---\ntitle: \"Perché no? 日本\"\n---\nCorpo";
        let fm = read_frontmatter(content).unwrap().unwrap();
        assert_eq!(fm.get_str("title"), Some("Perché no? 日本"));
    }

    #[test]
    fn test_invalid_frontmatter() {
        let content = "---\ninvalid: yaml: syntax:\n---\nContent";
        let result = read_frontmatter_with_path(content, Path::new("Broken.md"));
        match result {
            Err(SyncError::InvalidFrontmatter { path, .. }) => {
                assert_eq!(path, Path::new("Broken.md"))
            }
            other => panic!("expected InvalidFrontmatter, got {:?}", other),
        }
    }

    #[test]
    fn test_non_mapping_is_invalid() {
        let content = "---\n- a\n- b\n---\nContent";
        assert!(read_frontmatter(content).is_err());
    }

    #[test]
    fn test_absent_frontmatter_is_none() {
        assert!(read_frontmatter("# Title\n\nBody").unwrap().is_none());
    }

    #[test]
    fn test_rewrite_preserves_body_bytes() {
        let content = "---\ntitle: Old\nimage: My Photo.png\n---\n\nBody  with\ttabs\n\n---\nend";
        let fm = read_frontmatter(content).unwrap().unwrap();

        let mut mapping = fm.mapping.clone();
        mapping.insert("image".into(), "My-Photo.png".into());
        let updated = fm.rewrite(content, &mapping).unwrap();

        let new_fm = read_frontmatter(&updated).unwrap().unwrap();
        assert_eq!(new_fm.get_str("image"), Some("My-Photo.png"));
        assert_eq!(new_fm.body(&updated), fm.body(content));
    }

    #[test]
    fn test_unmodified_round_trip_keeps_body() {
        let content = "---\ntitle: Test\ndraft: false\n---\nLine one\r\nLine two\n";
        let fm = read_frontmatter(content).unwrap().unwrap();
        let rewritten = fm.rewrite(content, &fm.mapping).unwrap();
        assert!(rewritten.ends_with(fm.body(content)));
        let again = read_frontmatter(&rewritten).unwrap().unwrap();
        assert_eq!(again.mapping, fm.mapping);
    }

    #[test]
    fn test_remove_all_frontmatter() {
        assert_eq!(remove_all_frontmatter("---\na: 1\n---\nBody"), "Body");
        assert_eq!(remove_all_frontmatter("Body"), "Body");
    }
}
