//! Obsidian image embed parsing and the markdown form they are rewritten to.

use crate::parser::code_block::{find_code_ranges, is_in_code};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

// ![[target]] with an optional #heading or |size/alias suffix.
// (group 1) target, up to the first `|`, `#` or `]`
static EMBED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\]\|#]+)(?:#[^\]\|]*)?(?:\|[^\]]*)?\]\]").unwrap());

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "avif"];

/// An `![[...]]` embed found in a document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    /// The embedded file name, trimmed.
    pub target: String,
    /// Byte range of the whole marker.
    pub range: Range<usize>,
}

/// Check if a file name looks like an image.
pub fn is_image(target: &str) -> bool {
    target
        .rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Parse every image embed outside code, in document order.
pub fn parse_image_embeds(content: &str) -> Vec<Embed> {
    let code = find_code_ranges(content);

    EMBED
        .captures_iter(content)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            if is_in_code(whole.start(), &code) {
                return None;
            }
            let target = cap.get(1)?.as_str().trim();
            is_image(target).then(|| Embed {
                target: target.to_string(),
                range: whole.range(),
            })
        })
        .collect()
}

/// Normalize an attachment file name for publishing: spaces become hyphens.
pub fn normalize_attachment_name(name: &str) -> String {
    name.replace(' ', "-")
}

/// Format a standard markdown image reference.
pub fn format_markdown_image(name: &str) -> String {
    format!("![{name}]({name})")
}
