//! Parsers for vault markdown: frontmatter, code spans and image embeds.

pub mod code_block;
pub mod embed;
pub mod frontmatter;

pub use code_block::{find_code_ranges, is_in_code, strip_code, CodeRange};
pub use embed::{format_markdown_image, is_image, normalize_attachment_name, parse_image_embeds, Embed};
pub use frontmatter::{
    read_frontmatter, read_frontmatter_with_path, remove_all_frontmatter,
    serialize_frontmatter, split_frontmatter, FrontMatter,
};
