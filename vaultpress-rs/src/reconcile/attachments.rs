//! Attachment handling: copy referenced images next to the published document
//! and rewrite their references to plain markdown.

use super::apply::atomic_write;
use crate::error::{Result, SyncError};
use crate::freshness::{is_newer, FileStamp};
use crate::parser::{
    format_markdown_image, normalize_attachment_name, parse_image_embeds, read_frontmatter_with_path, FrontMatter,
};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Where attachments referenced by name are looked up, in order.
#[derive(Debug, Clone, Default)]
pub struct AttachmentResolver {
    search: Vec<PathBuf>,
}

/// `name` as a path that stays below the directory it is joined to.
fn contained(name: &str) -> Option<&Path> {
    let path = Path::new(name);
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .then_some(path)
}

/// The name an attachment is published under: its normalized file name.
/// `None` for references that climb out of their directory or are absolute.
fn published_name(name: &str) -> Option<String> {
    let file = contained(name)?.file_name()?.to_str()?;
    Some(normalize_attachment_name(file))
}

impl AttachmentResolver {
    pub fn new(store: Option<&Path>) -> Self {
        Self {
            search: store.map(Path::to_path_buf).into_iter().collect(),
        }
    }

    /// Search `dir` before anything already configured.
    pub fn with_first(mut self, dir: &Path) -> Self {
        self.search.insert(0, dir.to_path_buf());
        self
    }

    /// Locate `name`, trying the name as written, then its bare file name and
    /// that name normalized. Absolute names and names containing `..` never
    /// resolve.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let path = contained(name)?;
        let file = path.file_name()?.to_str()?;
        let normalized = normalize_attachment_name(file);
        self.search.iter().find_map(|dir| {
            [dir.join(path), dir.join(file), dir.join(&normalized)]
                .into_iter()
                .find(|p| p.is_file())
        })
    }
}

/// The outcome of rendering one document for publishing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub content: String,
    /// Normalized names of attachments present at the destination.
    pub copied: Vec<String>,
    /// Names that could not be found; their references are left as written.
    pub missing: Vec<String>,
    /// Source files that were published under a different name.
    pub renamed: Vec<PathBuf>,
}

impl Rendered {
    pub fn changed(&self, original: &str) -> bool {
        self.content != original
    }
}

/// Copy `src` to `dst` unless `dst` is already at least as new, then give
/// `dst` the source's modification time.
pub fn copy_if_newer(src: &Path, dst: &Path) -> Result<bool> {
    let src_stamp = FileStamp::of(src)?;
    if dst.is_file() {
        let dst_stamp = FileStamp::of(dst)?;
        if !is_newer(&src_stamp, &dst_stamp) {
            return Ok(false);
        }
    }
    std::fs::copy(src, dst).map_err(|e| SyncError::io(dst, e))?;
    src_stamp.apply_to(dst)?;
    Ok(true)
}

/// Tracks which attachments have been placed during one render.
struct Placer<'a> {
    resolver: &'a AttachmentResolver,
    dest_dir: &'a Path,
    /// Reference as written to its published name, or `None` if missing.
    seen: BTreeMap<String, Option<String>>,
    rendered: Rendered,
}

impl Placer<'_> {
    /// Make `name` available in the destination directory. Returns the
    /// published name, or `None` if the attachment does not exist.
    fn place(&mut self, name: &str) -> Result<Option<String>> {
        if let Some(known) = self.seen.get(name) {
            return Ok(known.clone());
        }
        let placed = self.locate_and_copy(name)?;
        self.seen.insert(name.to_string(), placed.clone());
        Ok(placed)
    }

    fn locate_and_copy(&mut self, name: &str) -> Result<Option<String>> {
        let (Some(published), Some(src)) = (published_name(name), self.resolver.resolve(name)) else {
            warn!(attachment = name, "attachment not found");
            self.rendered.missing.push(name.to_string());
            return Ok(None);
        };

        let dst = self.dest_dir.join(&published);
        if src != dst && copy_if_newer(&src, &dst)? {
            debug!(attachment = %published, "copied");
        }
        if src.file_name().is_some_and(|f| f != published.as_str()) {
            self.rendered.renamed.push(src);
        }
        if !self.rendered.copied.contains(&published) {
            self.rendered.copied.push(published.clone());
        }
        Ok(Some(published))
    }
}

/// Render `content` for publishing into `dest_dir`.
///
/// The first non-empty image field in the frontmatter and `![[image]]` embeds
/// outside code are resolved, copied under their normalized file names, and
/// rewritten. Everything else in the document is kept byte for byte.
pub fn render(
    content: &str,
    frontmatter: Option<&FrontMatter>,
    image_fields: &[String],
    resolver: &AttachmentResolver,
    dest_dir: &Path,
) -> Result<Rendered> {
    let mut placer = Placer {
        resolver,
        dest_dir,
        seen: BTreeMap::new(),
        rendered: Rendered::default(),
    };

    let mut featured = None;
    if let Some(fm) = frontmatter {
        let field = image_fields
            .iter()
            .find_map(|field| fm.get_str(field).map(|name| (field, name)));
        if let Some((field, name)) = field {
            if let Some(published) = placer.place(name)? {
                if published != name {
                    featured = Some((fm, field, published));
                }
            }
        }
    }

    let body_start = frontmatter.map(|fm| fm.span.end).unwrap_or(0);
    let body = &content[body_start..];

    let mut out = content[..body_start].to_string();
    let mut last = 0;
    for embed in parse_image_embeds(body) {
        if let Some(published) = placer.place(&embed.target)? {
            out.push_str(&body[last..embed.range.start]);
            out.push_str(&format_markdown_image(&published));
            last = embed.range.end;
        }
    }
    out.push_str(&body[last..]);

    if let Some((fm, field, published)) = featured {
        let mut mapping = fm.mapping.clone();
        mapping.insert(Value::from(field.as_str()), Value::from(published));
        out = fm.rewrite(&out, &mapping)?;
    }

    let mut rendered = placer.rendered;
    rendered.content = out;
    Ok(rendered)
}

/// The outcome of [`refresh_in_place`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refreshed {
    /// Whether the file's content was rewritten.
    pub rewritten: bool,
    pub rendered: Rendered,
}

/// Rewrite the image references of an already published markdown file in
/// place, resolving attachments from its own directory first.
///
/// The file keeps its modification time, so the next sync still sees it as
/// current.
pub fn refresh_in_place(markdown: &Path, image_fields: &[String], resolver: &AttachmentResolver) -> Result<Refreshed> {
    let dir = markdown
        .parent()
        .ok_or_else(|| SyncError::Other(format!("{} has no parent directory", markdown.display())))?;
    let content = std::fs::read_to_string(markdown).map_err(|e| SyncError::io(markdown, e))?;
    let stamp = FileStamp::of(markdown)?;

    let frontmatter = read_frontmatter_with_path(&content, markdown).unwrap_or_else(|e| {
        warn!(error = %e, "unusable frontmatter, treating as empty");
        None
    });

    let resolver = resolver.clone().with_first(dir);
    let rendered = render(&content, frontmatter.as_ref(), image_fields, &resolver, dir)?;
    let rewritten = rendered.changed(&content);
    if rewritten {
        atomic_write(markdown, rendered.content.as_bytes())?;
        stamp.apply_to(markdown)?;
        debug!(file = %markdown.display(), "image references rewritten");
    }
    Ok(Refreshed { rewritten, rendered })
}
