//! Destination classification: which bucket, if any, a document belongs in.
//!
//! Classification is a pure function of the frontmatter and body. Drafts are
//! excluded; everything else lands in exactly one bucket, either the single
//! configured bucket or the one matching the declared or detected language.

use crate::error::{Result, SyncError};
use crate::parser::{self, FrontMatter};
use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

/// Minimum amount of prose, in characters, worth running detection on.
pub const DEFAULT_MIN_DETECT_CHARS: usize = 50;

/// The outcome of classifying one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "bucket", rename_all = "lowercase")]
pub enum Verdict {
    Include(String),
    Excluded,
}

/// Maps a document to a verdict.
pub trait Classifier {
    /// `frontmatter` is `None` when the document has none, or when it failed
    /// to parse and is being treated as empty.
    fn classify(&self, frontmatter: Option<&FrontMatter>, content: &str) -> Verdict;
}

/// Detects the language of a piece of prose.
pub trait LanguageDetector {
    /// Returns a language code such as `it` or `en`.
    fn detect(&self, text: &str) -> Result<String>;
}

/// Language detection backed by `whatlang`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<String> {
        use whatlang::Lang;

        let info = whatlang::detect(text).ok_or_else(|| {
            SyncError::ClassificationAmbiguity("no language could be detected".to_string())
        })?;

        let code = match info.lang() {
            Lang::Ita => "it",
            Lang::Eng => "en",
            Lang::Fra => "fr",
            Lang::Deu => "de",
            Lang::Spa => "es",
            Lang::Por => "pt",
            Lang::Nld => "nl",
            other => other.code(),
        };
        Ok(code.to_string())
    }
}

/// YAML truthiness for flags like `draft`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "on" | "1"
        ),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

/// True when the frontmatter marks the document as a draft.
pub fn is_draft(frontmatter: Option<&FrontMatter>) -> bool {
    frontmatter
        .and_then(|fm| fm.get("draft"))
        .map(is_truthy)
        .unwrap_or(false)
}

/// The declared language (`language`, then `lang`), lower-cased.
pub fn declared_language(frontmatter: Option<&FrontMatter>) -> Option<String> {
    let fm = frontmatter?;
    fm.get_str("language")
        .or_else(|| fm.get_str("lang"))
        .map(str::to_lowercase)
}

// Markdown images and links, and wiki embeds/links.
static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").unwrap());
static WIKI_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!?\[\[[^\]]*\]\]").unwrap());

/// Strip frontmatter, code, images and links, leaving the prose to detect on.
pub fn detectable_text(content: &str) -> String {
    let body = parser::remove_all_frontmatter(content);
    let text = parser::strip_code(body);
    let text = MARKDOWN_IMAGE.replace_all(&text, "");
    let text = MARKDOWN_LINK.replace_all(&text, "");
    let text = WIKI_LINK.replace_all(&text, "");
    text.trim().to_string()
}

/// Everything goes into one bucket.
#[derive(Debug, Clone)]
pub struct SingleBucket(pub String);

impl Classifier for SingleBucket {
    fn classify(&self, _frontmatter: Option<&FrontMatter>, _content: &str) -> Verdict {
        Verdict::Include(self.0.clone())
    }
}

/// Buckets chosen by language.
pub struct LanguageClassifier<D> {
    /// Language code to bucket name.
    languages: BTreeMap<String, String>,
    default_bucket: String,
    min_detect_chars: usize,
    detector: D,
}

impl<D: LanguageDetector> LanguageClassifier<D> {
    pub fn new(
        languages: BTreeMap<String, String>,
        default_bucket: impl Into<String>,
        detector: D,
    ) -> Self {
        Self {
            languages: languages
                .into_iter()
                .map(|(code, bucket)| (code.to_lowercase(), bucket))
                .collect(),
            default_bucket: default_bucket.into(),
            min_detect_chars: DEFAULT_MIN_DETECT_CHARS,
            detector,
        }
    }

    pub fn with_min_detect_chars(mut self, min: usize) -> Self {
        self.min_detect_chars = min;
        self
    }

    /// Map a language code onto a bucket, collapsing unknown codes to the default.
    fn bucket_for(&self, code: &str) -> String {
        match self.languages.get(code) {
            Some(bucket) => bucket.clone(),
            None => {
                debug!(language = code, bucket = %self.default_bucket, "unrecognized language, using default bucket");
                self.default_bucket.clone()
            }
        }
    }

    /// Resolve the language for a body with no declared language.
    fn detect(&self, content: &str) -> Option<String> {
        let text = detectable_text(content);
        if text.chars().count() < self.min_detect_chars {
            debug!("too little prose to detect a language");
            return None;
        }
        match self.detector.detect(&text) {
            Ok(code) => Some(code.to_lowercase()),
            Err(e) => {
                debug!(error = %e, "language detection failed");
                None
            }
        }
    }
}

impl<D: LanguageDetector> Classifier for LanguageClassifier<D> {
    fn classify(&self, frontmatter: Option<&FrontMatter>, content: &str) -> Verdict {
        let language = declared_language(frontmatter).or_else(|| self.detect(content));
        match language {
            Some(code) => Verdict::Include(self.bucket_for(&code)),
            None => Verdict::Include(self.default_bucket.clone()),
        }
    }
}

/// Excludes drafts, delegating everything else to `inner`.
pub struct DraftFilter<C> {
    inner: C,
}

impl<C> DraftFilter<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: Classifier> Classifier for DraftFilter<C> {
    fn classify(&self, frontmatter: Option<&FrontMatter>, content: &str) -> Verdict {
        if is_draft(frontmatter) {
            Verdict::Excluded
        } else {
            self.inner.classify(frontmatter, content)
        }
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&self, frontmatter: Option<&FrontMatter>, content: &str) -> Verdict {
        (**self).classify(frontmatter, content)
    }
}
