use std::sync::{Arc, LazyLock};

use htmd::HtmlToMarkdown;
use regex::Regex;
use scraper::Html;

use crate::dom;
use crate::error::AppError;

static IMAGE_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());

/// Deeper documents are refused; htmd converts recursively.
const MAX_NESTING: usize = 512;

/// Lines that are pure page chrome when they make up the whole line.
const BOILERPLATE_LINES: &[&str] = &[
    "skip to main content",
    "skip to content",
    "skip to navigation",
    "accept all cookies",
    "accept cookies",
    "reject all",
    "cookie settings",
    "manage cookies",
    "we use cookies",
    "back to jobs",
    "share this job",
];

/// HTML-to-text normalizer built on htmd.
///
/// Produces Markdown-flavoured text with non-content elements removed,
/// image references dropped and links reduced to their text.
pub struct HtmlNormalizer {
    converter: Arc<HtmlToMarkdown>,
}

impl Clone for HtmlNormalizer {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
        }
    }
}

impl HtmlNormalizer {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec![
                "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg",
                "form", "button", "select", "template",
            ])
            .build();

        Self {
            converter: Arc::new(converter),
        }
    }

    pub fn normalize(&self, markup: &str) -> Result<String, AppError> {
        let depth = dom::max_depth(&Html::parse_document(markup));
        if depth > MAX_NESTING {
            return Err(AppError::Normalize(format!("markup is nested {depth} levels deep")));
        }

        let markdown = self
            .converter
            .convert(markup)
            .map_err(|e| AppError::Normalize(e.to_string()))?;
        Ok(post_process(&markdown))
    }
}

impl Default for HtmlNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn post_process(markdown: &str) -> String {
    let without_images = IMAGE_REF.replace_all(markdown, "");
    let without_links = LINK.replace_all(&without_images, "$1");

    let kept: Vec<&str> = without_links
        .lines()
        .map(str::trim)
        .filter(|line| !is_boilerplate(line))
        .collect();

    dom::collapse_blank_lines(&kept.join("\n"))
}

fn is_boilerplate(line: &str) -> bool {
    let lowered = line
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    BOILERPLATE_LINES.contains(&lowered.as_str())
}
