//! Readability-style main-content heuristic, the last tier before giving up.

use std::collections::HashMap;
use std::sync::LazyLock;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

use crate::dom::{self, CharCounts};

static CANDIDATES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, main, section, div, [role=main]").unwrap());

/// Upper bound on candidates scored per document.
const MAX_CANDIDATES: usize = 20_000;

/// Containers below this many text characters are not worth scoring.
const MIN_CANDIDATE_CHARS: usize = 20;

const BOILERPLATE_HINTS: &[&str] = &[
    "nav", "navbar", "menu", "sidebar", "footer", "header", "banner", "cookie", "consent",
    "ads", "advert", "promo", "subscribe", "newsletter", "related", "share", "social",
];

const CONTENT_HINTS: &[&str] = &["job", "description", "posting", "content"];

/// Pick the most content-like block of `markup` and return its text.
///
/// Falls back to the whole body when no candidate scores above zero, and
/// returns an empty string when the page has no visible text at all.
pub fn extract_fallback(markup: &str, url: &str) -> String {
    let doc = Html::parse_document(markup);
    let counts = dom::char_counts(&doc);

    let best = doc
        .select(&CANDIDATES)
        .take(MAX_CANDIDATES)
        .filter(|el| !is_boilerplate(el))
        .filter_map(|el| score(el, &counts).map(|s| (s, el)))
        .fold(None::<(i64, ElementRef<'_>)>, |best, (s, el)| match best {
            Some((top, _)) if top >= s => best,
            _ => Some((s, el)),
        });

    if let Some((score, el)) = best {
        tracing::debug!(url, score, tag = el.value().name(), "Fallback picked main content");
        return dom::block_text(el);
    }

    let body = dom::body_text(&doc);
    if body.is_empty() {
        tracing::warn!(url, "Fallback found no visible text");
    }
    body
}

fn score(el: ElementRef<'_>, counts: &HashMap<NodeId, CharCounts>) -> Option<i64> {
    let CharCounts { text, links } = counts.get(&el.id()).copied().unwrap_or_default();
    if text < MIN_CANDIDATE_CHARS {
        return None;
    }

    let mut score = text as i64 - 2 * links as i64;
    match el.value().name() {
        "article" => score += 500,
        "main" => score += 300,
        _ if el.value().attr("role") == Some("main") => score += 300,
        _ => {}
    }
    let hints = class_or_id(&el);
    if CONTENT_HINTS.iter().any(|h| hints.contains(h)) {
        score += 200;
    }
    if links > text / 2 {
        score -= 500;
    }

    (score > 0).then_some(score)
}

fn class_or_id(el: &ElementRef<'_>) -> String {
    let value = el.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.attr("id").unwrap_or_default()
    )
    .to_lowercase()
}

fn is_boilerplate(el: &ElementRef<'_>) -> bool {
    let hints = class_or_id(el);
    hints
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| BOILERPLATE_HINTS.contains(&token))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "We are hiring a platform engineer. You will own our build and deploy tooling, \
        mentor other engineers and keep the lights on. Experience with Linux and Rust is a plus.";

    #[test]
    fn test_prefers_article_over_navigation() {
        let html = format!(
            "<html><body>\
             <div class=\"top-menu\"><a href=\"/a\">Home</a><a href=\"/b\">Careers at Acme and more links</a></div>\
             <article><h1>Platform Engineer</h1><p>{BODY}</p></article>\
             <div class=\"site-footer\">Copyright Acme Corporation, all rights reserved worldwide.</div>\
             </body></html>"
        );
        let text = extract_fallback(&html, "https://acme.example/jobs/1");
        assert!(text.starts_with("Platform Engineer"));
        assert!(text.contains("mentor other engineers"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("Home"));
    }

    #[test]
    fn test_content_hint_wins_over_plain_div() {
        let html = format!(
            "<html><body>\
             <div><p>Short unrelated blurb about the company history here.</p></div>\
             <div class=\"job-description\"><p>{BODY}</p></div>\
             </body></html>"
        );
        let text = extract_fallback(&html, "https://acme.example/jobs/2");
        assert!(text.contains("platform engineer"));
    }

    #[test]
    fn test_link_heavy_blocks_lose() {
        let links: String = (0..30).map(|i| format!("<a href=\"/j/{i}\">Job listing number {i}</a>")).collect();
        let html = format!("<html><body><div>{links}</div><section><p>{BODY}</p></section></body></html>");
        let text = extract_fallback(&html, "https://acme.example/jobs");
        assert!(text.contains("platform engineer"));
        assert!(!text.contains("Job listing number"));
    }

    #[test]
    fn test_body_text_when_no_candidates() {
        let html = "<html><body><p>Just a paragraph.</p></body></html>";
        assert_eq!(extract_fallback(html, "https://x.example"), "Just a paragraph.");
    }

    #[test]
    fn test_deeply_nested_markup() {
        let depth = 10_000;
        let html = format!(
            "<html><body>{}<p>{BODY}</p>{}</body></html>",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );
        let text = extract_fallback(&html, "https://acme.example/jobs/3");
        assert!(text.contains("platform engineer"));
    }

    #[test]
    fn test_empty_when_nothing_salvageable() {
        assert_eq!(extract_fallback("<html><body><script>x()</script></body></html>", "u"), "");
        assert_eq!(extract_fallback("", "u"), "");
    }
}
