//! Content gates: is this text a job description, and does this markup need a browser?

use scraper::Html;

use crate::dom;

/// Decides whether normalized text is worth returning.
pub trait ContentGate: Send + Sync {
    fn is_meaningful(&self, text: &str) -> bool;
}

/// Words that show up in almost every real job description.
const JOB_SIGNALS: &[&str] = &[
    "responsibilit",
    "requirement",
    "qualification",
    "experience",
    "skills",
    "role",
    "position",
    "salary",
    "benefits",
    "apply",
    "team",
    "job",
    "duties",
    "candidate",
    "you will",
];

/// Phrases from bot walls, consent screens and JavaScript-required shells.
const BLOCK_MARKERS: &[&str] = &[
    "access denied",
    "verify you are human",
    "are you a robot",
    "captcha",
    "checking your browser",
    "attention required",
    "request blocked",
    "enable javascript",
    "javascript is required",
    "javascript is disabled",
    "accept all cookies",
    "cookie preferences",
    "we use cookies",
];

/// Default gate for job-posting text.
#[derive(Debug, Clone)]
pub struct JobContentGate {
    pub min_chars: usize,
    pub min_words: usize,
    /// Texts at least this long are never rejected for containing block markers.
    pub marker_ceiling: usize,
}

impl JobContentGate {
    pub fn new(min_chars: usize) -> Self {
        Self {
            min_chars,
            ..Self::default()
        }
    }
}

impl Default for JobContentGate {
    fn default() -> Self {
        Self {
            min_chars: 200,
            min_words: 30,
            marker_ceiling: 1500,
        }
    }
}

impl ContentGate for JobContentGate {
    fn is_meaningful(&self, text: &str) -> bool {
        let chars = text.chars().count();
        if chars < self.min_chars {
            tracing::debug!(chars, min = self.min_chars, "Gate: too short");
            return false;
        }

        let words = text.split_whitespace().count();
        if words < self.min_words {
            tracing::debug!(words, min = self.min_words, "Gate: too few words");
            return false;
        }

        let lowered = text.to_lowercase();
        if !JOB_SIGNALS.iter().any(|s| lowered.contains(s)) {
            tracing::debug!("Gate: no job-description signal");
            return false;
        }

        if chars < self.marker_ceiling
            && let Some(marker) = BLOCK_MARKERS.iter().find(|m| lowered.contains(*m))
        {
            tracing::debug!(marker, "Gate: looks like a block or consent page");
            return false;
        }

        true
    }
}

/// Phrases that mean the served markup is a shell waiting for JavaScript.
const JS_REQUIRED: &[&str] = &[
    "please enable javascript",
    "javascript is required",
    "javascript must be enabled",
    "you need to enable javascript",
    "this site requires javascript",
    "enable javascript to view",
    "javascript is disabled",
];

/// Visible body text below this many characters marks an unrendered shell.
const SHELL_BODY_CHARS: usize = 100;

/// Heuristic: would a browser see more than this markup shows?
pub fn looks_js_gated(markup: &str) -> bool {
    if markup.trim().is_empty() {
        return true;
    }

    let lowered = markup.to_lowercase();
    if let Some(phrase) = JS_REQUIRED.iter().find(|p| lowered.contains(*p)) {
        tracing::debug!(phrase, "JavaScript-required notice found");
        return true;
    }

    let doc = Html::parse_document(markup);
    let visible = dom::body_text(&doc)
        .chars()
        .filter(|c| !c.is_whitespace())
        .count();
    if visible < SHELL_BODY_CHARS {
        tracing::debug!(visible, "Body text very short, likely needs JavaScript");
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = "We are looking for a backend engineer to join the payments team. \
        You will design and operate services that move money for millions of customers. \
        Requirements: five years of experience with distributed systems, strong Rust or Go skills, \
        and a habit of writing things down. Benefits include remote work and a learning budget.";

    #[test]
    fn test_real_description_passes() {
        assert!(JobContentGate::default().is_meaningful(DESCRIPTION));
    }

    #[test]
    fn test_short_text_fails() {
        let gate = JobContentGate::default();
        assert!(!gate.is_meaningful("Senior engineer, apply now."));
        assert!(!gate.is_meaningful(""));
    }

    #[test]
    fn test_needs_enough_words() {
        let long_words = "supercalifragilistic ".repeat(20) + "job";
        assert!(long_words.chars().count() >= 200);
        assert!(!JobContentGate::default().is_meaningful(&long_words));
    }

    #[test]
    fn test_needs_job_signal() {
        let prose = "The quick brown fox jumps over the lazy dog while the sun sets. ".repeat(6);
        assert!(!JobContentGate::default().is_meaningful(&prose));
    }

    #[test]
    fn test_block_page_rejected() {
        let wall = format!("Access denied. {DESCRIPTION}");
        assert!(!JobContentGate::default().is_meaningful(&wall));

        // Long postings can mention cookies without being a consent wall.
        let long = format!("{} We use cookies.", DESCRIPTION.repeat(5));
        assert!(JobContentGate::default().is_meaningful(&long));
    }

    #[test]
    fn test_custom_min_chars() {
        assert!(!JobContentGate::new(10_000).is_meaningful(DESCRIPTION));
    }

    #[test]
    fn test_js_gated_detection() {
        assert!(looks_js_gated(""));
        assert!(looks_js_gated("<html><body><div id=\"root\"></div></body></html>"));
        assert!(looks_js_gated(&format!(
            "<html><body><noscript>Please enable JavaScript</noscript><p>{DESCRIPTION}</p></body></html>"
        )));
        assert!(!looks_js_gated(&format!("<html><body><p>{DESCRIPTION}</p></body></html>")));
    }
}
