//! Platform classification.
//!
//! Maps a job-posting URL onto one of a closed set of ATS platforms. Each
//! platform has an ordered list of URL patterns; platforms are tried in a
//! fixed priority order because some patterns are substrings of others
//! (the SuccessFactors `.careers` suffix would otherwise shadow any
//! employer that hosts, say, a Greenhouse board on a `.careers` domain).

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

/// Applicant-tracking platform a job posting is hosted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Greenhouse,
    Lever,
    Workday,
    Apple,
    Icims,
    Ashby,
    SuccessFactors,
    Generic,
}

/// One acquisition tier, as declared in a platform's capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Embedded JSON-LD job posting.
    Structured,
    /// Normalized static HTML.
    Static,
    /// Headless-browser rendering.
    Rendered,
    /// Readability-style main content heuristic.
    Fallback,
}

/// Static facts about how a platform serves its job pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub requires_rendered_fetch: bool,
    pub has_structured_data: bool,
    pub acquisition_order: &'static [Tier],
}

impl Platform {
    /// All platforms, in classification priority order.
    pub const ALL: [Platform; 8] = [
        Platform::Greenhouse,
        Platform::Lever,
        Platform::Workday,
        Platform::Apple,
        Platform::Icims,
        Platform::Ashby,
        Platform::SuccessFactors,
        Platform::Generic,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Platform::Greenhouse => "greenhouse",
            Platform::Lever => "lever",
            Platform::Workday => "workday",
            Platform::Apple => "apple",
            Platform::Icims => "icims",
            Platform::Ashby => "ashby",
            Platform::SuccessFactors => "successfactors",
            Platform::Generic => "generic",
        }
    }

    /// Human-readable name, used as the payload's platform label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Greenhouse => "Greenhouse",
            Platform::Lever => "Lever",
            Platform::Workday => "Workday",
            Platform::Apple => "Apple Careers",
            Platform::Icims => "iCIMS",
            Platform::Ashby => "AshbyHQ",
            Platform::SuccessFactors => "SAP SuccessFactors",
            Platform::Generic => "Generic Job Site",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        use Tier::*;

        match self {
            Platform::Greenhouse | Platform::Lever => Capabilities {
                requires_rendered_fetch: false,
                has_structured_data: true,
                acquisition_order: &[Structured, Static, Fallback],
            },
            Platform::Workday | Platform::Apple | Platform::Icims => Capabilities {
                requires_rendered_fetch: true,
                has_structured_data: false,
                acquisition_order: &[Rendered, Fallback],
            },
            // Ashby renders client-side but still ships JSON-LD in the shell.
            Platform::Ashby => Capabilities {
                requires_rendered_fetch: true,
                has_structured_data: true,
                acquisition_order: &[Structured, Rendered, Fallback],
            },
            Platform::SuccessFactors => Capabilities {
                requires_rendered_fetch: false,
                has_structured_data: false,
                acquisition_order: &[Static, Fallback],
            },
            Platform::Generic => Capabilities {
                requires_rendered_fetch: false,
                has_structured_data: false,
                acquisition_order: &[Structured, Static, Fallback, Rendered],
            },
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single URL matcher.
struct Rule {
    pattern: Regex,
    /// Match against the URL as given instead of its lower-cased form.
    case_sensitive: bool,
}

fn rules(patterns: &[&str]) -> Vec<Rule> {
    patterns
        .iter()
        .map(|p| Rule {
            pattern: Regex::new(p).unwrap(),
            case_sensitive: false,
        })
        .collect()
}

static GREENHOUSE: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        r"boards\.greenhouse\.io",
        r"greenhouse\.io/embed",
        r"[?&]gh_jid=\d+",
        r"job_app\.greenhouse\.io",
    ])
});

static LEVER: LazyLock<Vec<Rule>> =
    LazyLock::new(|| rules(&[r"jobs\.lever\.co", r"lever\.co/[^/]+/[a-f0-9-]+"]));

static WORKDAY: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        r"myworkdayjobs\.com",
        r"\.workday\.com/.*?/job/",
        r"wd\d+\.myworkdaysite\.com",
    ])
});

static APPLE: LazyLock<Vec<Rule>> = LazyLock::new(|| rules(&[r"jobs\.apple\.com"]));

static ICIMS: LazyLock<Vec<Rule>> =
    LazyLock::new(|| rules(&[r"\.icims\.com", r"icims\.com/jobs/"]));

static ASHBY: LazyLock<Vec<Rule>> =
    LazyLock::new(|| rules(&[r"jobs\.ashbyhq\.com", r"ashbyhq\.com/[^/]+/[a-f0-9-]+"]));

static SUCCESSFACTORS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let mut rules = rules(&[
        r"\.careers(?:[/?#]|$)",
        r"successfactors\.com",
        r"performancemanager\d*\.successfactors\.com",
    ]);
    // e.g. /job/Brentwood-Data-Scientist-TN-37027/
    rules.push(Rule {
        pattern: Regex::new(r"/job/[^/]+-[A-Z]{2}-\d+/").unwrap(),
        case_sensitive: true,
    });
    rules
});

fn rules_for(platform: Platform) -> &'static [Rule] {
    match platform {
        Platform::Greenhouse => &GREENHOUSE,
        Platform::Lever => &LEVER,
        Platform::Workday => &WORKDAY,
        Platform::Apple => &APPLE,
        Platform::Icims => &ICIMS,
        Platform::Ashby => &ASHBY,
        Platform::SuccessFactors => &SUCCESSFACTORS,
        Platform::Generic => &[],
    }
}

fn matches(platform: Platform, url: &str, lowered: &str) -> bool {
    let hit = rules_for(platform).iter().find(|rule| {
        let haystack = if rule.case_sensitive { url } else { lowered };
        rule.pattern.is_match(haystack)
    });

    if let Some(rule) = hit {
        tracing::debug!(%platform, pattern = rule.pattern.as_str(), "platform pattern matched");
        return true;
    }

    platform == Platform::Greenhouse && has_gh_jid(url)
}

/// Greenhouse boards embedded on an employer's own site carry `gh_jid`.
fn has_gh_jid(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.query_pairs().any(|(k, _)| k == "gh_jid"))
        .unwrap_or(false)
}

/// Classify a URL. Never fails; unknown or malformed URLs are [`Platform::Generic`].
pub fn classify(url: &str) -> Platform {
    let url = url.trim();
    let lowered = url.to_lowercase();

    let platform = Platform::ALL
        .into_iter()
        .find(|p| matches(*p, url, &lowered))
        .unwrap_or(Platform::Generic);

    if platform == Platform::Generic {
        tracing::info!("No specific platform detected, using generic extraction");
    } else {
        tracing::info!(%platform, "Detected job platform");
    }
    platform
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_platforms() {
        let cases = [
            ("https://boards.greenhouse.io/acme/jobs/4012345", Platform::Greenhouse),
            ("https://job-boards.greenhouse.io/acme/jobs/4012345", Platform::Greenhouse),
            ("https://acme.com/careers/?gh_jid=4012345", Platform::Greenhouse),
            ("https://jobs.lever.co/acme/4c1b7f1e-aaaa-bbbb-cccc-1234567890ab", Platform::Lever),
            ("https://acme.wd5.myworkdayjobs.com/en-US/External/job/Remote/Engineer_R123", Platform::Workday),
            ("https://jobs.apple.com/en-us/details/200630587-3956/data-analyst?team=OPMFG", Platform::Apple),
            ("https://careers-attainfinance.icims.com/jobs/9403/database-engineer/job", Platform::Icims),
            ("https://jobs.ashbyhq.com/first-resonance/0492a694-d7f2-47a7-940c-9a8a2f8c7bf0", Platform::Ashby),
            ("https://www.tractorsupply.careers/job/Brentwood-Data-Scientist-TN-37027/1338676300/", Platform::SuccessFactors),
            ("https://career5.successfactors.com/career?company=acme", Platform::SuccessFactors),
            ("https://example.com/jobs/123", Platform::Generic),
        ];

        for (url, expected) in cases {
            assert_eq!(classify(url), expected, "{url}");
        }
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(classify("HTTPS://JOBS.LEVER.CO/Acme/abc-123"), Platform::Lever);
    }

    #[test]
    fn test_state_code_rule_needs_upper_case() {
        assert_eq!(
            classify("https://jobs.example.com/job/Austin-Analyst-TX-78701/55/"),
            Platform::SuccessFactors
        );
        assert_eq!(
            classify("https://jobs.example.com/job/austin-analyst-tx-78701/55/"),
            Platform::Generic
        );
    }

    #[test]
    fn test_specific_platform_beats_careers_suffix() {
        assert_eq!(
            classify("https://www.acme.careers/open-roles?gh_jid=998877"),
            Platform::Greenhouse
        );
        assert_eq!(
            classify("https://acme.careers/jobs.ashbyhq.com/acme/0492a694"),
            Platform::Ashby
        );
    }

    #[test]
    fn test_malformed_urls_are_generic() {
        assert_eq!(classify(""), Platform::Generic);
        assert_eq!(classify("not a url at all"), Platform::Generic);
        assert_eq!(classify("http://[::1"), Platform::Generic);
    }

    #[test]
    fn test_classification_is_deterministic() {
        for url in [
            "https://boards.greenhouse.io/acme/jobs/1",
            "https://acme.careers/job/Austin-Analyst-TX-78701/55/",
            "garbage",
        ] {
            assert_eq!(classify(url), classify(url));
        }
    }

    #[test]
    fn test_capability_table() {
        let ashby = Platform::Ashby.capabilities();
        assert!(ashby.requires_rendered_fetch);
        assert!(ashby.has_structured_data);

        let generic = Platform::Generic.capabilities();
        assert_eq!(
            generic.acquisition_order,
            &[Tier::Structured, Tier::Static, Tier::Fallback, Tier::Rendered]
        );

        for platform in Platform::ALL {
            let caps = platform.capabilities();
            assert!(!caps.acquisition_order.is_empty(), "{platform:?}");
            if caps.has_structured_data {
                assert_eq!(caps.acquisition_order[0], Tier::Structured, "{platform:?}");
            }
            assert_eq!(
                caps.requires_rendered_fetch,
                caps.acquisition_order.contains(&Tier::Rendered) && platform != Platform::Generic,
                "{platform:?}"
            );
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(Platform::Icims.display_name(), "iCIMS");
        assert_eq!(Platform::SuccessFactors.slug(), "successfactors");
        assert_eq!(
            serde_json::to_string(&Platform::SuccessFactors).unwrap(),
            "\"successfactors\""
        );
    }
}
