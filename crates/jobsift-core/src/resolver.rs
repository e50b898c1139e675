//! Canonical URL resolution.
//!
//! Pure rewrites only; anything that needs the network (following a live
//! redirect) is left to the fetchers.

use url::Url;

use crate::platform::Platform;

/// Query parameters that never affect which posting is served.
const TRACKING_PARAMS: &[&str] = &["gclid", "fbclid", "mc_cid", "mc_eid", "_hsenc", "_hsmi"];

/// Parameters iCIMS appends when a posting is loaded inside its iframe embed.
const ICIMS_EMBED_PARAMS: &[&str] = &[
    "mobile",
    "width",
    "height",
    "bga",
    "needsredirect",
    "jan1offset",
    "jun1offset",
    "in_iframe",
    "hashed",
];

/// Rewrite `url` into its canonical form for `platform`.
///
/// Returns the input verbatim with `false` when no rule applies or the input
/// does not parse.
pub fn resolve(url: &str, platform: Platform) -> (String, bool) {
    let Ok(mut parsed) = Url::parse(url) else {
        return (url.to_string(), false);
    };

    if platform == Platform::Greenhouse
        && let Some(canonical) = greenhouse_embed(&parsed)
    {
        tracing::info!(from = url, to = %canonical, "Resolved Greenhouse embed URL");
        return (canonical, true);
    }

    let mut changed = strip_params(&mut parsed, |key| {
        key.starts_with("utm_")
            || TRACKING_PARAMS.contains(&key)
            || match platform {
                Platform::Greenhouse => key == "gh_src",
                Platform::Lever => key == "lever-source" || key == "lever-origin",
                Platform::Icims => ICIMS_EMBED_PARAMS.contains(&key),
                _ => false,
            }
    });

    changed |= match platform {
        Platform::Lever => drop_trailing_segment(&mut parsed, "apply"),
        Platform::Ashby => drop_trailing_segment(&mut parsed, "application"),
        Platform::Workday => truncate_at_segment(&mut parsed, "apply"),
        _ => false,
    };

    if changed {
        let canonical = parsed.to_string();
        tracing::info!(from = url, to = %canonical, %platform, "Resolved canonical URL");
        (canonical, true)
    } else {
        tracing::debug!(url, "URL already canonical");
        (url.to_string(), false)
    }
}

/// `…/embed/job_app?for=<board>&token=<id>` → `https://boards.greenhouse.io/<board>/jobs/<id>`.
fn greenhouse_embed(url: &Url) -> Option<String> {
    if !url.path().contains("/embed/job_app") {
        return None;
    }

    let mut board = None;
    let mut token = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "for" if !value.is_empty() => board = Some(value.into_owned()),
            "token" if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() => {
                token = Some(value.into_owned())
            }
            _ => {}
        }
    }

    Some(format!(
        "https://boards.greenhouse.io/{}/jobs/{}",
        board?, token?
    ))
}

/// Remove every query pair whose lower-cased key matches `drop`. Returns true if any were removed.
fn strip_params(url: &mut Url, drop: impl Fn(&str) -> bool) -> bool {
    if url.query().is_none() {
        return false;
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let kept: Vec<&(String, String)> = pairs
        .iter()
        .filter(|(k, _)| !drop(&k.to_ascii_lowercase()))
        .collect();

    if kept.len() == pairs.len() {
        return false;
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    true
}

fn segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn set_segments(url: &mut Url, segments: &[String]) {
    url.set_path(&format!("/{}", segments.join("/")));
}

fn drop_trailing_segment(url: &mut Url, segment: &str) -> bool {
    let mut segs = segments(url);
    // Keep at least the posting itself.
    if segs.len() > 1 && segs.last().is_some_and(|s| s.eq_ignore_ascii_case(segment)) {
        segs.pop();
        set_segments(url, &segs);
        return true;
    }
    false
}

fn truncate_at_segment(url: &mut Url, segment: &str) -> bool {
    let segs = segments(url);
    match segs.iter().position(|s| s.eq_ignore_ascii_case(segment)) {
        Some(pos) if pos > 0 => {
            set_segments(url, &segs[..pos]);
            true
        }
        _ => false,
    }
}
