//! Structured-data tier: embedded JSON-LD `JobPosting` records.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::{Map, Value};

use crate::dom;
use crate::error::AppError;
use crate::models::StructuredJobRecord;

static SCRIPTS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script[type]").unwrap());

/// Find the first JSON-LD `JobPosting` in `markup`.
///
/// Blocks that fail to parse are skipped; the next block still gets a chance.
pub fn extract_structured(markup: &str) -> Option<StructuredJobRecord> {
    let doc = Html::parse_document(markup);

    for script in doc.select(&SCRIPTS) {
        let is_ld_json = script
            .value()
            .attr("type")
            .is_some_and(|t| t.to_ascii_lowercase().contains("ld+json"));
        if !is_ld_json {
            continue;
        }

        let raw: String = script.text().collect();
        match parse_block(&raw) {
            Ok(Some(record)) => {
                tracing::info!(
                    title = record.title.as_deref().unwrap_or("-"),
                    "Found JSON-LD JobPosting"
                );
                return Some(record);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "Ignoring JSON-LD block"),
        }
    }

    None
}

/// Parse one JSON-LD block. `Ok(None)` means valid JSON without a job posting.
pub fn parse_block(raw: &str) -> Result<Option<StructuredJobRecord>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::MalformedStructuredData(e.to_string()))?;

    Ok(find_job_posting(&value).map(record_from))
}

fn find_job_posting(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().find_map(find_job_posting),
        Value::Object(node) if is_job_posting(node) => Some(node),
        Value::Object(node) => node.get("@graph").and_then(find_job_posting),
        _ => None,
    }
}

fn is_job_posting(node: &Map<String, Value>) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t.contains("JobPosting"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.contains("JobPosting")),
        _ => false,
    }
}

fn record_from(node: &Map<String, Value>) -> StructuredJobRecord {
    let title = text_field(node.get("title")).or_else(|| text_field(node.get("name")));

    let company = match node.get("hiringOrganization") {
        Some(Value::Object(org)) => text_field(org.get("name")),
        other => text_field(other),
    };

    let description = node
        .get("description")
        .and_then(Value::as_str)
        .map(markup_to_text)
        .filter(|d| !d.is_empty());

    StructuredJobRecord {
        title,
        company,
        description,
        skills: skills(node.get("skills")),
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    let raw = value?.as_str()?;
    let text = dom::collapse_ws(&decode_entities(raw));
    (!text.is_empty()).then_some(text)
}

fn skills(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::String(s)) => s.split([',', ';', '\n']).map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    items
        .iter()
        .map(|s| dom::collapse_ws(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Text content of an HTML fragment, which also decodes character references.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') && !raw.contains('<') {
        return raw.to_string();
    }
    Html::parse_fragment(raw).root_element().text().collect()
}

/// Descriptions are often HTML, sometimes entity-escaped HTML (`&lt;p&gt;`).
fn markup_to_text(raw: &str) -> String {
    let mut html = raw.trim().to_string();
    if html.contains("&lt;") {
        html = decode_entities(&html);
    }

    if html.contains('<') {
        match htmd::convert(&html) {
            Ok(markdown) => return dom::collapse_blank_lines(&markdown),
            Err(e) => tracing::debug!(error = %e, "Description conversion failed, using text"),
        }
        let fragment = Html::parse_fragment(&html);
        return dom::block_text(fragment.root_element());
    }

    dom::collapse_blank_lines(&decode_entities(&html))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ld: &str) -> String {
        format!(
            "<html><head><script type=\"application/ld+json\">{ld}</script></head><body><p>shell</p></body></html>"
        )
    }

    #[test]
    fn test_plain_object() {
        let html = page(
            r#"{"@context":"https://schema.org","@type":"JobPosting","title":"Data Engineer",
                "hiringOrganization":{"@type":"Organization","name":"Acme &amp; Co"},
                "description":"<p>Build pipelines.</p><ul><li>Own ingestion</li></ul>",
                "skills":"Rust, SQL; Kafka"}"#,
        );
        let record = extract_structured(&html).unwrap();
        assert_eq!(record.title.as_deref(), Some("Data Engineer"));
        assert_eq!(record.company.as_deref(), Some("Acme & Co"));
        let description = record.description.unwrap();
        assert!(description.contains("Build pipelines."));
        assert!(description.contains("Own ingestion"));
        assert!(!description.contains("<p>"));
        assert_eq!(record.skills, vec!["Rust", "SQL", "Kafka"]);
    }

    #[test]
    fn test_graph_and_type_array() {
        let html = page(
            r#"{"@graph":[{"@type":"Organization","name":"Acme"},
                {"@type":["Thing","JobPosting"],"name":"Analyst","hiringOrganization":"Acme",
                 "description":"Crunch numbers","skills":[{"name":"Excel"},"SQL",3]}]}"#,
        );
        let record = extract_structured(&html).unwrap();
        assert_eq!(record.title.as_deref(), Some("Analyst"));
        assert_eq!(record.company.as_deref(), Some("Acme"));
        assert_eq!(record.description.as_deref(), Some("Crunch numbers"));
        assert_eq!(record.skills, vec!["Excel", "SQL"]);
    }

    #[test]
    fn test_top_level_array() {
        let html = page(r#"[{"@type":"WebSite"},{"@type":"JobPosting","title":"SRE"}]"#);
        assert_eq!(extract_structured(&html).unwrap().title.as_deref(), Some("SRE"));
    }

    #[test]
    fn test_entity_escaped_description() {
        let html = page(
            r#"{"@type":"JobPosting","title":"QA","description":"&lt;p&gt;Test &lt;strong&gt;everything&lt;/strong&gt;&lt;/p&gt;"}"#,
        );
        let description = extract_structured(&html).unwrap().description.unwrap();
        assert!(description.contains("everything"));
        assert!(!description.contains("&lt;"));
        assert!(!description.contains("<p>"));
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let html = "<html><head>\
            <script type=\"application/ld+json\">{\"@type\": \"JobPosting\", oops}</script>\
            <script type=\"application/ld+json\">{\"@type\":\"JobPosting\",\"title\":\"Second\"}</script>\
            </head><body></body></html>";
        assert_eq!(extract_structured(html).unwrap().title.as_deref(), Some("Second"));
    }

    #[test]
    fn test_parse_block_reports_malformed() {
        let err = parse_block("{not json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedStructuredData);
        assert_eq!(parse_block("   ").unwrap(), None);
    }

    #[test]
    fn test_no_job_posting() {
        assert!(extract_structured(&page(r#"{"@type":"Organization","name":"Acme"}"#)).is_none());
        assert!(extract_structured("<html><body><script>var a = {};</script></body></html>").is_none());
    }
}
