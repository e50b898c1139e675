//! Response body decoding.
//!
//! Servers routinely omit the charset or send the HTTP default (ISO-8859-1)
//! while serving UTF-8, so an ISO-8859-1 declaration is treated as no
//! declaration at all and the body is sniffed instead. An explicit
//! windows-1252 declaration is honoured.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;

/// Labels naming ISO-8859-1 itself. encoding_rs folds these and windows-1252
/// into one encoding, so the decision is made on the label.
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "latin1",
    "l1",
    "iso-ir-100",
    "cp819",
    "ibm819",
    "csisolatin1",
];

/// How far into the body a `<meta>` charset declaration is honoured.
const META_SCAN_BYTES: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#).unwrap()
});

/// Decode a response body using the `Content-Type` header and the bytes themselves.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_param)
        .filter(|label| !is_latin1(label))
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    let encoding = declared.or_else(|| sniff(bytes)).unwrap_or(WINDOWS_1252);

    tracing::debug!(encoding = encoding.name(), "Decoding response body");
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

fn is_latin1(label: &str) -> bool {
    LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label.trim()))
}

fn sniff(bytes: &[u8]) -> Option<&'static Encoding> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Some(encoding);
    }

    let head = &bytes[..bytes.len().min(META_SCAN_BYTES)];
    let meta = META_CHARSET
        .captures(head)
        .and_then(|caps| Encoding::for_label(caps.get(1)?.as_bytes()));
    if meta.is_some() {
        return meta;
    }

    std::str::from_utf8(bytes).is_ok().then_some(UTF_8)
}
