//! Output parsing for the `site-builder` and `walrus` CLIs.
//!
//! The deployer has no structured success output we can rely on, so the
//! object ID, URLs and resource listing are recovered from prose. All of
//! that lives behind [`OutputParser`] so a JSON parser can replace the
//! text rules without touching the workflow.

use crate::types::{ObjectId, Resource, SiteBuilderOutput};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-Z\\-_])")
        .expect("static regex")
});

static OBJECT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:new site object id|site object id)\s*:\s*((?:0x)?[0-9a-f]{64})\b")
        .expect("static regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'`]+"#).expect("static regex"));

const URL_TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '\'', '"'];

/// Turns raw CLI text into a partially filled [`SiteBuilderOutput`].
pub trait OutputParser: Send + Sync {
    /// Never fails: unrecognised text leaves fields at their zero value.
    fn parse(&self, raw: &str) -> SiteBuilderOutput;
}

/// Label-and-pattern matching over the deployer's human-readable output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOutputParser;

impl OutputParser for TextOutputParser {
    fn parse(&self, raw: &str) -> SiteBuilderOutput {
        let text = strip_ansi(raw);
        let mut out = SiteBuilderOutput::new();

        if let Some(id) = parse_object_id(&text) {
            out.set_object_id(&id);
        }
        out.browse_urls = parse_urls(&text);
        if let Some(first) = out.browse_urls.first() {
            out.site_url = first.clone();
        }
        out.resources = parse_resources(&text);
        out
    }
}

/// Remove terminal escape sequences (colors, cursor movement, OSC titles).
pub fn strip_ansi(s: &str) -> String {
    ANSI_RE.replace_all(s, "").into_owned()
}

/// Find the first JSON document in noisy output.
///
/// Strips escapes, then tries every `{` / `[` from the left until one
/// starts a complete JSON value. Returns exactly that value's text;
/// trailing output is ignored.
pub fn extract_json(raw: &str) -> Option<String> {
    let clean = strip_ansi(raw);
    let mut from = 0;

    while let Some(rel) = clean[from..].find(['{', '[']) {
        let start = from + rel;
        let tail = &clean[start..];
        let mut stream = serde_json::Deserializer::from_str(tail).into_iter::<serde_json::Value>();
        if let Some(Ok(_)) = stream.next() {
            let end = stream.byte_offset();
            return Some(tail[..end].to_string());
        }
        from = start + 1;
    }
    None
}

/// [`extract_json`] then deserialize.
pub fn parse_json_report<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let json = extract_json(raw).ok_or_else(|| "no JSON document found in output".to_string())?;
    serde_json::from_str(&json).map_err(|e| format!("malformed JSON report: {}", e))
}

/// Most recent labelled object ID in the text.
pub fn parse_object_id(text: &str) -> Option<ObjectId> {
    text.lines().rev().find_map(|line| {
        OBJECT_ID_RE
            .captures(line)
            .and_then(|c| ObjectId::parse(&c[1]).ok())
    })
}

/// Every distinct http(s) URL, in order of appearance, trailing punctuation removed.
pub fn parse_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for line in text.lines() {
        for m in URL_RE.find_iter(line) {
            let url = m.as_str().trim_end_matches(URL_TRAILING_PUNCT);
            if url.len() > "https://".len() && !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
    }
    urls
}

/// `path` / `blob ID` pairs from lines such as
/// `Created resource /index.html with blob ID 4ZcB...`.
pub fn parse_resources(text: &str) -> Vec<Resource> {
    text.lines().filter_map(parse_resource_line).collect()
}

fn parse_resource_line(line: &str) -> Option<Resource> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let marker = tokens.windows(2).position(|w| {
        w[0].eq_ignore_ascii_case("blob") && w[1].trim_end_matches(':').eq_ignore_ascii_case("id")
    })?;

    let blob_id = tokens
        .get(marker + 2)?
        .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_');
    if blob_id.is_empty() {
        return None;
    }

    let before = &tokens[..marker];
    let path = before
        .iter()
        .rposition(|t| t.eq_ignore_ascii_case("resource"))
        .and_then(|i| before.get(i + 1))
        .or_else(|| before.iter().find(|t| t.starts_with('/')))?;
    let path = path.trim_end_matches([',', ':']);

    Some(Resource {
        path: path.to_string(),
        blob_id: blob_id.to_string(),
    })
}
