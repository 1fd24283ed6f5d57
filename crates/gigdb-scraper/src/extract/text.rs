//! Shared text, DOM and JSON helpers for the extractors.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use serde_json::Value;

use crate::extract::resolve::UNKNOWN;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `h:mm` clock time with an optional meridiem.
pub(crate) static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}(?:\s*[AP]M)?\b").expect("valid regex")
});

/// Alternation of English month names and their abbreviations.
pub(crate) const MONTH_PATTERN: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

/// Alternation of English weekday names and their abbreviations.
pub(crate) const WEEKDAY_PATTERN: &str = r"(?:mon(?:day)?|tue(?:s(?:day)?)?|wed(?:nesday)?|thu(?:r(?:s(?:day)?)?)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?)";

/// Collapse runs of whitespace and trim.
pub(crate) fn clean_text(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

/// All descendant text of `el`, whitespace-normalized.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text held directly by `el`, ignoring text inside child elements.
pub(crate) fn direct_text(el: ElementRef<'_>) -> String {
    let parts: Vec<&str> = el
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .collect();
    clean_text(&parts.join(" "))
}

/// Text a reader would see: everything outside script, style and template
/// elements.
pub(crate) fn visible_text(root: ElementRef<'_>) -> String {
    let parts: Vec<&str> = root
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor.value().as_element().is_some_and(|el| {
                    matches!(el.name(), "script" | "style" | "noscript" | "template")
                })
            });
            (!hidden).then(|| text.trim())
        })
        .filter(|text| !text.is_empty())
        .collect();
    clean_text(&parts.join(" "))
}

/// Parse a selector, logging and skipping invalid ones.
///
/// Only used for selectors that come from site configuration; built-in
/// selectors are parsed once and `expect`ed.
pub(crate) fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(err) => {
            tracing::warn!(selector = raw, error = %err, "ignoring invalid selector");
            None
        }
    }
}

/// Resolve `href` against `base`. Returns `None` for empty, fragment-only,
/// and script links.
pub(crate) fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let base = url::Url::parse(base).ok()?;
    base.join(href).ok().map(String::from)
}

/// A JSON scalar as text, exactly as the payload holds it. Numbers are
/// stringified; the unknown sentinel, blank strings and non-scalars yield
/// `None`.
pub(crate) fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty() && trimmed != UNKNOWN).then(|| s.clone())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First of `keys` present on `obj` with a usable text value.
pub(crate) fn first_text_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| obj.get(*key).and_then(json_text))
}

/// A number that may be encoded as a JSON number or a numeric string.
pub(crate) fn json_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
}

/// Text values of a scalar or an array of scalars/objects.
///
/// Objects contribute their `name`.
pub(crate) fn json_text_list(value: &Value) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => obj.get("name").and_then(json_text),
            other => json_text(other),
        })
        .collect()
}

/// Append `value` unless an identical entry is already present.
pub(crate) fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.iter().any(|existing| *existing == value) {
        list.push(value);
    }
}
