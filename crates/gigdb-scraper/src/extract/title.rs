//! Negative filter for picking an event title out of listing-card text.
//!
//! Cards mix the title with times, dates, prices and genre tags, often in
//! sibling elements with no semantic markup. A fragment is a title candidate
//! only if it looks like none of those.

use std::sync::LazyLock;

use regex::Regex;

use super::text::{MONTH_PATTERN, WEEKDAY_PATTERN};

/// Genre tags recognized when a site configures none of its own.
pub const DEFAULT_GENRE_KEYWORDS: [&str; 12] = [
    "House",
    "Techno",
    "Deep House",
    "Afro House",
    "Tech House",
    "Disco",
    "Jazz",
    "Electronic",
    "Hip Hop",
    "R&B",
    "Dance",
    "Reggaeton",
];

/// Shortest text that can be a title.
const MIN_TITLE_CHARS: usize = 6;

static TIME_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d{1,2}:\d{2}").expect("valid regex"));

static WEEKDAY_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{WEEKDAY_PATTERN}\b,?\s+(?:\d{{1,2}}\s+)?{MONTH_PATTERN}\b"))
        .expect("valid regex")
});

static MONTH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{MONTH_PATTERN}\.?(?:\s+\d|$)")).expect("valid regex")
});

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:from\s+)?[$€£]\s?\d").expect("valid regex"));

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:sold\s*out|free|tickets?|buy(?:\s+tickets?)?|rsvp|going|interested|new|few\s+left|last\s+tickets)$")
        .expect("valid regex")
});

/// Whether `text` could be an event title.
///
/// Rejects short fragments, times, weekday- or month-led dates, prices,
/// ticket status words, and bare genre tags. `genre_keywords` falls back to
/// [`DEFAULT_GENRE_KEYWORDS`] when empty.
#[must_use]
pub fn is_title_candidate(text: &str, genre_keywords: &[String]) -> bool {
    let text = text.trim();
    if text.chars().count() < MIN_TITLE_CHARS {
        return false;
    }
    if TIME_ONLY_RE.is_match(text)
        || WEEKDAY_DATE_RE.is_match(text)
        || MONTH_DATE_RE.is_match(text)
        || PRICE_RE.is_match(text)
        || STATUS_RE.is_match(text)
    {
        return false;
    }
    !is_bare_genre(text, genre_keywords)
}

fn is_bare_genre(text: &str, genre_keywords: &[String]) -> bool {
    if genre_keywords.is_empty() {
        DEFAULT_GENRE_KEYWORDS
            .iter()
            .any(|g| text.eq_ignore_ascii_case(g))
    } else {
        genre_keywords
            .iter()
            .any(|g| text.eq_ignore_ascii_case(g.trim()))
    }
}
