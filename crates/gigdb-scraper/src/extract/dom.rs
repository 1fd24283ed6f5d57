//! Tier 3: DOM heuristics.
//!
//! Each field has an ordered list of probes. A probe reads one selector or
//! one pattern and either yields a value or nothing; the first probe that
//! yields wins. Adding a site-specific selector means adding a probe, not a
//! branch.

use std::sync::LazyLock;

use gigdb_core::TicketOffer;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::text::{element_text, push_unique, visible_text};
use super::PartialRecord;

/// One way of reading a text field from a detail page.
#[derive(Debug, Clone, Copy)]
enum Probe {
    /// Text of the first match with at least `min_chars` characters.
    Text {
        selector: &'static str,
        min_chars: usize,
    },
    /// An attribute of the first match.
    Attr {
        selector: &'static str,
        attr: &'static str,
    },
    /// First capture group of a pattern over the page's visible text.
    Pattern(&'static LazyLock<Regex>),
}

/// A parsed detail page plus its visible text, built once per extraction.
struct DomPage {
    document: Html,
    visible: String,
    /// `visible`, lowercased for keyword matching.
    visible_lower: String,
}

impl DomPage {
    fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let visible = visible_text(document.root_element());
        let visible_lower = visible.to_lowercase();
        Self {
            document,
            visible,
            visible_lower,
        }
    }

    fn elements(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(sel) => self.document.select(&sel).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn run(&self, probe: Probe) -> Option<String> {
        match probe {
            Probe::Text {
                selector,
                min_chars,
            } => self
                .elements(selector)
                .into_iter()
                .map(element_text)
                .find(|text| text.chars().count() >= min_chars.max(1)),
            Probe::Attr { selector, attr } => self
                .elements(selector)
                .into_iter()
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(str::to_string),
            Probe::Pattern(regex) => regex
                .captures(&self.visible)
                .and_then(|cap| cap.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|value| !value.is_empty()),
        }
    }

    fn first(&self, probes: &[Probe]) -> Option<String> {
        probes.iter().find_map(|probe| self.run(*probe))
    }
}

const DESCRIPTION_PROBES: [Probe; 8] = [
    text(r#"[class*="description"]"#, 50),
    text(r#"[class*="Description"]"#, 50),
    text(r#"[data-testid*="description"]"#, 50),
    text(r#"[class*="about"]"#, 50),
    text(r#"[class*="About"]"#, 50),
    text(r#"[class*="details"]"#, 50),
    text("article p", 50),
    attr(r#"meta[name="description"]"#, "content"),
];

const LINEUP_PROBES: [Probe; 5] = [
    text(r#"[class*="lineup"]"#, 1),
    text(r#"[class*="Lineup"]"#, 1),
    text(r#"[data-testid*="lineup"]"#, 1),
    text(r#"[class*="performers"]"#, 1),
    text(r#"[class*="Performers"]"#, 1),
];

const VENUE_PROBES: [Probe; 6] = [
    text(r#"[class*="venue-name"]"#, 2),
    text(r#"[class*="VenueName"]"#, 2),
    text(r#"a[href*="/venues/"]"#, 2),
    text(r#"a[href*="/venue/"]"#, 2),
    text(r#"[class*="venue"]"#, 2),
    text(r#"[class*="Venue"]"#, 2),
];

const ADDRESS_PROBES: [Probe; 4] = [
    text(r#"[class*="address"]"#, 5),
    text(r#"[class*="Address"]"#, 5),
    text(r#"[itemprop="address"]"#, 5),
    text("address", 5),
];

const ORGANIZER_PROBES: [Probe; 6] = [
    text(r#"[class*="promoter"]"#, 2),
    text(r#"[class*="Promoter"]"#, 2),
    text(r#"[class*="organizer"]"#, 2),
    text(r#"[class*="Organizer"]"#, 2),
    text(r#"a[href*="/promoters/"]"#, 2),
    text(r#"a[href*="/organizers/"]"#, 2),
];

const IMAGE_PROBES: [Probe; 7] = [
    attr(r#"meta[property="og:image"]"#, "content"),
    attr(r#"img[class*="flyer"]"#, "src"),
    attr(r#"img[class*="poster"]"#, "src"),
    attr(r#"img[class*="event"]"#, "src"),
    attr(r#"img[class*="Event"]"#, "src"),
    attr(r#"img[alt*="event"]"#, "src"),
    attr("main img", "src"),
];

static AGE_EVENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bThis is (?:a|an) (\d+\+) event").expect("valid regex")
});
static AGE_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+\+) only\b").expect("valid regex"));
static AGE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bAge (?:restriction|limit)[:\s]+(\d+\+?)").expect("valid regex")
});
static AGE_AND_OVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+) (?:and|&) (?:over|up|older)\b").expect("valid regex")
});
static ALL_AGES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(all ages)\b").expect("valid regex"));

static AGE_PROBES: [Probe; 5] = [
    Probe::Pattern(&AGE_EVENT_RE),
    Probe::Pattern(&AGE_ONLY_RE),
    Probe::Pattern(&AGE_LABEL_RE),
    Probe::Pattern(&AGE_AND_OVER_RE),
    Probe::Pattern(&ALL_AGES_RE),
];

static DOORS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bDoors?(?:\s+open)?(?:\s+at)?[:\s]+(\d{1,2}(?::\d{2})?\s*(?:[AP]M)?)")
        .expect("valid regex")
});
static START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Starts?|Start time|Show)(?:\s+at)?[:\s]+(\d{1,2}(?::\d{2})?\s*(?:[AP]M)?)")
        .expect("valid regex")
});
static END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Ends?|End time|Until)(?:\s+at)?[:\s]+(\d{1,2}(?::\d{2})?\s*(?:[AP]M)?)")
        .expect("valid regex")
});

static DOOR_TIME_PROBES: [Probe; 1] = [Probe::Pattern(&DOORS_RE)];
static START_TIME_PROBES: [Probe; 1] = [Probe::Pattern(&START_RE)];
static END_TIME_PROBES: [Probe; 1] = [Probe::Pattern(&END_RE)];

const ARTIST_SELECTORS: [&str; 4] = [
    r#"a[href*="/artists/"]"#,
    r#"a[href*="/artist/"]"#,
    r#"[data-testid*="artist"]"#,
    r#"[class*="artist-name"]"#,
];

const GENRE_SELECTORS: [&str; 6] = [
    r#"a[href*="/genre/"]"#,
    r#"a[href*="/genres/"]"#,
    r#"[class*="genre"]"#,
    r#"[class*="Genre"]"#,
    r#"[class*="tag"]"#,
    r#"[class*="Tag"]"#,
];

/// Genre tags longer than this are prose, not tags.
const MAX_GENRE_CHARS: usize = 30;

const TICKET_SELECTORS: [&str; 4] = [
    r#"[class*="ticket"]"#,
    r#"[class*="Ticket"]"#,
    r#"[data-testid*="ticket"]"#,
    r#"button[class*="buy"]"#,
];

static TICKET_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[$€£]\s?\d+(?:[.,]\d{2})?|\b\d+[.,]\d{2}\b|\bfree\b").expect("valid regex")
});

/// Ticket rows longer than this are a whole section, not one tier.
const MAX_TICKET_CHARS: usize = 100;

/// Event-type labels, most specific first.
const EVENT_TYPES: [&str; 6] = [
    "Club Night",
    "DJ Set",
    "Live Music",
    "Festival",
    "Concert",
    "Party",
];

/// Social platforms recognized by host suffix.
static SOCIAL_PLATFORMS: [(&str, &[&str]); 5] = [
    ("facebook", &["facebook.com", "fb.com"]),
    ("instagram", &["instagram.com"]),
    ("twitter", &["twitter.com", "x.com"]),
    ("spotify", &["spotify.com"]),
    ("soundcloud", &["soundcloud.com"]),
];

const fn text(selector: &'static str, min_chars: usize) -> Probe {
    Probe::Text {
        selector,
        min_chars,
    }
}

const fn attr(selector: &'static str, attr: &'static str) -> Probe {
    Probe::Attr { selector, attr }
}

/// Read whatever the DOM heuristics can find on a detail page.
///
/// `genre_keywords` (from site configuration) are also matched in the
/// page's visible text.
pub(crate) fn extract_dom(html: &str, genre_keywords: &[String]) -> Option<PartialRecord> {
    let page = DomPage::parse(html);

    let mut record = PartialRecord {
        description: page.first(&DESCRIPTION_PROBES),
        lineup: page.first(&LINEUP_PROBES),
        venue_name: page.first(&VENUE_PROBES),
        venue_address: page.first(&ADDRESS_PROBES),
        organizer: page.first(&ORGANIZER_PROBES),
        image_url: page.first(&IMAGE_PROBES),
        age_restriction: page.first(&AGE_PROBES).map(|age| normalize_age(&age)),
        door_time: page.first(&DOOR_TIME_PROBES),
        start_time: page.first(&START_TIME_PROBES),
        end_time: page.first(&END_TIME_PROBES),
        event_type: event_type(&page.visible_lower),
        ..PartialRecord::default()
    };

    record.artists = collect_texts(&page, &ARTIST_SELECTORS, usize::MAX);
    record.genres = collect_texts(&page, &GENRE_SELECTORS, MAX_GENRE_CHARS);
    for keyword in genre_keywords {
        let keyword = keyword.trim();
        if !keyword.is_empty() && contains_word(&page.visible_lower, keyword) {
            push_unique(&mut record.genres, keyword.to_string());
        }
    }
    record.ticket_offers = ticket_offers(&page);
    record.cost = record
        .ticket_offers
        .iter()
        .find_map(|offer| offer.price.clone());
    record.social_links = social_links(&page);

    (!record.is_empty()).then_some(record)
}

/// `"18"` and `"18 and over"` read as `"18+"`; labels like "All ages" are kept.
fn normalize_age(raw: &str) -> String {
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        raw.to_string()
    } else {
        format!("{digits}+")
    }
}

fn event_type(visible_lower: &str) -> Option<String> {
    EVENT_TYPES
        .iter()
        .find(|label| contains_word(visible_lower, label))
        .map(|label| (*label).to_string())
}

/// Whole-phrase match of `needle` in an already lowercased `haystack`.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(needle.as_str()).any(|(start, found)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + found.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

fn collect_texts(page: &DomPage, selectors: &[&str], max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    for selector in selectors {
        for el in page.elements(selector) {
            let text = element_text(el);
            let len = text.chars().count();
            if len > 1 && len <= max_chars {
                push_unique(&mut out, text);
            }
        }
    }
    out
}

fn ticket_offers(page: &DomPage) -> Vec<TicketOffer> {
    let mut offers: Vec<TicketOffer> = Vec::new();
    for selector in TICKET_SELECTORS {
        for el in page.elements(selector) {
            let text = element_text(el);
            if text.chars().count() > MAX_TICKET_CHARS {
                continue;
            }
            let Some(price) = TICKET_PRICE_RE.find(&text) else {
                continue;
            };
            let offer = TicketOffer {
                name: Some(text.clone()),
                price: Some(price.as_str().to_string()),
                ..TicketOffer::default()
            };
            if !offers.contains(&offer) {
                offers.push(offer);
            }
        }
    }
    offers
}

/// Last link per platform wins.
fn social_links(page: &DomPage) -> std::collections::BTreeMap<String, String> {
    let mut links = std::collections::BTreeMap::new();
    for el in page.elements("a[href]") {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(parsed) = url::Url::parse(href.trim()) else {
            continue;
        };
        let Some(host) = parsed.host_str() else {
            continue;
        };
        let host = host.to_ascii_lowercase();
        if let Some((platform, _)) = SOCIAL_PLATFORMS.iter().find(|(_, domains)| {
            domains
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{d}")))
        }) {
            links.insert((*platform).to_string(), parsed.to_string());
        }
    }
    links
}
