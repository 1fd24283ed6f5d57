//! Listing-page extraction: turn a browse page into [`ListingRecord`]s.
//!
//! Two sources are read. Entries of an embedded normalized cache come first,
//! then DOM cards. Both may describe the same event; duplicates are folded
//! later by [`crate::dedupe::dedupe_listings`].

use std::sync::LazyLock;

use gigdb_core::{ListingRecord, SiteConfig};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::resolve::{NormalizedCache, MAX_RESOLVE_DEPTH};
use super::state::embedded_payloads;
use super::text::{
    absolutize, direct_text, element_text, first_text_field, json_text, json_text_list,
    parse_selector, push_unique, MONTH_PATTERN, TIME_RE, WEEKDAY_PATTERN,
};
use super::title::{is_title_candidate, DEFAULT_GENRE_KEYWORDS};
use crate::session::PageSnapshot;

/// Card selectors tried when a site configures none.
pub const DEFAULT_CARD_SELECTORS: [&str; 6] = [
    r#"a[href*="/events/"]"#,
    r#"[data-testid*="event"]"#,
    r#"[class*="event-card"]"#,
    r#"[class*="EventCard"]"#,
    r#"a[href*="/event/"]"#,
    "article",
];

/// Elements whose own text may hold a card's title, in priority order.
const TITLE_SELECTORS: [&str; 8] = ["h1", "h2", "h3", "h4", "a", "p", "span", "div"];

/// Elements whose whole text may hold a card's title.
const TITLE_BLOCK_SELECTORS: [&str; 3] = [
    r#"[class*="title"]"#,
    r#"[class*="Title"]"#,
    r#"[class*="name"]"#,
];

const VENUE_SELECTORS: [&str; 4] = [
    r#"[class*="venue"]"#,
    r#"[class*="Venue"]"#,
    r#"[class*="location"]"#,
    r#"[class*="Location"]"#,
];

/// Link targets that are never event pages.
const IGNORED_HREF_PARTS: [&str; 3] = ["/search", "/login", "/signup"];

static CARD_DATE_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // "Sat, Dec 6" / "Sat 6 Dec"
        Regex::new(&format!(
            r"(?i)\b{WEEKDAY_PATTERN},?\s+(?:{MONTH_PATTERN}\.?\s+\d{{1,2}}|\d{{1,2}}\s+{MONTH_PATTERN})\b"
        ))
        .expect("valid regex"),
        // "December 12" / "Dec 12"
        Regex::new(&format!(r"(?i)\b{MONTH_PATTERN}\.?\s+\d{{1,2}}\b")).expect("valid regex"),
        // "12/06" / "12/06/2025"
        Regex::new(r"\b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b").expect("valid regex"),
    ]
});

static CARD_PRICE_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\bfrom\s+[$€£]\s?\d+(?:\.\d{1,2})?").expect("valid regex"),
        Regex::new(r"[$€£]\s?\d+(?:\.\d{1,2})?").expect("valid regex"),
        Regex::new(r"(?i)\bsold\s*out\b").expect("valid regex"),
        Regex::new(r"(?i)\bfree\b").expect("valid regex"),
    ]
});

/// A capitalized phrase immediately followed by a time or weekday, the way
/// cards often run "Venue 11:00 PM" together.
static VENUE_BEFORE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"([A-Z][A-Za-z0-9&'.\- ]{{2,40}}?)\s+(?:\d{{1,2}}:\d{{2}}|(?i:{WEEKDAY_PATTERN})\b)"
    ))
    .expect("valid regex")
});

/// Extract listing records from a listing-page snapshot.
///
/// Records come back in page order: cache entries first, then cards. No
/// de-duplication happens here.
#[must_use]
pub fn extract_listings(snapshot: &PageSnapshot, site: &SiteConfig) -> Vec<ListingRecord> {
    let mut records = listings_from_state(&snapshot.html, site, &snapshot.url);
    let cards = listings_from_cards(&snapshot.html, site, &snapshot.url);
    tracing::debug!(
        site = %site.name,
        from_state = records.len(),
        from_cards = cards.len(),
        "listing extraction"
    );
    records.extend(cards);
    records
}

fn listings_from_state(html: &str, site: &SiteConfig, page_url: &str) -> Vec<ListingRecord> {
    let slug = site.slug();
    let payloads = embedded_payloads(html);

    for payload in &payloads {
        let Some(cache) = NormalizedCache::locate(payload, &site.entity_prefix) else {
            continue;
        };
        let records: Vec<ListingRecord> = cache
            .entries_with_prefix(&site.entity_prefix)
            .filter_map(|(key, entry)| {
                let Value::Object(entity) = cache.resolve(entry, MAX_RESOLVE_DEPTH) else {
                    return None;
                };
                let id = key.strip_prefix(site.entity_prefix.as_str()).unwrap_or(key);
                Some(listing_from_entity(&entity, id, &slug, page_url, &site.base_url))
            })
            .collect();
        if !records.is_empty() {
            return records;
        }
    }

    Vec::new()
}

fn listing_from_entity(
    entity: &serde_json::Map<String, Value>,
    id: &str,
    slug: &str,
    page_url: &str,
    base_url: &str,
) -> ListingRecord {
    let detail_url = first_text_field(entity, &["contentUrl", "url", "href"])
        .and_then(|href| absolutize(base_url, &href).or_else(|| absolutize(page_url, &href)));
    let image_url = first_text_field(entity, &["flyerFront", "image", "imageUrl"])
        .or_else(|| {
            entity
                .get("images")
                .map(json_text_list)
                .and_then(|images| images.into_iter().next())
        })
        .and_then(|src| absolutize(page_url, &src));

    let mut genres = Vec::new();
    if let Some(value) = entity.get("genres") {
        for name in json_text_list(value) {
            push_unique(&mut genres, name);
        }
    }

    ListingRecord {
        identity: detail_url
            .clone()
            .unwrap_or_else(|| format!("{slug}:{id}")),
        title: first_text_field(entity, &["title", "name"]),
        venue: entity.get("venue").and_then(|venue| match venue {
            Value::Object(obj) => first_text_field(obj, &["name"]),
            other => json_text(other),
        }),
        date: first_text_field(entity, &["date", "startDate"]),
        time: first_text_field(entity, &["startTime"]),
        price: first_text_field(entity, &["cost", "price"]),
        genres,
        image_url,
        detail_url,
    }
}

fn listings_from_cards(html: &str, site: &SiteConfig, page_url: &str) -> Vec<ListingRecord> {
    let document = Html::parse_document(html);
    let slug = site.slug();

    let configured: Vec<&str> = site.card_selectors.iter().map(String::as_str).collect();
    let selectors: &[&str] = if configured.is_empty() {
        &DEFAULT_CARD_SELECTORS
    } else {
        &configured
    };

    let cards = find_cards(&document, selectors);
    let ctx = CardContext {
        site,
        slug: &slug,
        page_url,
    };

    cards
        .into_iter()
        .enumerate()
        .filter_map(|(index, card)| ctx.card_to_listing(card, index))
        .collect()
}

/// Elements matched by the first selector that matches anything.
///
/// Anchor cards pointing at the same href are kept once.
fn find_cards<'a>(document: &'a Html, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for raw in selectors {
        let Some(selector) = parse_selector(raw) else {
            continue;
        };
        let mut seen_hrefs: Vec<&str> = Vec::new();
        let cards: Vec<ElementRef<'a>> = document
            .select(&selector)
            .filter(|el| match el.value().attr("href") {
                Some(href) if IGNORED_HREF_PARTS.iter().any(|p| href.contains(p)) => false,
                Some(href) if el.value().name() == "a" => {
                    if seen_hrefs.contains(&href) {
                        false
                    } else {
                        seen_hrefs.push(href);
                        true
                    }
                }
                _ => true,
            })
            .collect();
        if !cards.is_empty() {
            tracing::debug!(selector = *raw, count = cards.len(), "listing cards found");
            return cards;
        }
    }
    Vec::new()
}

struct CardContext<'a> {
    site: &'a SiteConfig,
    slug: &'a str,
    page_url: &'a str,
}

impl CardContext<'_> {
    fn card_to_listing(&self, card: ElementRef<'_>, index: usize) -> Option<ListingRecord> {
        let detail_url = card_href(card).and_then(|href| absolutize(self.page_url, href));
        let title = self.card_title(card);
        if title.is_none() && detail_url.is_none() {
            return None;
        }

        let text = element_text(card);
        let venue = self.card_venue(card, &text, title.as_deref());

        Some(ListingRecord {
            identity: detail_url
                .clone()
                .unwrap_or_else(|| format!("{}:card-{index}", self.slug)),
            title,
            venue,
            date: card_date(card, &text),
            time: TIME_RE.find(&text).map(|m| m.as_str().to_string()),
            price: CARD_PRICE_RES
                .iter()
                .find_map(|re| re.find(&text))
                .map(|m| m.as_str().to_string()),
            genres: self.card_genres(&text),
            image_url: card_image(card).and_then(|src| absolutize(self.page_url, &src)),
            detail_url,
        })
    }

    /// First element whose own text passes the title filter, then whole
    /// title-ish blocks.
    fn card_title(&self, card: ElementRef<'_>) -> Option<String> {
        let keywords = &self.site.genre_keywords;
        let own_text = TITLE_SELECTORS.iter().find_map(|raw| {
            let selector = Selector::parse(raw).ok()?;
            card.select(&selector)
                .map(direct_text)
                .find(|t| is_title_candidate(t, keywords))
        });
        own_text
            .or_else(|| {
                let t = direct_text(card);
                is_title_candidate(&t, keywords).then_some(t)
            })
            .or_else(|| {
                TITLE_BLOCK_SELECTORS.iter().find_map(|raw| {
                    let selector = Selector::parse(raw).ok()?;
                    card.select(&selector)
                        .map(element_text)
                        .find(|t| is_title_candidate(t, keywords))
                })
            })
    }

    /// Venue from markup, then from the configured venue list, then from a
    /// text fragment that runs a name into a time or weekday.
    fn card_venue(&self, card: ElementRef<'_>, text: &str, title: Option<&str>) -> Option<String> {
        let from_markup = VENUE_SELECTORS.iter().find_map(|raw| {
            let selector = Selector::parse(raw).ok()?;
            card.select(&selector)
                .map(element_text)
                .find(|t| t.chars().count() > 1)
        });
        if from_markup.is_some() {
            return from_markup;
        }

        let lowered = text.to_lowercase();
        if let Some(known) = self
            .site
            .known_venues
            .iter()
            .find(|v| !v.trim().is_empty() && lowered.contains(&v.trim().to_lowercase()))
        {
            return Some(known.trim().to_string());
        }

        card.text()
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty() && Some(*fragment) != title)
            .find_map(|fragment| {
                let cap = VENUE_BEFORE_TIME_RE.captures(fragment)?;
                let venue = cap.get(1)?.as_str().trim();
                let len = venue.chars().count();
                let date_like = CARD_DATE_RES.iter().any(|re| re.is_match(venue));
                ((3..=50).contains(&len) && !date_like && Some(venue) != title)
                    .then(|| venue.to_string())
            })
    }

    fn card_genres(&self, text: &str) -> Vec<String> {
        let mut genres = Vec::new();
        let configured = &self.site.genre_keywords;
        let keywords: Vec<&str> = if configured.is_empty() {
            DEFAULT_GENRE_KEYWORDS.to_vec()
        } else {
            configured.iter().map(String::as_str).collect()
        };
        for keyword in keywords {
            if text.contains(keyword) {
                push_unique(&mut genres, keyword.to_string());
            }
        }
        genres
    }
}

fn card_href(card: ElementRef<'_>) -> Option<&str> {
    if card.value().name() == "a" {
        if let Some(href) = card.value().attr("href") {
            return Some(href);
        }
    }
    let selector = Selector::parse("a[href]").ok()?;
    card.select(&selector)
        .find_map(|a| a.value().attr("href"))
}

fn card_date(card: ElementRef<'_>, text: &str) -> Option<String> {
    if let Ok(selector) = Selector::parse("time") {
        if let Some(el) = card.select(&selector).next() {
            if let Some(datetime) = el.value().attr("datetime").map(str::trim) {
                if !datetime.is_empty() {
                    return Some(datetime.to_string());
                }
            }
            let inner = element_text(el);
            if !inner.is_empty() {
                return Some(inner);
            }
        }
    }
    CARD_DATE_RES
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().to_string())
}

/// `src`, else the first `srcset` candidate, else `data-src`.
fn card_image(card: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("img").ok()?;
    card.select(&selector).find_map(|img| {
        let value = img.value();
        value
            .attr("src")
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.starts_with("data:"))
            .map(str::to_string)
            .or_else(|| {
                value
                    .attr("srcset")
                    .and_then(|set| set.split(',').next())
                    .and_then(|candidate| candidate.split_whitespace().next())
                    .map(str::to_string)
            })
            .or_else(|| value.attr("data-src").map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
    })
}

#[cfg(test)]
#[path = "listing_test.rs"]
mod tests;
