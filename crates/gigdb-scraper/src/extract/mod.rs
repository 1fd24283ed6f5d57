//! Detail-page extraction in three trust tiers.
//!
//! | Tier | Source                                  | Module      |
//! |------|-----------------------------------------|-------------|
//! | 1    | schema.org linked data                  | [`jsonld`]  |
//! | 2    | embedded client state / normalized cache | [`state`]   |
//! | 3    | DOM selectors and text patterns         | [`dom`]     |
//!
//! Every extractor runs independently over the same snapshot. A tier that
//! finds nothing is simply absent from the result; nothing here returns an
//! error. [`crate::reconcile`] merges the tiers into one record.

mod dom;
mod jsonld;
pub mod listing;
pub mod resolve;
mod state;
mod text;
pub mod title;

use std::collections::BTreeMap;

use gigdb_core::{DetailRecord, GeoPoint, ListingRecord, SiteConfig, TicketOffer, TrustTier};

use crate::reconcile::reconcile;
use crate::session::PageSnapshot;

pub use listing::extract_listings;

/// Fields one extractor recovered. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub description: Option<String>,
    pub lineup: Option<String>,
    pub artists: Vec<String>,
    pub genres: Vec<String>,
    pub age_restriction: Option<String>,
    pub ticket_offers: Vec<TicketOffer>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub geo: Option<GeoPoint>,
    pub organizer: Option<String>,
    pub door_time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub image_url: Option<String>,
    pub event_type: Option<String>,
    pub cost: Option<String>,
    pub social_links: BTreeMap<String, String>,
}

impl PartialRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The output of one extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub tier: TrustTier,
    pub record: PartialRecord,
}

/// Per-page knobs for detail extraction.
#[derive(Debug, Clone)]
pub struct DetailOptions {
    /// Key prefix of event entries in the embedded cache.
    pub entity_prefix: String,
    /// Id of the event this page is about, when known.
    pub preferred_id: Option<String>,
    /// Depth bound for reference resolution and entity search.
    pub max_depth: usize,
    /// Extra genre tags to look for in the page text.
    pub genre_keywords: Vec<String>,
}

impl DetailOptions {
    /// Options for the detail page of `listing` on `site`.
    ///
    /// The preferred cache id is the last path segment of the listing's
    /// detail URL.
    #[must_use]
    pub fn for_listing(site: &SiteConfig, listing: &ListingRecord) -> Self {
        let preferred_id = listing
            .detail_url
            .as_deref()
            .and_then(|u| url::Url::parse(u).ok())
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                    .map(str::to_string)
            });
        Self {
            entity_prefix: site.entity_prefix.clone(),
            preferred_id,
            max_depth: resolve::MAX_RESOLVE_DEPTH,
            genre_keywords: site.genre_keywords.clone(),
        }
    }
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self {
            entity_prefix: gigdb_core::DEFAULT_ENTITY_PREFIX.to_string(),
            preferred_id: None,
            max_depth: resolve::MAX_RESOLVE_DEPTH,
            genre_keywords: Vec::new(),
        }
    }
}

/// Run every extractor over `snapshot`, most trusted first.
#[must_use]
pub fn extract_all(snapshot: &PageSnapshot, options: &DetailOptions) -> Vec<Extraction> {
    let html = snapshot.html.as_str();
    let tiers = [
        (TrustTier::LinkedData, jsonld::extract_linked_data(html)),
        (
            TrustTier::EmbeddedState,
            state::extract_embedded_state(html, options),
        ),
        (
            TrustTier::DomHeuristic,
            dom::extract_dom(html, &options.genre_keywords),
        ),
    ];

    tiers
        .into_iter()
        .filter_map(|(tier, record)| {
            let found = record.is_some();
            tracing::debug!(url = %snapshot.url, %tier, found, "extractor finished");
            record.map(|record| Extraction { tier, record })
        })
        .collect()
}

/// Extract and reconcile one detail page.
#[must_use]
pub fn extract_detail(snapshot: &PageSnapshot, options: &DetailOptions) -> DetailRecord {
    reconcile(&extract_all(snapshot, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(html: &str) -> PageSnapshot {
        PageSnapshot {
            url: "https://ra.co/events/2217894".to_string(),
            html: html.to_string(),
        }
    }

    #[test]
    fn preferred_id_is_last_path_segment() {
        let site = SiteConfig {
            name: "RA".to_string(),
            base_url: "https://ra.co".to_string(),
            listing_path: "/events/us/newyork".to_string(),
            city: None,
            category: None,
            target_date: None,
            entity_prefix: "Event:".to_string(),
            card_selectors: vec![],
            genre_keywords: vec!["Techno".to_string()],
            known_venues: vec![],
        };
        let listing = ListingRecord {
            identity: "https://ra.co/events/2217894/".to_string(),
            detail_url: Some("https://ra.co/events/2217894/".to_string()),
            ..ListingRecord::default()
        };
        let options = DetailOptions::for_listing(&site, &listing);
        assert_eq!(options.preferred_id.as_deref(), Some("2217894"));
        assert_eq!(options.genre_keywords, vec!["Techno".to_string()]);
    }

    #[test]
    fn tiers_run_independently() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type": "MusicEvent", "location": {"name": "Nowadays"}}</script>
            <script id="__NEXT_DATA__" type="application/json">{not valid json</script>
            </head><body><p>This is a 21+ event.</p></body></html>"#;
        let extractions = extract_all(&snapshot(html), &DetailOptions::default());
        let tiers: Vec<TrustTier> = extractions.iter().map(|e| e.tier).collect();
        assert_eq!(tiers, vec![TrustTier::LinkedData, TrustTier::DomHeuristic]);
    }

    #[test]
    fn linked_data_wins_over_competing_dom_values() {
        let html = r#"<html><head>
            <script type="application/ld+json">{
                "@type": "MusicEvent",
                "description": "Line one.\n\nLine  two.",
                "startDate": "2025-12-06T23:00:00-05:00",
                "endDate": "2025-12-07T06:00:00-05:00"
            }</script>
            </head><body>
            <div class="event-description">A completely different description lifted from the page body text.</div>
            <p>Starts at 10:00 PM. Ends at 4:00 AM.</p>
            </body></html>"#;
        let snapshot = snapshot(html);
        let options = DetailOptions::default();

        let dom = extract_all(&snapshot, &options)
            .into_iter()
            .find(|e| e.tier == TrustTier::DomHeuristic)
            .expect("dom heuristics fire");
        assert!(dom.record.description.is_some());
        assert!(dom.record.start_time.is_some());
        assert!(dom.record.end_time.is_some());

        let record = extract_detail(&snapshot, &options);
        assert_eq!(record.description.as_deref(), Some("Line one.\n\nLine  two."));
        assert_eq!(record.start_time.as_deref(), Some("2025-12-06T23:00:00-05:00"));
        assert_eq!(record.end_time.as_deref(), Some("2025-12-07T06:00:00-05:00"));
        for field in ["description", "startTime", "endTime"] {
            assert_eq!(record.raw_evidence.get(field), Some(&TrustTier::LinkedData));
        }
    }

    #[test]
    fn blank_page_reconciles_to_empty_record() {
        let record = extract_detail(&snapshot("<html><body></body></html>"), &DetailOptions::default());
        assert!(record.is_empty());
    }
}
