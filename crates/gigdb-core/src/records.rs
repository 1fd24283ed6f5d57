//! Event record value types.
//!
//! Records are plain values owned by the pass that produced them. Merging
//! two records always builds a new value; nothing here mutates a record that
//! has already been emitted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reliability ranking of an extraction strategy.
///
/// Variants are declared most-trusted first, so the derived `Ord` sorts
/// higher-trust tiers before lower-trust ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    /// Site-authored linked-data blocks.
    LinkedData,
    /// Normalized client-state cache embedded in the page.
    EmbeddedState,
    /// Selector and regex heuristics over the rendered DOM.
    DomHeuristic,
}

impl TrustTier {
    /// Numeric rank: 1 is the most trusted.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            TrustTier::LinkedData => 1,
            TrustTier::EmbeddedState => 2,
            TrustTier::DomHeuristic => 3,
        }
    }
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustTier::LinkedData => write!(f, "linked_data"),
            TrustTier::EmbeddedState => write!(f, "embedded_state"),
            TrustTier::DomHeuristic => write!(f, "dom_heuristic"),
        }
    }
}

/// One entry discovered on a browse/listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    /// Site-scoped id or stable URL.
    pub identity: String,
    pub title: Option<String>,
    pub venue: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub price: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    /// Absolute URL of the entity's own page.
    pub detail_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketOffer {
    pub name: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub availability: Option<String>,
    pub valid_from: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Attributes recovered from an entity's own detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub description: Option<String>,
    pub lineup: Option<String>,
    /// De-duplicated, insertion order preserved.
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub age_restriction: Option<String>,
    #[serde(default)]
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
    /// Platform name to URL; at most one URL per platform.
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
    /// Which tier produced each populated field.
    #[serde(default)]
    pub raw_evidence: BTreeMap<String, TrustTier>,
}

impl DetailRecord {
    /// True when no extractor contributed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw_evidence.is_empty()
    }
}

/// A listing entry joined with whatever its detail page yielded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub listing: ListingRecord,
    pub detail: Option<DetailRecord>,
    /// Location of the raw page snapshot kept for audit and re-extraction.
    pub snapshot_path: Option<String>,
    /// Why enrichment did not happen, when it did not.
    pub enrichment_error: Option<String>,
}

impl EnrichedRecord {
    /// Join a listing with its detail record.
    ///
    /// Non-empty listing fields are kept as-is; empty venue, image, and
    /// genres are filled from the detail record. The detail record stays
    /// attached in full.
    #[must_use]
    pub fn new(listing: ListingRecord, detail: DetailRecord) -> Self {
        let mut merged = listing;

        if is_blank(merged.venue.as_deref()) {
            if let Some(venue) = non_blank(detail.venue_name.as_deref()) {
                merged.venue = Some(venue.to_string());
            }
        }
        if is_blank(merged.image_url.as_deref()) {
            if let Some(image) = non_blank(detail.image_url.as_deref()) {
                merged.image_url = Some(image.to_string());
            }
        }
        if merged.genres.is_empty() {
            merged.genres.clone_from(&detail.genres);
        }

        Self {
            listing: merged,
            detail: Some(detail),
            snapshot_path: None,
            enrichment_error: None,
        }
    }

    /// Emit a listing without enrichment, preserving its listing data.
    #[must_use]
    pub fn unenriched(listing: ListingRecord, reason: Option<String>) -> Self {
        Self {
            listing,
            detail: None,
            snapshot_path: None,
            enrichment_error: reason,
        }
    }

    #[must_use]
    pub fn with_snapshot(mut self, path: impl Into<String>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.listing.identity
    }
}

fn is_blank(value: Option<&str>) -> bool {
    non_blank(value).is_none()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
