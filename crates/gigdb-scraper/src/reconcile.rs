//! Merge per-tier extractions into one [`DetailRecord`].
//!
//! Merge rules:
//!
//! - scalar fields come from the most trusted tier with a non-blank value,
//!   copied as that tier wrote it;
//! - `artists` and `genres` are the ordered union across tiers, most trusted
//!   first, with exact duplicates dropped;
//! - `ticketOffers` is taken whole from the most trusted tier that has any;
//! - `socialLinks` are merged per platform, most trusted tier winning;
//! - `rawEvidence` records the tier each populated field came from.
//!
//! The merge is a pure function of its input, so reconciling the same
//! extractions twice gives identical records.

use std::collections::BTreeMap;

use gigdb_core::{DetailRecord, TrustTier};

use crate::extract::{Extraction, PartialRecord};

/// Reconcile extractions into a detail record.
///
/// Input order does not matter; extractions are ranked by tier. Two
/// extractions of the same tier keep their input order.
#[must_use]
pub fn reconcile(extractions: &[Extraction]) -> DetailRecord {
    let mut ranked: Vec<&Extraction> = extractions.iter().collect();
    ranked.sort_by_key(|e| e.tier);

    let mut merger = Merger {
        ranked: &ranked,
        evidence: BTreeMap::new(),
    };

    let record = DetailRecord {
        description: merger.scalar("description", |r| r.description.as_deref()),
        lineup: merger.scalar("lineup", |r| r.lineup.as_deref()),
        artists: merger.union("artists", |r| &r.artists),
        genres: merger.union("genres", |r| &r.genres),
        age_restriction: merger.scalar("ageRestriction", |r| r.age_restriction.as_deref()),
        ticket_offers: merger.whole("ticketOffers", |r| &r.ticket_offers),
        venue_name: merger.scalar("venueName", |r| r.venue_name.as_deref()),
        venue_address: merger.scalar("venueAddress", |r| r.venue_address.as_deref()),
        geo: merger.first("geo", |r| r.geo),
        organizer: merger.scalar("organizer", |r| r.organizer.as_deref()),
        door_time: merger.scalar("doorTime", |r| r.door_time.as_deref()),
        start_time: merger.scalar("startTime", |r| r.start_time.as_deref()),
        end_time: merger.scalar("endTime", |r| r.end_time.as_deref()),
        image_url: merger.scalar("imageUrl", |r| r.image_url.as_deref()),
        event_type: merger.scalar("eventType", |r| r.event_type.as_deref()),
        cost: merger.scalar("cost", |r| r.cost.as_deref()),
        social_links: merger.links(),
        raw_evidence: BTreeMap::new(),
    };

    DetailRecord {
        raw_evidence: merger.evidence,
        ..record
    }
}

struct Merger<'a> {
    ranked: &'a [&'a Extraction],
    evidence: BTreeMap<String, TrustTier>,
}

impl<'a> Merger<'a> {
    fn note(&mut self, field: &str, tier: TrustTier) {
        self.evidence.entry(field.to_string()).or_insert(tier);
    }

    fn scalar(&mut self, field: &str, get: impl Fn(&'a PartialRecord) -> Option<&'a str>) -> Option<String> {
        let ranked = self.ranked;
        let (tier, value) = ranked.iter().find_map(|e| {
            get(&e.record)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (e.tier, v.to_string()))
        })?;
        self.note(field, tier);
        Some(value)
    }

    fn first<T: Copy>(&mut self, field: &str, get: impl Fn(&'a PartialRecord) -> Option<T>) -> Option<T> {
        let ranked = self.ranked;
        let (tier, value) = ranked
            .iter()
            .find_map(|e| get(&e.record).map(|v| (e.tier, v)))?;
        self.note(field, tier);
        Some(value)
    }

    fn union(&mut self, field: &str, get: impl Fn(&'a PartialRecord) -> &'a Vec<String>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for e in self.ranked {
            for item in get(&e.record) {
                let item = item.trim();
                if item.is_empty() || out.iter().any(|existing| existing == item) {
                    continue;
                }
                out.push(item.to_string());
                self.note(field, e.tier);
            }
        }
        out
    }

    fn whole<T: Clone + 'a>(&mut self, field: &str, get: impl Fn(&'a PartialRecord) -> &'a Vec<T>) -> Vec<T> {
        let ranked = self.ranked;
        let Some(e) = ranked.iter().find(|e| !get(&e.record).is_empty()) else {
            return Vec::new();
        };
        self.note(field, e.tier);
        get(&e.record).clone()
    }

    fn links(&mut self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for e in self.ranked {
            for (platform, url) in &e.record.social_links {
                if !out.contains_key(platform) && !url.trim().is_empty() {
                    out.insert(platform.clone(), url.clone());
                    self.note("socialLinks", e.tier);
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
