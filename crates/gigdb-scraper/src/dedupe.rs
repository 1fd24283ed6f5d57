//! Collapse repeated sightings of the same listing.

use std::collections::HashMap;

use gigdb_core::ListingRecord;

/// Collapse records that share a detail URL.
///
/// The first sighting keeps its position and its non-empty fields. Empty
/// fields are filled from later sightings and genres are unioned. Records
/// without a detail URL have no reliable identity and are always kept.
#[must_use]
pub fn dedupe_listings(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<ListingRecord> = Vec::with_capacity(records.len());
    let mut collapsed = 0usize;

    for record in records {
        let Some(key) = identity_key(&record) else {
            out.push(record);
            continue;
        };
        if let Some(&index) = position.get(&key) {
            out[index] = merge_sighting(&out[index], &record);
            collapsed += 1;
        } else {
            position.insert(key, out.len());
            out.push(record);
        }
    }

    if collapsed > 0 {
        tracing::debug!(collapsed, kept = out.len(), "collapsed duplicate listings");
    }
    out
}

fn identity_key(record: &ListingRecord) -> Option<String> {
    record
        .detail_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| url.trim_end_matches('/').to_string())
}

/// A new record: `first` with its gaps filled from `later`.
fn merge_sighting(first: &ListingRecord, later: &ListingRecord) -> ListingRecord {
    let mut genres = first.genres.clone();
    for genre in &later.genres {
        if !genres.contains(genre) {
            genres.push(genre.clone());
        }
    }

    ListingRecord {
        identity: first.identity.clone(),
        title: fill(first.title.as_deref(), later.title.as_deref()),
        venue: fill(first.venue.as_deref(), later.venue.as_deref()),
        date: fill(first.date.as_deref(), later.date.as_deref()),
        time: fill(first.time.as_deref(), later.time.as_deref()),
        price: fill(first.price.as_deref(), later.price.as_deref()),
        genres,
        image_url: fill(first.image_url.as_deref(), later.image_url.as_deref()),
        detail_url: first.detail_url.clone(),
    }
}

fn fill(first: Option<&str>, later: Option<&str>) -> Option<String> {
    let present = |v: Option<&str>| v.filter(|s| !s.trim().is_empty()).map(str::to_string);
    present(first).or_else(|| present(later))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(url: Option<&str>, title: Option<&str>) -> ListingRecord {
        ListingRecord {
            identity: url.unwrap_or("site:card-0").to_string(),
            title: title.map(str::to_string),
            detail_url: url.map(str::to_string),
            ..ListingRecord::default()
        }
    }

    #[test]
    fn urlless_records_are_never_merged() {
        let records = vec![
            listing(Some("https://example.test/e/1"), Some("A")),
            listing(Some("https://example.test/e/1"), Some("A again")),
            listing(None, Some("B")),
            listing(None, Some("B")),
        ];
        let out = dedupe_listings(records);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].title.as_deref(), Some("A"));
        assert!(out[1].detail_url.is_none());
        assert!(out[2].detail_url.is_none());
    }

    #[test]
    fn later_sighting_fills_gaps_without_overwriting() {
        let mut first = listing(Some("https://example.test/e/1"), Some("Warehouse Rave"));
        first.genres = vec!["House".to_string()];
        let mut later = listing(Some("https://example.test/e/1/"), Some("Different title"));
        later.venue = Some("Nowadays".to_string());
        later.genres = vec!["Techno".to_string(), "House".to_string()];

        let out = dedupe_listings(vec![first, later]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title.as_deref(), Some("Warehouse Rave"));
        assert_eq!(out[0].venue.as_deref(), Some("Nowadays"));
        assert_eq!(out[0].genres, vec!["House", "Techno"]);
        assert_eq!(out[0].detail_url.as_deref(), Some("https://example.test/e/1"));
    }

    #[test]
    fn first_sighting_keeps_position() {
        let out = dedupe_listings(vec![
            listing(Some("https://example.test/e/2"), Some("Two")),
            listing(Some("https://example.test/e/1"), Some("One")),
            listing(Some("https://example.test/e/2"), None),
        ]);
        let titles: Vec<_> = out.iter().map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("Two"), Some("One")]);
    }
}
