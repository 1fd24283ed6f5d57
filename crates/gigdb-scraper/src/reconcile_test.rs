use gigdb_core::{GeoPoint, TicketOffer};

use super::*;

fn extraction(tier: TrustTier, record: PartialRecord) -> Extraction {
    Extraction { tier, record }
}

fn offer(name: &str, price: &str) -> TicketOffer {
    TicketOffer {
        name: Some(name.to_string()),
        price: Some(price.to_string()),
        ..TicketOffer::default()
    }
}

#[test]
fn genres_union_most_trusted_first() {
    let tier1 = extraction(
        TrustTier::LinkedData,
        PartialRecord {
            genres: vec!["House".to_string()],
            ..PartialRecord::default()
        },
    );
    let tier3 = extraction(
        TrustTier::DomHeuristic,
        PartialRecord {
            genres: vec!["House".to_string(), "Techno".to_string()],
            ..PartialRecord::default()
        },
    );
    let record = reconcile(&[tier3, tier1]);
    assert_eq!(record.genres, vec!["House", "Techno"]);
    assert_eq!(record.raw_evidence.get("genres"), Some(&TrustTier::LinkedData));
}

#[test]
fn scalar_comes_from_most_trusted_non_empty_tier() {
    let record = reconcile(&[
        extraction(
            TrustTier::DomHeuristic,
            PartialRecord {
                venue_name: Some("Basement Bar".to_string()),
                age_restriction: Some("21+".to_string()),
                ..PartialRecord::default()
            },
        ),
        extraction(
            TrustTier::LinkedData,
            PartialRecord {
                venue_name: Some("   ".to_string()),
                ..PartialRecord::default()
            },
        ),
        extraction(
            TrustTier::EmbeddedState,
            PartialRecord {
                venue_name: Some("Nowadays".to_string()),
                ..PartialRecord::default()
            },
        ),
    ]);
    assert_eq!(record.venue_name.as_deref(), Some("Nowadays"));
    assert_eq!(record.raw_evidence.get("venueName"), Some(&TrustTier::EmbeddedState));
    assert_eq!(record.age_restriction.as_deref(), Some("21+"));
    assert_eq!(record.raw_evidence.get("ageRestriction"), Some(&TrustTier::DomHeuristic));
}

#[test]
fn ticket_offers_are_taken_whole_from_one_tier() {
    let record = reconcile(&[
        extraction(
            TrustTier::LinkedData,
            PartialRecord {
                ticket_offers: vec![offer("General Admission", "25")],
                ..PartialRecord::default()
            },
        ),
        extraction(
            TrustTier::DomHeuristic,
            PartialRecord {
                ticket_offers: vec![offer("GA $25.00", "$25.00"), offer("VIP $60.00", "$60.00")],
                ..PartialRecord::default()
            },
        ),
    ]);
    assert_eq!(record.ticket_offers, vec![offer("General Admission", "25")]);
}

#[test]
fn social_links_merge_per_platform() {
    let mut tier2_links = BTreeMap::new();
    tier2_links.insert("instagram".to_string(), "https://instagram.com/a".to_string());
    let mut tier3_links = BTreeMap::new();
    tier3_links.insert("instagram".to_string(), "https://instagram.com/b".to_string());
    tier3_links.insert("soundcloud".to_string(), "https://soundcloud.com/c".to_string());

    let record = reconcile(&[
        extraction(
            TrustTier::DomHeuristic,
            PartialRecord {
                social_links: tier3_links,
                ..PartialRecord::default()
            },
        ),
        extraction(
            TrustTier::EmbeddedState,
            PartialRecord {
                social_links: tier2_links,
                ..PartialRecord::default()
            },
        ),
    ]);
    assert_eq!(record.social_links["instagram"], "https://instagram.com/a");
    assert_eq!(record.social_links["soundcloud"], "https://soundcloud.com/c");
}

#[test]
fn reconcile_is_idempotent() {
    let input = vec![
        extraction(
            TrustTier::LinkedData,
            PartialRecord {
                description: Some("All night long".to_string()),
                geo: Some(GeoPoint {
                    latitude: 40.7,
                    longitude: -73.9,
                }),
                artists: vec!["DJ Python".to_string()],
                ..PartialRecord::default()
            },
        ),
        extraction(
            TrustTier::DomHeuristic,
            PartialRecord {
                artists: vec!["Anz".to_string(), "DJ Python".to_string()],
                door_time: Some("10:00 PM".to_string()),
                ..PartialRecord::default()
            },
        ),
    ];
    let first = reconcile(&input);
    let second = reconcile(&input);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.artists, vec!["DJ Python", "Anz"]);
}

#[test]
fn empty_input_gives_empty_record() {
    let record = reconcile(&[]);
    assert!(record.is_empty());
    assert_eq!(record, DetailRecord::default());
}

#[test]
fn scalar_is_copied_verbatim_from_winning_tier() {
    let description = "Line one.\n\nLine  two. ";
    let record = reconcile(&[
        extraction(
            TrustTier::DomHeuristic,
            PartialRecord {
                description: Some("Line one. Line two.".to_string()),
                ..PartialRecord::default()
            },
        ),
        extraction(
            TrustTier::LinkedData,
            PartialRecord {
                description: Some(description.to_string()),
                ..PartialRecord::default()
            },
        ),
    ]);
    assert_eq!(record.description.as_deref(), Some(description));
    assert_eq!(record.raw_evidence.get("description"), Some(&TrustTier::LinkedData));
}
