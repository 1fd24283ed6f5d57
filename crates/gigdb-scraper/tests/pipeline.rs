//! End-to-end listing, detail, and re-extraction runs over a scripted
//! browser and a temporary output directory.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use gigdb_core::{ListingRecord, SiteConfig, TrustTier};
use gigdb_scraper::sink::read_enriched;
use gigdb_scraper::{
    collect_listings, reextract, run_details, run_listings, ClickTarget, JsonFileSink,
    PageSession, PageSnapshot, RecordSink, RetryPolicy, RunSettings, SessionError,
};

/// Serves canned pages by URL. Each page is a list of stages; a click
/// advances the open page to its next stage.
#[derive(Default)]
struct ScriptedBrowser {
    pages: HashMap<String, Vec<String>>,
    failing: Vec<String>,
    current: Option<(String, usize)>,
    opened: Vec<String>,
}

impl ScriptedBrowser {
    fn page(mut self, url: &str, stages: Vec<String>) -> Self {
        self.pages.insert(url.to_string(), stages);
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }
}

impl PageSession for ScriptedBrowser {
    async fn open(&mut self, url: &str) -> Result<(), SessionError> {
        self.opened.push(url.to_string());
        self.current = None;
        if self.failing.iter().any(|u| u == url) {
            return Err(SessionError::UnexpectedStatus {
                status: 500,
                url: url.to_string(),
            });
        }
        if !self.pages.contains_key(url) {
            return Err(SessionError::UnexpectedStatus {
                status: 404,
                url: url.to_string(),
            });
        }
        self.current = Some((url.to_string(), 0));
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, SessionError> {
        let (url, stage) = self.current.clone().ok_or(SessionError::NoPage)?;
        Ok(PageSnapshot {
            html: self.pages[&url][stage].clone(),
            url,
        })
    }

    async fn click(&mut self, _target: &ClickTarget) -> Result<(), SessionError> {
        let (url, stage) = self.current.as_mut().ok_or(SessionError::NoPage)?;
        let last = self.pages[url.as_str()].len() - 1;
        *stage = (*stage + 1).min(last);
        Ok(())
    }
}

fn site(target_date: Option<NaiveDate>) -> SiteConfig {
    SiteConfig {
        name: "Club Nights".to_string(),
        base_url: "https://club.test".to_string(),
        listing_path: "/events".to_string(),
        city: None,
        category: None,
        target_date,
        entity_prefix: "Event:".to_string(),
        card_selectors: Vec::new(),
        genre_keywords: Vec::new(),
        known_venues: Vec::new(),
    }
}

fn settings() -> RunSettings {
    RunSettings {
        settle_delay: Duration::ZERO,
        detail_cooldown: Duration::ZERO,
        max_load_more_clicks: 20,
        retry: RetryPolicy {
            max_retries: 1,
            backoff_base_secs: 0,
        },
        reference_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
        detail_limit: None,
    }
}

fn card(id: u32, title: &str) -> String {
    format!(r#"<a href="/events/{id}"><h3>{title}</h3><span>Sat, Dec 6</span></a>"#)
}

fn listing_stages() -> Vec<String> {
    let sections = [
        ("Mon 1 Dec", card(1, "Warehouse Rave Night")),
        ("Mon 8 Dec", card(2, "Rooftop Disco Social")),
        ("Mon 22 Dec", card(3, "Midnight Sessions Vol 4")),
    ];
    (1..=sections.len())
        .map(|shown| {
            let mut html = String::from("<html><body>");
            for (heading, card) in &sections[..shown] {
                html.push_str(&format!("<h2>{heading}</h2>{card}"));
            }
            if shown < sections.len() {
                html.push_str("<button>Load more</button>");
            }
            html.push_str("</body></html>");
            html
        })
        .collect()
}

fn detail_page(venue: &str) -> String {
    format!(
        r#"<html><head><script type="application/ld+json">
        {{"@context": "https://schema.org", "@type": "MusicEvent",
          "name": "Warehouse Rave Night",
          "location": {{"@type": "Place", "name": "{venue}"}},
          "performer": [{{"@type": "Person", "name": "DJ Python"}}]}}
        </script></head><body><p>Doors 10:00 PM</p></body></html>"#
    )
}

fn listing(id: &str, url: Option<&str>) -> ListingRecord {
    ListingRecord {
        identity: url.map_or_else(|| id.to_string(), str::to_string),
        title: Some(format!("Event {id}")),
        detail_url: url.map(str::to_string),
        ..ListingRecord::default()
    }
}

#[tokio::test]
async fn listing_run_expands_until_target_and_writes_worklist() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::new(dir.path());
    let mut browser = ScriptedBrowser::default().page("https://club.test/events", listing_stages());
    let site = site(NaiveDate::from_ymd_opt(2025, 12, 20));

    let records = run_listings(&mut browser, &site, &settings(), &sink).await.unwrap();

    let urls: Vec<_> = records.iter().filter_map(|r| r.detail_url.as_deref()).collect();
    assert_eq!(
        urls,
        vec![
            "https://club.test/events/1",
            "https://club.test/events/2",
            "https://club.test/events/3",
        ]
    );
    assert_eq!(records[0].title.as_deref(), Some("Warehouse Rave Night"));
    assert_eq!(sink.read_listings("club-nights").unwrap(), records);
}

#[tokio::test]
async fn listing_without_target_date_is_snapshotted_once() {
    let mut browser = ScriptedBrowser::default().page("https://club.test/events", listing_stages());

    let records = collect_listings(&mut browser, &site(None), &settings()).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(browser.current, Some(("https://club.test/events".to_string(), 0)));
}

#[tokio::test]
async fn listing_page_failure_is_returned() {
    let mut browser = ScriptedBrowser::default().failing("https://club.test/events");
    let err = collect_listings(&mut browser, &site(None), &settings()).await.unwrap_err();
    assert!(!err.is_worklist_missing());
    // One try plus one retry.
    assert_eq!(browser.opened.len(), 2);
}

#[tokio::test]
async fn detail_run_without_worklist_touches_no_page() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::new(dir.path());
    let mut browser = ScriptedBrowser::default();

    let err = run_details(&mut browser, &site(None), &settings(), &sink)
        .await
        .unwrap_err();

    assert!(err.is_worklist_missing());
    assert!(browser.opened.is_empty());
    assert!(!sink.details_path("club-nights").exists());
}

#[tokio::test]
async fn detail_run_keeps_going_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::new(dir.path());
    sink.write_listings(
        "club-nights",
        &[
            listing("1", Some("https://club.test/events/1")),
            listing("2", Some("https://club.test/events/2")),
            listing("card-0", None),
            listing("1-again", Some("https://club.test/events/1/")),
        ],
    )
    .unwrap();

    let mut browser = ScriptedBrowser::default()
        .page("https://club.test/events/1", vec![detail_page("Nowadays")])
        .failing("https://club.test/events/2");

    let summary = run_details(&mut browser, &site(None), &settings(), &sink)
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.enriched, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);

    let lines = read_enriched(&sink.details_path("club-nights")).unwrap();
    assert_eq!(lines.len(), 3);

    let first = &lines[0];
    let detail = first.detail.as_ref().expect("first entity enriched");
    assert_eq!(detail.venue_name.as_deref(), Some("Nowadays"));
    assert_eq!(detail.artists, vec!["DJ Python"]);
    assert_eq!(detail.raw_evidence.get("venueName"), Some(&TrustTier::LinkedData));
    assert_eq!(first.listing.venue.as_deref(), Some("Nowadays"));
    let snapshot = first.snapshot_path.as_deref().expect("snapshot saved");
    assert!(dir.path().join(snapshot).exists());

    let second = &lines[1];
    assert!(second.detail.is_none());
    assert!(second
        .enrichment_error
        .as_deref()
        .is_some_and(|e| e.contains("500")));
    assert_eq!(second.listing.title.as_deref(), Some("Event 2"));

    assert!(lines[2].detail.is_none());
    assert!(lines[2].listing.detail_url.is_none());
}

#[tokio::test]
async fn detail_limit_caps_processed_entities() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::new(dir.path());
    sink.write_listings(
        "club-nights",
        &[
            listing("1", Some("https://club.test/events/1")),
            listing("2", Some("https://club.test/events/2")),
        ],
    )
    .unwrap();
    let mut browser =
        ScriptedBrowser::default().page("https://club.test/events/1", vec![detail_page("Nowadays")]);

    let summary = run_details(
        &mut browser,
        &site(None),
        &settings().with_detail_limit(Some(1)),
        &sink,
    )
    .await
    .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(browser.opened, vec!["https://club.test/events/1"]);
}

#[tokio::test]
async fn reextract_replays_saved_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::new(dir.path());
    sink.write_listings(
        "club-nights",
        &[
            listing("1", Some("https://club.test/events/1")),
            listing("2", Some("https://club.test/events/2")),
        ],
    )
    .unwrap();
    sink.save_snapshot("club-nights", "https://club.test/events/1", &detail_page("Public Records"))
        .unwrap();

    let summary = reextract(&site(None), &sink).unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.enriched, 1);
    assert_eq!(summary.skipped, 1);
    let lines = read_enriched(&sink.details_path("club-nights")).unwrap();
    assert_eq!(
        lines[0].detail.as_ref().and_then(|d| d.venue_name.as_deref()),
        Some("Public Records")
    );
    assert_eq!(
        lines[1].enrichment_error.as_deref(),
        Some("no saved snapshot")
    );
}
