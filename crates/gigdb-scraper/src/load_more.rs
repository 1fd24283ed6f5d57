//! Incremental-load controller for listing pages.
//!
//! Listing pages render a first batch of events and a "load more" button.
//! The controller keeps clicking until the most recently rendered date
//! heading reaches the target date, the button disappears, the page stops
//! cooperating, or the safety bound is hit.
//!
//! ```text
//! LOADING ──click──▶ CHECK ──marker < target──▶ LOADING
//!    │                 │
//!    │ no button       │ marker >= target / safety bound
//!    ▼                 ▼
//!   DONE ◀─────────────┘
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::{Html, Selector};

use crate::extract::listing::DEFAULT_CARD_SELECTORS;
use crate::session::{ClickTarget, PageSession, PageSnapshot, INTERACTIVE_SELECTOR};

/// Text fragments that identify a load-more control (matched lowercase).
pub const LOAD_MORE_PHRASES: [&str; 4] = ["view more", "load more", "show more", "see more"];

/// Default cap on load-more iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

const HEADING_SELECTOR: &str = "h1, h2, h3, h4";

static INTERACTIVE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(INTERACTIVE_SELECTOR).expect("valid selector"));

static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(HEADING_SELECTOR).expect("valid selector"));

/// "Dec 6", "December 12", "Sat, Dec 6".
static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})\b",
    )
    .expect("valid regex")
});

/// "6 Dec", "Mon 1 Dec".
static DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b",
    )
    .expect("valid regex")
});

/// Full-text fallback: a weekday followed by a month and day.
static FULL_TEXT_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*,?\s+(?:(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}|\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*)\b",
    )
    .expect("valid regex")
});

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    Check,
    Done,
}

/// Why the controller reached `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// No load-more control was found.
    Exhausted,
    /// The latest date marker met or passed the target date.
    TargetReached,
    /// The iteration cap was hit first.
    SafetyBound,
    /// Locating, clicking, or snapshotting failed; treated as finished.
    LoaderFailed(String),
}

/// A month/day heading as rendered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMarker {
    pub text: String,
    pub month: u32,
    pub day: u32,
}

impl DateMarker {
    /// Parse the first month/day pair in `text`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (month, day) = if let Some(cap) = MONTH_DAY_RE.captures(text) {
            (month_number(&cap[1])?, cap[2].parse().ok()?)
        } else {
            let cap = DAY_MONTH_RE.captures(text)?;
            (month_number(&cap[2])?, cap[1].parse().ok()?)
        };
        if !(1..=31).contains(&day) {
            return None;
        }
        Some(Self {
            text: text.trim().to_string(),
            month,
            day,
        })
    }

    /// Calendar date of this marker, seen on `reference`.
    ///
    /// Listing pages run forward from today, so a month earlier than the
    /// reference month belongs to the following year.
    #[must_use]
    pub fn resolve(&self, reference: NaiveDate) -> Option<NaiveDate> {
        let year = if self.month < reference.month() {
            reference.year() + 1
        } else {
            reference.year()
        };
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }

    /// Whether this marker is on or after `target`.
    #[must_use]
    pub fn reaches(&self, target: NaiveDate, reference: NaiveDate) -> bool {
        self.resolve(reference).is_some_and(|date| date >= target)
    }
}

fn month_number(abbrev: &str) -> Option<u32> {
    let month = match abbrev.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Controller settings for one listing session.
#[derive(Debug, Clone)]
pub struct LoadMoreSettings {
    pub target_date: NaiveDate,
    /// Date the run happens on; anchors year inference for markers.
    pub reference_date: NaiveDate,
    /// Wait after each click for new content to render.
    pub settle_delay: Duration,
    pub max_iterations: u32,
}

/// Observable controller state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadState {
    pub clicks_performed: u32,
    pub last_observed_date_marker: Option<DateMarker>,
    pub done: bool,
    pub stop_reason: Option<StopReason>,
}

impl LoadState {
    fn finish(&mut self, reason: StopReason) -> LoadPhase {
        self.done = true;
        self.stop_reason = Some(reason);
        LoadPhase::Done
    }
}

/// Drive `session` through load-more cycles on the page it has open.
///
/// Never fails: every problem ends the loop and is reported through
/// [`LoadState::stop_reason`].
pub async fn run_load_more<S: PageSession>(session: &mut S, settings: &LoadMoreSettings) -> LoadState {
    let mut state = LoadState::default();
    let mut phase = LoadPhase::Loading;
    let mut current: Option<PageSnapshot> = None;

    loop {
        phase = match phase {
            LoadPhase::Loading => loading(session, settings, &mut state, &mut current).await,
            LoadPhase::Check => check(session, settings, &mut state, &mut current).await,
            LoadPhase::Done => break,
        };
    }

    match &state.stop_reason {
        Some(StopReason::SafetyBound) => tracing::warn!(
            clicks = state.clicks_performed,
            max_iterations = settings.max_iterations,
            "load-more safety bound reached before target date"
        ),
        Some(StopReason::LoaderFailed(reason)) => tracing::info!(
            clicks = state.clicks_performed,
            reason = %reason,
            "load-more interaction failed; treating as finished"
        ),
        reason => tracing::info!(
            clicks = state.clicks_performed,
            ?reason,
            marker = state.last_observed_date_marker.as_ref().map(|m| m.text.as_str()),
            "load-more finished"
        ),
    }

    state
}

async fn loading<S: PageSession>(
    session: &mut S,
    settings: &LoadMoreSettings,
    state: &mut LoadState,
    current: &mut Option<PageSnapshot>,
) -> LoadPhase {
    let snapshot = match current.take() {
        Some(snapshot) => snapshot,
        None => match session.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => return state.finish(StopReason::LoaderFailed(err.to_string())),
        },
    };

    let Some(target) = find_load_more(&snapshot.html) else {
        return state.finish(StopReason::Exhausted);
    };
    if state.clicks_performed >= settings.max_iterations {
        return state.finish(StopReason::SafetyBound);
    }

    tracing::debug!(index = target.index, text = %target.text, "clicking load-more");
    if let Err(err) = session.click(&target).await {
        return state.finish(StopReason::LoaderFailed(err.to_string()));
    }
    if !settings.settle_delay.is_zero() {
        tokio::time::sleep(settings.settle_delay).await;
    }
    state.clicks_performed += 1;
    LoadPhase::Check
}

async fn check<S: PageSession>(
    session: &mut S,
    settings: &LoadMoreSettings,
    state: &mut LoadState,
    current: &mut Option<PageSnapshot>,
) -> LoadPhase {
    let snapshot = match session.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(err) => return state.finish(StopReason::LoaderFailed(err.to_string())),
    };

    if let Some(marker) = latest_date_marker(&snapshot.html) {
        let reached = marker.reaches(settings.target_date, settings.reference_date);
        tracing::debug!(marker = %marker.text, reached, "load-more check");
        state.last_observed_date_marker = Some(marker);
        if reached {
            return state.finish(StopReason::TargetReached);
        }
    }

    if state.clicks_performed >= settings.max_iterations {
        return state.finish(StopReason::SafetyBound);
    }

    *current = Some(snapshot);
    LoadPhase::Loading
}

/// First interactive element whose text contains a load-more phrase.
#[must_use]
pub fn find_load_more(html: &str) -> Option<ClickTarget> {
    let document = Html::parse_document(html);
    document
        .select(&INTERACTIVE)
        .enumerate()
        .find_map(|(index, el)| {
            let text = el.text().collect::<Vec<_>>().join(" ");
            let lowered = text.to_lowercase();
            LOAD_MORE_PHRASES
                .iter()
                .any(|phrase| lowered.contains(phrase))
                .then(|| ClickTarget {
                    index,
                    text: text.split_whitespace().collect::<Vec<_>>().join(" "),
                })
        })
}

/// The last date heading on the page, else the last weekday-led date
/// anywhere in the text.
#[must_use]
pub fn latest_date_marker(html: &str) -> Option<DateMarker> {
    let document = Html::parse_document(html);

    let from_headings = document
        .select(&HEADINGS)
        .filter_map(|heading| DateMarker::parse(&heading.text().collect::<Vec<_>>().join(" ")))
        .last();
    if from_headings.is_some() {
        return from_headings;
    }

    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    FULL_TEXT_DATE_RE
        .find_iter(&text)
        .last()
        .and_then(|m| DateMarker::parse(m.as_str()))
}

/// Rough count of cards currently rendered, for progress logs.
#[must_use]
pub fn rendered_card_count(html: &str) -> usize {
    let document = Html::parse_document(html);
    DEFAULT_CARD_SELECTORS
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .map(|selector| document.select(&selector).count())
        .find(|count| *count > 0)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "load_more_test.rs"]
mod tests;
