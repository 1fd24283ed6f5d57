//! Tier 2: embedded client state.
//!
//! Pages rendered by Next.js ship their initial data in
//! `<script id="__NEXT_DATA__">`; others assign it to a `window` global. In
//! both cases the interesting part is usually a normalized cache whose
//! entries reference each other (see [`super::resolve`]).

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::resolve::{find_entity, NormalizedCache};
use super::text::{first_text_field, json_text, json_text_list, push_unique};
use super::{DetailOptions, PartialRecord};

static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+id\s*=\s*["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

static STATE_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)window\.(?:__APOLLO_STATE__|__INITIAL_STATE__|__NUXT__)\s*=\s*")
        .expect("valid regex")
});

/// Every embedded state payload on the page that parses as JSON.
///
/// `__NEXT_DATA__` comes first, followed by `window` assignments in document
/// order.
pub(crate) fn embedded_payloads(html: &str) -> Vec<Value> {
    let mut payloads = Vec::new();

    if let Some(body) = NEXT_DATA_RE.captures(html).and_then(|cap| cap.get(1)) {
        match serde_json::from_str::<Value>(body.as_str().trim()) {
            Ok(value) => payloads.push(value),
            Err(err) => tracing::debug!(error = %err, "__NEXT_DATA__ is not valid JSON"),
        }
    }

    for m in STATE_ASSIGNMENT_RE.find_iter(html) {
        let rest = &html[m.end()..];
        let Some(object) = extract_balanced_object(rest) else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<Value>(object) {
            payloads.push(value);
        }
    }

    payloads
}

/// Shortest prefix of `s` that is a complete `{…}` object.
///
/// Tracks brace depth while respecting string literals and escapes. Only a
/// closing `}` at depth zero ends the scan, so `{"a": 1]` is never accepted.
pub(crate) fn extract_balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            ']' => depth -= 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Read the page's event from embedded state.
///
/// Prefers the cache entry `"<prefix><preferred id>"`, then the first entry
/// with the entity prefix. Without a usable cache, falls back to a
/// depth-bounded search for any object with a name and a venue.
pub(crate) fn extract_embedded_state(html: &str, options: &DetailOptions) -> Option<PartialRecord> {
    let payloads = embedded_payloads(html);

    for payload in &payloads {
        let Some(cache) = NormalizedCache::locate(payload, &options.entity_prefix) else {
            continue;
        };
        let Some(key) = pick_entry_key(&cache, options) else {
            continue;
        };
        let Some(Value::Object(entity)) = cache.get(key).map(|v| cache.resolve(v, options.max_depth))
        else {
            continue;
        };
        tracing::debug!(key, "reading event from embedded cache");
        let record = record_from_entity(&entity);
        if !record.is_empty() {
            return Some(record);
        }
    }

    payloads.iter().find_map(|payload| {
        let root = payload.get("props").unwrap_or(payload);
        let entity = find_entity(root, options.max_depth)?;
        let record = record_from_entity(entity);
        (!record.is_empty()).then_some(record)
    })
}

fn pick_entry_key<'a>(cache: &NormalizedCache<'a>, options: &DetailOptions) -> Option<&'a str> {
    if let Some(id) = options.preferred_id.as_deref() {
        let preferred = format!("{}{id}", options.entity_prefix);
        if let Some((key, _)) = cache
            .entries_with_prefix(&options.entity_prefix)
            .find(|(key, _)| *key == preferred)
        {
            return Some(key);
        }
    }
    cache
        .entries_with_prefix(&options.entity_prefix)
        .next()
        .map(|(key, _)| key)
}

/// Map a resolved event object onto a partial record.
///
/// Field names cover the shapes seen on club-listing sites: `content` and
/// `lineup` for the running order, `flyerFront` or `images` for artwork,
/// `promoters` for the organizer.
pub(crate) fn record_from_entity(entity: &Map<String, Value>) -> PartialRecord {
    let mut record = PartialRecord {
        description: first_text_field(entity, &["description", "about", "blurb"]),
        lineup: first_text_field(entity, &["lineup", "content"]),
        cost: first_text_field(entity, &["cost", "price"]),
        door_time: first_text_field(entity, &["doorTime", "doorsOpen"]),
        start_time: first_text_field(entity, &["startTime", "startDate", "date"]),
        end_time: first_text_field(entity, &["endTime", "endDate"]),
        event_type: first_text_field(entity, &["eventType", "type"]),
        venue_name: entity.get("venue").and_then(name_of),
        venue_address: entity
            .get("venue")
            .and_then(Value::as_object)
            .and_then(|venue| first_text_field(venue, &["address"])),
        image_url: first_text_field(entity, &["flyerFront", "image", "imageUrl"])
            .or_else(|| entity.get("images").and_then(first_listed)),
        organizer: ["promoters", "promoter", "organizer"]
            .iter()
            .filter_map(|key| entity.get(*key))
            .map(json_text_list)
            .find(|names| !names.is_empty())
            .map(|names| names.join(", ")),
        age_restriction: entity
            .get("minimumAge")
            .and_then(json_text)
            .map(|age| format!("{age}+"))
            .or_else(|| first_text_field(entity, &["ageRestriction", "age"])),
        ..PartialRecord::default()
    };

    for key in ["artists", "performers"] {
        if let Some(value) = entity.get(key) {
            for name in json_text_list(value) {
                push_unique(&mut record.artists, name);
            }
        }
    }
    if let Some(value) = entity.get("genres") {
        for name in json_text_list(value) {
            push_unique(&mut record.genres, name);
        }
    }

    record
}

/// A resolved reference is already a name; an inlined object carries one.
fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => first_text_field(obj, &["name", "title"]),
        other => json_text(other),
    }
}

fn first_listed(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::Object(obj) => first_text_field(obj, &["filename", "url"]),
            other => json_text(other),
        }),
        other => json_text(other),
    }
}
