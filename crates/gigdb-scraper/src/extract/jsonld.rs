//! Tier 1: schema.org linked data.

use std::sync::LazyLock;

use gigdb_core::{GeoPoint, TicketOffer};
use regex::Regex;
use serde_json::Value;

use super::text::{first_text_field, json_f64, json_text, json_text_list, push_unique};
use super::PartialRecord;

static LD_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

const EVENT_TYPES: [&str; 2] = ["Event", "MusicEvent"];

const SCHEMA_PREFIXES: [&str; 2] = ["https://schema.org/", "http://schema.org/"];

/// Read event fields from `<script type="application/ld+json">` blocks.
///
/// Blocks may hold one object, an array, or a `@graph` container. Malformed
/// blocks are skipped. When several event nodes are present the first one to
/// supply a field wins.
pub(crate) fn extract_linked_data(html: &str) -> Option<PartialRecord> {
    let mut record = PartialRecord::default();
    let mut matched = false;

    for cap in LD_SCRIPT_RE.captures_iter(html) {
        let Some(body) = cap.get(1) else { continue };
        let value: Value = match serde_json::from_str(body.as_str().trim()) {
            Ok(v) => v,
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed linked-data block");
                continue;
            }
        };

        for node in event_nodes(&value) {
            matched = true;
            fill_from_event(&mut record, node);
        }
    }

    (matched && !record.is_empty()).then_some(record)
}

fn event_nodes(value: &Value) -> Vec<&serde_json::Map<String, Value>> {
    let mut candidates: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let graph: Vec<&Value> = candidates
        .iter()
        .filter_map(|item| item.get("@graph").and_then(Value::as_array))
        .flatten()
        .collect();
    candidates.extend(graph);

    candidates
        .into_iter()
        .filter_map(Value::as_object)
        .filter(|obj| obj.get("@type").is_some_and(is_event_type))
        .collect()
}

/// `@type` may be a plain string or an array of strings.
fn is_event_type(type_node: &Value) -> bool {
    let matches = |s: &str| EVENT_TYPES.iter().any(|t| s.eq_ignore_ascii_case(t));
    match type_node {
        Value::String(s) => matches(s.as_str()),
        Value::Array(items) => items.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn fill_from_event(record: &mut PartialRecord, event: &serde_json::Map<String, Value>) {
    set_if_empty(&mut record.description, first_text_field(event, &["description"]));
    set_if_empty(&mut record.start_time, first_text_field(event, &["startDate"]));
    set_if_empty(&mut record.end_time, first_text_field(event, &["endDate"]));
    set_if_empty(&mut record.door_time, first_text_field(event, &["doorTime"]));
    set_if_empty(
        &mut record.age_restriction,
        first_text_field(event, &["typicalAgeRange"]),
    );
    set_if_empty(&mut record.image_url, event.get("image").and_then(image_url));
    set_if_empty(&mut record.organizer, event.get("organizer").and_then(named));

    if let Some(location) = event.get("location").and_then(first_object) {
        set_if_empty(&mut record.venue_name, first_text_field(location, &["name"]));
        set_if_empty(
            &mut record.venue_address,
            location.get("address").and_then(postal_address),
        );
        if record.geo.is_none() {
            record.geo = location.get("geo").and_then(geo_point);
        }
    }

    if record.artists.is_empty() {
        if let Some(performer) = event.get("performer") {
            for name in json_text_list(performer) {
                push_unique(&mut record.artists, name);
            }
        }
    }

    if record.ticket_offers.is_empty() {
        if let Some(offers) = event.get("offers") {
            record.ticket_offers = ticket_offers(offers);
        }
    }
}

fn set_if_empty(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn first_object(value: &Value) -> Option<&serde_json::Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().find_map(Value::as_object),
        other => other.as_object(),
    }
}

/// `image` may be a URL, an `ImageObject`, or an array of either.
fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(image_url),
        Value::Object(obj) => first_text_field(obj, &["url", "contentUrl"]),
        other => json_text(other),
    }
}

/// Name of an `Organization`/`Person`, or the value itself when it is a
/// plain string.
fn named(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(named),
        Value::Object(obj) => first_text_field(obj, &["name"]),
        other => json_text(other),
    }
}

/// A free-form address string, or a `PostalAddress` joined with commas.
fn postal_address(value: &Value) -> Option<String> {
    let Value::Object(obj) = value else {
        return json_text(value);
    };
    let parts: Vec<String> = [
        "streetAddress",
        "addressLocality",
        "addressRegion",
        "postalCode",
    ]
    .iter()
    .filter_map(|key| obj.get(*key).and_then(json_text))
    .chain(obj.get("addressCountry").and_then(named))
    .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Latitude and longitude may be numbers or numeric strings.
fn geo_point(value: &Value) -> Option<GeoPoint> {
    let latitude = value.get("latitude").and_then(json_f64)?;
    let longitude = value.get("longitude").and_then(json_f64)?;
    Some(GeoPoint {
        latitude,
        longitude,
    })
}

/// `offers` may be a single `Offer`, an array, or an `AggregateOffer` with
/// nested offers.
fn ticket_offers(value: &Value) -> Vec<TicketOffer> {
    match value {
        Value::Array(items) => items.iter().flat_map(ticket_offers).collect(),
        Value::Object(obj) => {
            if let Some(nested) = obj.get("offers") {
                let inner = ticket_offers(nested);
                if !inner.is_empty() {
                    return inner;
                }
            }
            let offer = TicketOffer {
                name: first_text_field(obj, &["name"]),
                price: first_text_field(obj, &["price", "lowPrice"]),
                currency: first_text_field(obj, &["priceCurrency"]),
                availability: first_text_field(obj, &["availability"])
                    .map(|a| strip_schema_prefix(&a)),
                valid_from: first_text_field(obj, &["validFrom"]),
                url: first_text_field(obj, &["url"]),
            };
            if offer == TicketOffer::default() {
                Vec::new()
            } else {
                vec![offer]
            }
        }
        _ => Vec::new(),
    }
}

fn strip_schema_prefix(value: &str) -> String {
    SCHEMA_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .unwrap_or(value)
        .to_string()
}
