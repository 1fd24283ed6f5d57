//! Reference resolution over a normalized client-state cache.
//!
//! Client-side GraphQL caches store every entity once, keyed by
//! `"<Type>:<id>"`, and point at each other with `{"__ref": "<key>"}` (or a
//! lone `{"ref": "<key>"}`). Resolving an entity inlines those references so
//! the extractor can read `venue` as a name rather than a key.

use serde_json::{Map, Value};

/// Value substituted for a reference whose target is not in the cache.
pub const UNKNOWN: &str = "Unknown";

/// Depth bound for reference inlining and for the entity search.
pub const MAX_RESOLVE_DEPTH: usize = 5;

/// Fields that stand in for a whole referenced entity, in priority order.
const RELEVANT_FIELDS: [&str; 3] = ["name", "filename", "title"];

/// Locations of the cache inside a page's embedded state payload.
const CACHE_POINTERS: [&str; 4] = [
    "/props/apolloState",
    "/props/pageProps/apolloState",
    "/props/pageProps/initialApolloState",
    "/apolloState",
];

/// A read-only view over a normalized entity cache.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedCache<'a> {
    entries: &'a Map<String, Value>,
}

impl<'a> NormalizedCache<'a> {
    #[must_use]
    pub fn new(entries: &'a Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Find the cache inside an embedded state payload.
    ///
    /// Known payload paths are tried first. A payload that is itself a cache
    /// (any top-level key starts with `entity_prefix`) is accepted as-is.
    #[must_use]
    pub fn locate(payload: &'a Value, entity_prefix: &str) -> Option<Self> {
        for pointer in CACHE_POINTERS {
            if let Some(entries) = payload.pointer(pointer).and_then(Value::as_object) {
                return Some(Self::new(entries));
            }
        }
        payload
            .as_object()
            .filter(|map| map.keys().any(|key| key.starts_with(entity_prefix)))
            .map(Self::new)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries.get(key)
    }

    /// Entries whose key starts with `prefix`, in cache key order.
    pub fn entries_with_prefix<'p>(
        &self,
        prefix: &'p str,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> + 'p
    where
        'a: 'p,
    {
        self.entries
            .iter()
            .filter(move |(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Resolve the entry stored under `key` with all references inlined.
    #[must_use]
    pub fn resolve_entry(&self, key: &str) -> Option<Value> {
        self.get(key).map(|value| self.resolve(value, MAX_RESOLVE_DEPTH))
    }

    /// Inline references inside `value`, descending at most `max_depth`
    /// levels.
    ///
    /// A reference to an entity with a name, filename or title becomes that
    /// string. A reference to any other entity becomes the entity itself,
    /// resolved in turn. A dangling reference becomes [`UNKNOWN`]. Below the
    /// depth bound values are returned unresolved.
    #[must_use]
    pub fn resolve(&self, value: &Value, max_depth: usize) -> Value {
        self.resolve_at(value, 0, max_depth)
    }

    fn resolve_at(&self, value: &Value, depth: usize, max_depth: usize) -> Value {
        if depth > max_depth {
            return value.clone();
        }

        if let Some(key) = reference_key(value) {
            let Some(target) = self.get(key) else {
                tracing::debug!(key, "dangling cache reference");
                return Value::String(UNKNOWN.to_string());
            };
            if let Some(summary) = relevant_field(target) {
                return Value::String(summary.to_string());
            }
            return self.resolve_at(target, depth + 1, max_depth);
        }

        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_at(v, depth + 1, max_depth)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_at(item, depth + 1, max_depth))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// The cache key a reference placeholder points at.
///
/// Accepts `{"__ref": key, ...}` and the single-field `{"ref": key}`.
#[must_use]
pub fn reference_key(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    if let Some(key) = obj.get("__ref").and_then(Value::as_str) {
        return Some(key);
    }
    if obj.len() == 1 {
        return obj.get("ref").and_then(Value::as_str);
    }
    None
}

fn relevant_field(target: &Value) -> Option<&str> {
    let obj = target.as_object()?;
    RELEVANT_FIELDS
        .iter()
        .find_map(|field| obj.get(*field).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

/// Depth-bounded search for the first object that looks like an event
/// (has both a `name` and a `venue`).
///
/// Used when a page carries state but no recognizable cache. Arrays and
/// objects are searched in document order; the search stops descending
/// below `max_depth`.
#[must_use]
pub fn find_entity(value: &Value, max_depth: usize) -> Option<&Map<String, Value>> {
    find_entity_at(value, 0, max_depth)
}

fn find_entity_at(value: &Value, depth: usize, max_depth: usize) -> Option<&Map<String, Value>> {
    if depth > max_depth {
        return None;
    }
    match value {
        Value::Object(map) => {
            if looks_like_entity(map) {
                return Some(map);
            }
            map.values()
                .find_map(|child| find_entity_at(child, depth + 1, max_depth))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|child| find_entity_at(child, depth + 1, max_depth)),
        _ => None,
    }
}

fn looks_like_entity(map: &Map<String, Value>) -> bool {
    let present = |key: &str| map.get(key).is_some_and(|v| !v.is_null());
    present("name") && present("venue")
}
