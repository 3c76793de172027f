//! Decoded query parameters.
//!
//! The HTTP layer hands the engine a JSON object. For callers that only have
//! flat `key=value` pairs (the CLI, tests), [`QueryParams::from_pairs`] decodes
//! bracketed keys into nested objects:
//!
//! ```text
//! filter[title][like]=New   ->  {"filter": {"title": {"like": "New"}}}
//! ```
//!
//! A key written twice, or a leaf colliding with a nested key, turns the slot
//! into an array. Arrays are never valid parameter values, so the parser
//! rejects them as malformed.

use serde_json::{Map, Value};

/// A decoded query-parameter object. Insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(Map<String, Value>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `key=value` pairs with bracketed keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key.as_ref(), value);
        }
        params
    }

    /// Insert a single bracketed key.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let segments = split_key(key);
        insert_path(&mut self.0, &segments, Value::String(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for QueryParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// `filter[title][like]` -> `["filter", "title", "like"]`.
///
/// A key whose brackets don't close is kept whole.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return vec![key.to_string()];
        };
        let Some(close) = inner.find(']') else {
            return vec![key.to_string()];
        };
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    segments
}

fn insert_path(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        match map.get_mut(head) {
            Some(existing) => collide(existing, value),
            None => {
                map.insert(head.clone(), value);
            }
        }
        return;
    }

    let slot = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(inner) => insert_path(inner, rest, value),
        other => collide(other, value),
    }
}

fn collide(slot: &mut Value, value: Value) {
    match slot {
        Value::Array(items) => items.push(value),
        other => {
            let previous = other.take();
            *other = Value::Array(vec![previous, value]);
        }
    }
}
