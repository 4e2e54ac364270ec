//! Case-insensitive, order-preserving header container.

use indexmap::IndexMap;
use regex::Regex;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::headers::parse::{format_header_name, is_valid_header_name, parse_raw_headers, parse_tokens};
use crate::headers::value::HeaderValue;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    /// Display name: first-seen casing, or Title-Case after `normalize(true)`.
    name: String,
    value: HeaderValue,
}

/// Request or response headers.
///
/// Entries are keyed by the trimmed, lower-cased name, so at most one entry
/// exists per case-insensitive name. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: IndexMap<String, Entry>,
}

/// Anything that can be applied onto a container in one call.
#[derive(Debug, Clone)]
pub enum HeaderSource {
    Pairs(Vec<(String, HeaderValue)>),
    Headers(Headers),
    /// Raw `Name: value` block. A lone valid header name is ignored.
    Raw(String),
}

impl From<Headers> for HeaderSource {
    fn from(headers: Headers) -> Self {
        HeaderSource::Headers(headers)
    }
}

impl From<&Headers> for HeaderSource {
    fn from(headers: &Headers) -> Self {
        HeaderSource::Headers(headers.clone())
    }
}

impl From<&str> for HeaderSource {
    fn from(raw: &str) -> Self {
        HeaderSource::Raw(raw.to_string())
    }
}

impl From<String> for HeaderSource {
    fn from(raw: String) -> Self {
        HeaderSource::Raw(raw)
    }
}

impl<K: Into<String>, V: Into<HeaderValue>> From<Vec<(K, V)>> for HeaderSource {
    fn from(pairs: Vec<(K, V)>) -> Self {
        HeaderSource::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<HeaderValue>, const N: usize> From<[(K, V); N]> for HeaderSource {
    fn from(pairs: [(K, V); N]) -> Self {
        HeaderSource::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Predicate over a header value and its display name.
pub type HeaderPredicate = Arc<dyn Fn(&HeaderValue, &str) -> bool + Send + Sync>;

/// Filter used by `has_matching`, `delete_matching` and `clear_matching`.
#[derive(Clone)]
pub enum HeaderMatcher {
    /// Substring match.
    Contains(String),
    Pattern(Regex),
    Predicate(HeaderPredicate),
}

impl HeaderMatcher {
    pub fn predicate(f: impl Fn(&HeaderValue, &str) -> bool + Send + Sync + 'static) -> Self {
        HeaderMatcher::Predicate(Arc::new(f))
    }

    fn matches_text(&self, text: &str) -> bool {
        match self {
            HeaderMatcher::Contains(needle) => text.contains(needle.as_str()),
            HeaderMatcher::Pattern(re) => re.is_match(text),
            HeaderMatcher::Predicate(_) => false,
        }
    }

    fn matches_value(&self, value: &HeaderValue, name: &str) -> bool {
        match (self, value) {
            (HeaderMatcher::Predicate(f), _) => f(value, name),
            (_, HeaderValue::Single(s)) => self.matches_text(s),
            _ => false,
        }
    }

    fn matches_name(&self, value: &HeaderValue, name: &str) -> bool {
        match self {
            HeaderMatcher::Predicate(f) => f(value, name),
            _ => self.matches_text(name),
        }
    }
}

impl fmt::Debug for HeaderMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderMatcher::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            HeaderMatcher::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            HeaderMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for HeaderMatcher {
    fn from(s: &str) -> Self {
        HeaderMatcher::Contains(s.to_string())
    }
}

impl From<Regex> for HeaderMatcher {
    fn from(re: Regex) -> Self {
        HeaderMatcher::Pattern(re)
    }
}

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a raw `Name: value` block.
    pub fn from_raw(raw: &str) -> Self {
        let mut headers = Self::new();
        headers.apply(raw, None);
        headers
    }

    /// Set with the default overwrite policy: replaces anything but `Disabled`.
    pub fn set(&mut self, name: &str, value: impl Into<HeaderValue>) -> &mut Self {
        self.write(name, value.into(), None);
        self
    }

    /// Set with an explicit overwrite policy.
    ///
    /// Writes when the name is absent, when `overwrite` is `Some(true)`, or when
    /// `overwrite` is `None` and the stored value is not `Disabled`.
    pub fn set_with(
        &mut self,
        name: &str,
        value: impl Into<HeaderValue>,
        overwrite: Option<bool>,
    ) -> &mut Self {
        self.write(name, value.into(), overwrite);
        self
    }

    /// Apply pairs, another container, or a raw header block.
    pub fn apply(&mut self, source: impl Into<HeaderSource>, overwrite: Option<bool>) -> &mut Self {
        match source.into() {
            HeaderSource::Pairs(pairs) => {
                for (name, value) in pairs {
                    self.write(&name, value, overwrite);
                }
            }
            HeaderSource::Headers(other) => {
                for entry in other.entries.into_values() {
                    self.write(&entry.name, entry.value, overwrite);
                }
            }
            HeaderSource::Raw(raw) => {
                let raw = raw.trim();
                if !raw.is_empty() && !is_valid_header_name(raw) {
                    for (name, value) in parse_raw_headers(raw) {
                        self.write(&name, value, overwrite);
                    }
                }
            }
        }
        self
    }

    fn write(&mut self, name: &str, value: HeaderValue, overwrite: Option<bool>) {
        let display = name.trim();
        if display.is_empty() {
            tracing::debug!("Ignoring header with empty name");
            return;
        }

        let value = value.normalized();
        match self.entries.get_mut(&lookup_key(display)) {
            None => {
                self.entries.insert(
                    lookup_key(display),
                    Entry {
                        name: display.to_string(),
                        value,
                    },
                );
            }
            Some(entry) => {
                let writable = overwrite == Some(true)
                    || (overwrite.is_none() && !entry.value.is_disabled());
                if writable {
                    entry.value = value;
                }
            }
        }
    }

    /// Case-insensitive read. `Disabled` values are returned as stored.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.get(&lookup_key(name)).map(|e| &e.value)
    }

    /// Read as a wire string (multi-values joined, `None` if disabled).
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(HeaderValue::to_joined)
    }

    /// Decode a `key=value[,key=value...]` value into a token map.
    pub fn get_tokens(&self, name: &str) -> Option<IndexMap<String, Option<String>>> {
        let value = match self.get(name)? {
            HeaderValue::Single(s) => s.clone(),
            HeaderValue::Multi(values) => values.join(","),
            HeaderValue::Disabled => return None,
        };
        Some(parse_tokens(&value))
    }

    /// Run a parser over the value and its stored name.
    pub fn get_parsed<T>(&self, name: &str, parser: impl FnOnce(&HeaderValue, &str) -> T) -> Option<T> {
        self.entries
            .get(&lookup_key(name))
            .map(|entry| parser(&entry.value, &entry.name))
    }

    /// Pattern-match a single string value, returning every capture group.
    pub fn get_captures(&self, name: &str, pattern: &Regex) -> Option<Vec<Option<String>>> {
        let value = self.get(name)?.as_str()?;
        let caps = pattern.captures(value)?;
        Some(
            caps.iter()
                .map(|m| m.map(|m| m.as_str().to_string()))
                .collect(),
        )
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(&lookup_key(name))
    }

    pub fn has_matching(&self, name: &str, matcher: &HeaderMatcher) -> bool {
        self.entries
            .get(&lookup_key(name))
            .is_some_and(|e| matcher.matches_value(&e.value, &e.name))
    }

    /// Remove `name`. Returns whether anything was removed.
    pub fn delete(&mut self, name: &str) -> bool {
        self.entries.shift_remove(&lookup_key(name)).is_some()
    }

    /// Remove `name` only if its value satisfies `matcher`.
    pub fn delete_matching(&mut self, name: &str, matcher: &HeaderMatcher) -> bool {
        if self.has_matching(name, matcher) {
            self.delete(name)
        } else {
            false
        }
    }

    pub fn delete_all<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut deleted = false;
        for name in names {
            deleted |= self.delete(name.as_ref());
        }
        deleted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove every entry whose name satisfies `matcher`.
    pub fn clear_matching(&mut self, matcher: &HeaderMatcher) -> bool {
        let before = self.entries.len();
        self.entries.retain(|_, e| !matcher.matches_name(&e.value, &e.name));
        self.entries.len() != before
    }

    /// Trim names and values; with `format`, rewrite names to Title-Case.
    ///
    /// Entries whose normalized names collide collapse into the first one,
    /// carrying the last value.
    pub fn normalize(&mut self, format: bool) -> &mut Self {
        let entries = std::mem::take(&mut self.entries);
        for entry in entries.into_values() {
            let name = if format {
                format_header_name(&entry.name)
            } else {
                entry.name.trim().to_string()
            };
            let value = entry.value.trimmed();
            match self.entries.get_mut(&lookup_key(&name)) {
                Some(existing) => existing.value = value,
                None => {
                    self.entries.insert(lookup_key(&name), Entry { name, value });
                }
            }
        }
        self
    }

    /// New container seeded from `self`, with each source applied in order.
    pub fn concat<I, S>(&self, others: I) -> Headers
    where
        I: IntoIterator<Item = S>,
        S: Into<HeaderSource>,
    {
        let mut computed = self.clone();
        for other in others {
            computed.apply(other, None);
        }
        computed
    }

    /// Live entries in order; `Disabled` values are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries
            .values()
            .filter(|e| !e.value.is_disabled())
            .map(|e| (e.name.as_str(), &e.value))
    }

    /// Plain record form. With `as_strings`, multi-values are comma-joined.
    pub fn to_json(&self, as_strings: bool) -> Map<String, Value> {
        self.iter()
            .map(|(name, value)| {
                let json = match value {
                    HeaderValue::Multi(values) if !as_strings => {
                        Value::Array(values.iter().cloned().map(Value::String).collect())
                    }
                    other => Value::String(other.to_string()),
                };
                (name.to_string(), json)
            })
            .collect()
    }

    /// Number of stored entries, `Disabled` included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

impl<K: AsRef<str>, V: Into<HeaderValue>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name.as_ref(), value);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in self.entries.values() {
            map.serialize_entry(&entry.name, &entry.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(HeadersVisitor)
    }
}

struct HeadersVisitor;

impl<'de> Visitor<'de> for HeadersVisitor {
    type Value = Headers;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of header names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
        let mut headers = Headers::new();
        while let Some((name, value)) = access.next_entry::<String, HeaderValue>()? {
            headers.set_with(&name, value, Some(true));
        }
        Ok(headers)
    }
}
