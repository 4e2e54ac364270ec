//! Header name checks and text parsing.

use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::headers::value::HeaderValue;

static HEADER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-_a-zA-Z0-9^`|~,!#$%&'*+.]+$").expect("header name pattern is valid")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z\d])(\w*)").expect("word pattern is valid"));

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^\s,;=]+)\s*(?:=\s*([^,;]+))?").expect("token pattern is valid")
});

/// Headers whose repeated occurrences in a raw block are dropped.
const SINGLE_OCCURRENCE: &[&str] = &[
    "age",
    "authorization",
    "content-length",
    "content-type",
    "etag",
    "expires",
    "from",
    "host",
    "if-modified-since",
    "if-unmodified-since",
    "last-modified",
    "location",
    "max-forwards",
    "proxy-authorization",
    "referer",
    "retry-after",
    "user-agent",
];

/// True if `name` (trimmed) is a syntactically valid single header name.
pub fn is_valid_header_name(name: &str) -> bool {
    HEADER_NAME.is_match(name.trim())
}

/// Parse a `Name: value` block into lower-cased names.
pub fn parse_raw_headers(raw: &str) -> Vec<(String, HeaderValue)> {
    let mut parsed: IndexMap<String, HeaderValue> = IndexMap::new();

    for line in raw.lines() {
        let Some(colon) = line.find(':') else {
            continue;
        };
        let key = line[..colon].trim().to_lowercase();
        let value = line[colon + 1..].trim().to_string();

        if key.is_empty() {
            continue;
        }
        if parsed.contains_key(&key) && SINGLE_OCCURRENCE.contains(&key.as_str()) {
            continue;
        }

        if key == "set-cookie" {
            match parsed.get_mut(&key) {
                Some(HeaderValue::Multi(values)) => values.push(value),
                _ => {
                    parsed.insert(key, HeaderValue::Multi(vec![value]));
                }
            }
            continue;
        }

        match parsed.get_mut(&key) {
            Some(HeaderValue::Single(existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => {
                parsed.insert(key, HeaderValue::Single(value));
            }
        }
    }

    parsed.into_iter().collect()
}

/// Decode `key=value` tokens separated by `,` or `;`.
pub fn parse_tokens(value: &str) -> IndexMap<String, Option<String>> {
    TOKEN
        .captures_iter(value)
        .map(|caps| {
            let key = caps[1].to_string();
            let val = caps.get(2).map(|m| m.as_str().trim_end().to_string());
            (key, val)
        })
        .collect()
}

/// Title-Case a header name: `content-type` becomes `Content-Type`.
pub fn format_header_name(name: &str) -> String {
    WORD.replace_all(&name.trim().to_lowercase(), |caps: &Captures| {
        format!("{}{}", caps[1].to_uppercase(), &caps[2])
    })
    .into_owned()
}
