//! Header values.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A stored header value.
///
/// `Disabled` is the explicit "do not default this header" marker. It is kept
/// in the container so later implicit writes leave it alone, but it is never
/// serialized or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
    Disabled,
}

impl HeaderValue {
    /// The value if it is a single string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Single(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, HeaderValue::Disabled)
    }

    /// Wire form: multi-values comma-joined, `None` for disabled.
    pub fn to_joined(&self) -> Option<String> {
        match self {
            HeaderValue::Single(s) => Some(s.clone()),
            HeaderValue::Multi(values) => Some(values.join(", ")),
            HeaderValue::Disabled => None,
        }
    }

    /// Strip trailing line breaks from every string.
    pub(crate) fn normalized(self) -> Self {
        match self {
            HeaderValue::Single(s) => HeaderValue::Single(strip_line_end(s)),
            HeaderValue::Multi(values) => {
                HeaderValue::Multi(values.into_iter().map(strip_line_end).collect())
            }
            HeaderValue::Disabled => HeaderValue::Disabled,
        }
    }

    /// Trim surrounding whitespace from every string.
    pub(crate) fn trimmed(self) -> Self {
        let trim = |s: String| s.trim().to_string();
        match self {
            HeaderValue::Single(s) => HeaderValue::Single(trim(s)),
            HeaderValue::Multi(values) => HeaderValue::Multi(values.into_iter().map(trim).collect()),
            HeaderValue::Disabled => HeaderValue::Disabled,
        }
    }
}

fn strip_line_end(mut s: String) -> String {
    let kept = s.trim_end_matches(['\r', '\n']).len();
    s.truncate(kept);
    s
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Single(s) => f.write_str(s),
            HeaderValue::Multi(values) => f.write_str(&values.join(", ")),
            HeaderValue::Disabled => f.write_str("false"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::Single(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::Single(s)
    }
}

impl From<&String> for HeaderValue {
    fn from(s: &String) -> Self {
        HeaderValue::Single(s.clone())
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::Multi(values)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        HeaderValue::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// `false` disables the header; `true` is stored as the string "true".
impl From<bool> for HeaderValue {
    fn from(flag: bool) -> Self {
        if flag {
            HeaderValue::Single("true".to_string())
        } else {
            HeaderValue::Disabled
        }
    }
}

impl From<u64> for HeaderValue {
    fn from(n: u64) -> Self {
        HeaderValue::Single(n.to_string())
    }
}

impl Serialize for HeaderValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HeaderValue::Single(s) => serializer.serialize_str(s),
            HeaderValue::Multi(values) => values.serialize(serializer),
            HeaderValue::Disabled => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for HeaderValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(HeaderValueVisitor)
    }
}

struct HeaderValueVisitor;

impl<'de> Visitor<'de> for HeaderValueVisitor {
    type Value = HeaderValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, a list of strings, a number or false")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<HeaderValue, E> {
        Ok(HeaderValue::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<HeaderValue, E> {
        Ok(HeaderValue::from(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<HeaderValue, E> {
        Ok(HeaderValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<HeaderValue, E> {
        Ok(HeaderValue::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<HeaderValue, E> {
        Ok(HeaderValue::Single(v.to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<HeaderValue, A::Error> {
        let mut values = Vec::new();
        while let Some(item) = seq.next_element::<String>()? {
            values.push(item);
        }
        Ok(HeaderValue::Multi(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_conversion() {
        assert_eq!(HeaderValue::from(false), HeaderValue::Disabled);
        assert_eq!(HeaderValue::from(true).as_str(), Some("true"));
    }

    #[test]
    fn test_normalized_strips_line_breaks() {
        let value = HeaderValue::from("abc\r\n").normalized();
        assert_eq!(value.as_str(), Some("abc"));

        let value = HeaderValue::Multi(vec![" a=1 ".into(), "b=2\t".into()]).trimmed();
        assert_eq!(value.to_joined().as_deref(), Some("a=1, b=2"));
    }

    #[test]
    fn test_deserialize_shapes() {
        let v: HeaderValue = serde_json::from_str("\"text/html\"").unwrap();
        assert_eq!(v.as_str(), Some("text/html"));

        let v: HeaderValue = serde_json::from_str("[\"a=1\", \"b=2\"]").unwrap();
        assert_eq!(v.to_joined().as_deref(), Some("a=1, b=2"));

        let v: HeaderValue = serde_json::from_str("false").unwrap();
        assert!(v.is_disabled());
    }
}
