//! Request URL building.
//!
//! # Responsibilities
//! - Join `base_url` and `url` unless `url` is already absolute
//! - Serialize `params` into the query string
//! - Hold the pluggable params serializer
//!
//! # Design Decisions
//! - Default encoding is form encoding with `: $ , [ ]` left readable
//! - A custom `serialize` replaces the default entirely
//! - Fragments are dropped before the query is appended

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::config::RequestConfig;

pub type SerializeFn = Arc<dyn Fn(&Map<String, Value>) -> String + Send + Sync>;
pub type EncodeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Options form of the params serializer.
#[derive(Clone, Default)]
pub struct ParamsSerializer {
    /// Replaces the default component encoder.
    pub encode: Option<EncodeFn>,
    /// Replaces the whole query serialization.
    pub serialize: Option<SerializeFn>,
}

impl fmt::Debug for ParamsSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamsSerializer")
            .field("encode", &self.encode.is_some())
            .field("serialize", &self.serialize.is_some())
            .finish()
    }
}

/// A params serializer as supplied by callers.
#[derive(Clone)]
pub enum ParamsSerializerConfig {
    /// Bare function; normalized to `{ serialize }` during validation.
    Function(SerializeFn),
    Options(ParamsSerializer),
}

impl ParamsSerializerConfig {
    pub fn function(f: impl Fn(&Map<String, Value>) -> String + Send + Sync + 'static) -> Self {
        ParamsSerializerConfig::Function(Arc::new(f))
    }

    pub fn normalize(self) -> ParamsSerializer {
        match self {
            ParamsSerializerConfig::Function(serialize) => ParamsSerializer {
                encode: None,
                serialize: Some(serialize),
            },
            ParamsSerializerConfig::Options(options) => options,
        }
    }
}

impl fmt::Debug for ParamsSerializerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsSerializerConfig::Function(_) => f.write_str("Function(..)"),
            ParamsSerializerConfig::Options(options) => options.fmt(f),
        }
    }
}

/// True for `scheme://...` and protocol-relative `//...` addresses.
pub fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Join a base and a relative address with exactly one slash.
pub fn combine_urls(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// `base_url` joined with `url`, unless `url` is absolute.
pub fn build_full_path(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) if !is_absolute_url(url) => combine_urls(base, url),
        _ => url.to_string(),
    }
}

/// Default component encoder.
pub fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace("%3A", ":")
        .replace("%24", "$")
        .replace("%2C", ",")
        .replace("%5B", "[")
        .replace("%5D", "]")
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => Some(value.to_string()),
        other => Some(other.to_string()),
    }
}

/// Default query serialization: arrays repeat as `key[]`, objects are
/// JSON-encoded, nulls are skipped.
pub fn serialize_params(params: &Map<String, Value>, encode: &dyn Fn(&str) -> String) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            Value::Array(items) => {
                let key = format!("{}[]", key);
                for item in items {
                    if let Some(v) = scalar(item) {
                        pairs.push(format!("{}={}", encode(&key), encode(&v)));
                    }
                }
            }
            other => {
                if let Some(v) = scalar(other) {
                    pairs.push(format!("{}={}", encode(key), encode(&v)));
                }
            }
        }
    }
    pairs.join("&")
}

/// Append serialized `params` to `url`.
pub fn build_url(
    url: &str,
    params: Option<&Map<String, Value>>,
    serializer: Option<&ParamsSerializer>,
) -> String {
    let Some(params) = params else {
        return url.to_string();
    };

    let query = match serializer.and_then(|s| s.serialize.as_ref()) {
        Some(serialize) => serialize(params),
        None => match serializer.and_then(|s| s.encode.as_ref()) {
            Some(encode) => serialize_params(params, encode.as_ref()),
            None => serialize_params(params, &encode_component),
        },
    };
    if query.is_empty() {
        return url.to_string();
    }

    let base = url.split('#').next().unwrap_or(url);
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, query)
}

/// Full request URL for a merged config.
pub fn request_url(config: &RequestConfig) -> String {
    let full = build_full_path(config.base_url.as_deref(), config.url.as_deref().unwrap_or(""));
    let serializer = config.params_serializer.clone().map(ParamsSerializerConfig::normalize);
    build_url(&full, config.params.as_ref(), serializer.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_absolute_detection() {
        assert!(is_absolute_url("https://example.com"));
        assert!(is_absolute_url("custom-scheme-v1.0://x"));
        assert!(is_absolute_url("//cdn.example.com/a.js"));
        assert!(!is_absolute_url("/users"));
        assert!(!is_absolute_url("123://x"));
        assert!(!is_absolute_url("users?next=http://x"));
    }

    #[test]
    fn test_full_path() {
        assert_eq!(
            build_full_path(Some("https://api.example.com/"), "/users"),
            "https://api.example.com/users"
        );
        assert_eq!(
            build_full_path(Some("https://api.example.com"), "https://other.com/x"),
            "https://other.com/x"
        );
        assert_eq!(build_full_path(None, "/users"), "/users");
        assert_eq!(build_full_path(Some("https://a.com/v1"), ""), "https://a.com/v1");
    }

    #[test]
    fn test_build_url_default_serializer() {
        let p = params(json!({"q": "a b", "ids": [1, 2], "skip": null, "at": "10:30"}));
        assert_eq!(
            build_url("/search#top", Some(&p), None),
            "/search?q=a+b&ids[]=1&ids[]=2&at=10:30"
        );
        assert_eq!(build_url("/s?x=1", Some(&p), None).split('&').next(), Some("/s?x=1"));
        assert_eq!(build_url("/plain", None, None), "/plain");
    }

    #[test]
    fn test_custom_serializer() {
        let p = params(json!({"a": 1}));
        let serializer = ParamsSerializerConfig::function(|_| "custom=yes".into()).normalize();
        assert_eq!(build_url("/x", Some(&p), Some(&serializer)), "/x?custom=yes");

        let encoder = ParamsSerializer {
            encode: Some(Arc::new(|s: &str| s.to_uppercase())),
            serialize: None,
        };
        assert_eq!(build_url("/x", Some(&params(json!({"k": "v"}))), Some(&encoder)), "/x?K=V");
    }

    #[test]
    fn test_request_url() {
        let mut config = RequestConfig::from("/users");
        config.base_url = Some("https://api.example.com".into());
        config.params = Some(params(json!({"page": 2})));
        assert_eq!(request_url(&config), "https://api.example.com/users?page=2");
    }
}
