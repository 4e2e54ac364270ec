//! Per-field merge of two request configs.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::schema::RequestConfig;
use crate::headers::Headers;

/// Method header buckets created with the library defaults.
pub const METHOD_BUCKETS: [&str; 6] = ["delete", "get", "head", "post", "put", "patch"];

/// Combine `base` and `over` into a new config.
///
/// Plain and function-valued fields take the override when it is set.
/// Headers overlay key by key. Option bags (`params`, `auth`, `proxy`) merge
/// recursively. Neither input is modified.
pub fn merge_config(base: &RequestConfig, over: &RequestConfig) -> RequestConfig {
    macro_rules! prefer_override {
        ($($field:ident),* $(,)?) => {
            RequestConfig {
                $($field: over.$field.clone().or_else(|| base.$field.clone()),)*
                headers: merge_headers(&base.headers, &over.headers),
                method_headers: merge_method_headers(&base.method_headers, &over.method_headers),
                params: merge_bags(base.params.as_ref(), over.params.as_ref()),
                auth: merge_bags(base.auth.as_ref(), over.auth.as_ref()),
                proxy: merge_bags(base.proxy.as_ref(), over.proxy.as_ref()),
                extra: merge_extra(&base.extra, &over.extra),
            }
        };
    }

    prefer_override!(
        // value-only
        url,
        method,
        data,
        base_url,
        with_credentials,
        adapter,
        response_type,
        xsrf_cookie_name,
        xsrf_header_name,
        max_content_length,
        max_body_length,
        max_redirects,
        decompress,
        transitional,
        // default-if-absent
        timeout,
        socket_path,
        response_encoding,
        // function-valued
        transform_request,
        transform_response,
        params_serializer,
        validate_status,
        cancel_token,
        signal,
    )
}

/// Base headers overlaid by the override's, which win even when `Disabled`.
pub fn merge_headers(base: &Headers, over: &Headers) -> Headers {
    let mut merged = base.clone();
    merged.apply(over, Some(true));
    merged
}

fn merge_method_headers(
    base: &IndexMap<String, Headers>,
    over: &IndexMap<String, Headers>,
) -> IndexMap<String, Headers> {
    let mut merged = base.clone();
    for (bucket, headers) in over {
        let key = bucket.to_lowercase();
        let combined = match merged.get(&key) {
            Some(existing) => merge_headers(existing, headers),
            None => headers.clone(),
        };
        merged.insert(key, combined);
    }
    merged
}

fn merge_bags(
    base: Option<&Map<String, Value>>,
    over: Option<&Map<String, Value>>,
) -> Option<Map<String, Value>> {
    match (base, over) {
        (None, None) => None,
        (Some(b), None) => Some(b.clone()),
        (None, Some(o)) => Some(o.clone()),
        (Some(b), Some(o)) => {
            let mut merged = b.clone();
            for (key, value) in o {
                let combined = match (merged.get(key), value) {
                    (Some(Value::Object(left)), Value::Object(right)) => {
                        merge_bags(Some(left), Some(right))
                            .map(Value::Object)
                            .unwrap_or(Value::Null)
                    }
                    _ => value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            Some(merged)
        }
    }
}

fn merge_extra(base: &Map<String, Value>, over: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in over {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderValue;
    use serde_json::json;

    fn bag(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn test_value_fields_prefer_override() {
        let base = RequestConfig::from("/base").with_method("post");
        let mut over = RequestConfig::from("/over");
        over.timeout = Some(10);

        let merged = merge_config(&base, &over);
        assert_eq!(merged.url.as_deref(), Some("/over"));
        assert_eq!(merged.method.as_deref(), Some("post"));
        assert_eq!(merged.timeout, Some(10));
        assert!(merged.base_url.is_none());
    }

    #[test]
    fn test_headers_overlay() {
        let base = RequestConfig::new()
            .with_header("Accept", "*/*")
            .with_header("X-Base", "1")
            .with_header("Content-Type", false);
        let over = RequestConfig::new()
            .with_header("accept", "application/json")
            .with_header("content-type", "text/plain");

        let merged = merge_config(&base, &over);
        assert_eq!(merged.headers.get_str("x-base").as_deref(), Some("1"));
        assert_eq!(merged.headers.get_str("accept").as_deref(), Some("application/json"));
        assert_eq!(merged.headers.get_str("content-type").as_deref(), Some("text/plain"));

        // Explicit suppression in the override wins too
        let over = RequestConfig::new().with_header("Accept", false);
        let merged = merge_config(&base, &over);
        assert_eq!(merged.headers.get("accept"), Some(&HeaderValue::Disabled));
    }

    #[test]
    fn test_method_buckets_merge_per_bucket() {
        let base = RequestConfig::library_defaults();
        let mut over = RequestConfig::new();
        let mut post = Headers::new();
        post.set("X-Post", "1");
        over.method_headers.insert("POST".into(), post);

        let merged = merge_config(&base, &over);
        assert_eq!(merged.method_headers["post"].get_str("x-post").as_deref(), Some("1"));
        assert!(merged.method_headers["common"].has("accept"));
    }

    #[test]
    fn test_bags_merge_recursively() {
        let mut base = RequestConfig::new();
        base.params = bag(json!({"page": 1, "filter": {"state": "open", "label": "bug"}}));
        let mut over = RequestConfig::new();
        over.params = bag(json!({"limit": 5, "filter": {"state": "closed"}}));

        let merged = merge_config(&base, &over);
        assert_eq!(
            Value::Object(merged.params.unwrap()),
            json!({"page": 1, "filter": {"state": "closed", "label": "bug"}, "limit": 5})
        );
        assert!(merged.auth.is_none());
    }

    #[test]
    fn test_inputs_untouched_and_extra_passthrough() {
        let mut base = RequestConfig::new().with_header("X-A", "1");
        base.extra.insert("only_base".into(), json!(true));
        let mut over = RequestConfig::new().with_header("X-A", "2");
        over.extra.insert("only_over".into(), json!(1));

        let merged = merge_config(&base, &over);
        assert_eq!(base.headers.get_str("x-a").as_deref(), Some("1"));
        assert_eq!(over.headers.get_str("x-a").as_deref(), Some("2"));
        assert_eq!(merged.extra.len(), 2);
    }

    #[test]
    fn test_function_fields_not_combined() {
        let base = RequestConfig::library_defaults();
        let mut over = RequestConfig::new();
        over.transform_request = Some(Vec::new());

        let merged = merge_config(&base, &over);
        assert_eq!(merged.transform_request.map(|t| t.len()), Some(0));
        assert_eq!(merged.transform_response.map(|t| t.len()), Some(1));
    }
}
