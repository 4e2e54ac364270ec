//! Configuration schema definitions.
//!
//! `RequestConfig` is the per-request option set that flows through the whole
//! pipeline. `CourierConfig` is the root of the settings file.
//! All serializable types derive Serde traits for loading from TOML.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapters::AdapterSelection;
use crate::dispatch::cancel::{AbortSignal, CancelToken};
use crate::dispatch::transform::{default_transform_request, default_transform_response, Transform};
use crate::headers::Headers;
use crate::http::request::ParamsSerializerConfig;
use crate::http::response::StatusValidator;

/// Expected format of the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Json,
    Text,
}

/// Options for one request.
///
/// Every field is optional so that partial configs (defaults, instance
/// config, call-site config) can be merged field by field.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    pub url: Option<String>,

    /// Lower-cased once the orchestrator validates the config.
    pub method: Option<String>,

    pub base_url: Option<String>,

    /// Request payload before `transform_request`.
    pub data: Option<Value>,

    /// Query parameters appended to the URL.
    pub params: Option<Map<String, Value>>,

    /// Flat request headers.
    pub headers: Headers,

    /// `common` and per-method header buckets, folded into `headers` before
    /// dispatch.
    pub method_headers: IndexMap<String, Headers>,

    /// Milliseconds; 0 means no timeout.
    pub timeout: Option<u64>,

    pub with_credentials: Option<bool>,

    /// Basic auth bag (`username`, `password`).
    pub auth: Option<Map<String, Value>>,

    pub proxy: Option<Map<String, Value>>,

    pub response_type: Option<ResponseType>,

    pub response_encoding: Option<String>,

    pub xsrf_cookie_name: Option<String>,

    pub xsrf_header_name: Option<String>,

    /// Maximum response body size in bytes; -1 disables the check.
    pub max_content_length: Option<i64>,

    /// Maximum request body size in bytes; -1 disables the check.
    pub max_body_length: Option<i64>,

    pub max_redirects: Option<u32>,

    pub socket_path: Option<String>,

    pub decompress: Option<bool>,

    /// Transitional behaviour flags, validated before dispatch.
    pub transitional: Option<Map<String, Value>>,

    /// Adapter name(s) or handles to try, in order.
    pub adapter: Option<AdapterSelection>,

    #[serde(skip)]
    pub transform_request: Option<Vec<Transform>>,

    #[serde(skip)]
    pub transform_response: Option<Vec<Transform>>,

    #[serde(skip)]
    pub params_serializer: Option<ParamsSerializerConfig>,

    #[serde(skip)]
    pub validate_status: Option<StatusValidator>,

    #[serde(skip)]
    pub cancel_token: Option<CancelToken>,

    #[serde(skip)]
    pub signal: Option<AbortSignal>,

    /// Options this crate does not recognize; passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The library-wide defaults every client starts from.
    pub fn library_defaults() -> Self {
        let mut common = Headers::new();
        common.set("Accept", "application/json, text/plain, */*");

        let mut method_headers = IndexMap::new();
        method_headers.insert("common".to_string(), common);
        for method in crate::config::merge::METHOD_BUCKETS {
            method_headers.insert(method.to_string(), Headers::new());
        }

        Self {
            method_headers,
            timeout: Some(0),
            xsrf_cookie_name: Some("XSRF-TOKEN".to_string()),
            xsrf_header_name: Some("X-XSRF-TOKEN".to_string()),
            max_content_length: Some(-1),
            max_body_length: Some(-1),
            transitional: Some(TransitionalOptions::default().to_map()),
            adapter: Some(AdapterSelection::default_builtins()),
            transform_request: Some(vec![default_transform_request()]),
            transform_response: Some(vec![default_transform_response()]),
            validate_status: Some(StatusValidator::success()),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<crate::headers::HeaderValue>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_adapter(mut self, adapter: impl Into<AdapterSelection>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Method as dispatched: lower-case, `get` when unset or blank.
    pub fn method_or_default(&self) -> String {
        self.method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "get".to_string())
    }

    /// Transitional flags with defaults filled in.
    pub fn transitional_options(&self) -> TransitionalOptions {
        TransitionalOptions::resolve(self.transitional.as_ref())
    }
}

/// A bare address is shorthand for `{ url: address }`.
impl From<&str> for RequestConfig {
    fn from(url: &str) -> Self {
        RequestConfig::new().with_url(url)
    }
}

impl From<String> for RequestConfig {
    fn from(url: String) -> Self {
        RequestConfig::new().with_url(url)
    }
}

/// Resolved transitional flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionalOptions {
    /// Swallow JSON parse failures of string responses.
    pub silent_json_parsing: bool,
    /// Attempt JSON parsing when no response type was requested.
    pub forced_json_parsing: bool,
    /// Report timeouts as ETIMEDOUT instead of ECONNABORTED.
    pub clarify_timeout_error: bool,
}

impl Default for TransitionalOptions {
    fn default() -> Self {
        Self {
            silent_json_parsing: true,
            forced_json_parsing: true,
            clarify_timeout_error: false,
        }
    }
}

impl TransitionalOptions {
    pub const SILENT_JSON_PARSING: &'static str = "silent_json_parsing";
    pub const FORCED_JSON_PARSING: &'static str = "forced_json_parsing";
    pub const CLARIFY_TIMEOUT_ERROR: &'static str = "clarify_timeout_error";

    /// Read flags from a bag, falling back to defaults for absent or
    /// non-boolean entries.
    pub fn resolve(bag: Option<&Map<String, Value>>) -> Self {
        let defaults = Self::default();
        let flag = |name: &str, fallback: bool| {
            bag.and_then(|b| b.get(name))
                .and_then(Value::as_bool)
                .unwrap_or(fallback)
        };
        Self {
            silent_json_parsing: flag(Self::SILENT_JSON_PARSING, defaults.silent_json_parsing),
            forced_json_parsing: flag(Self::FORCED_JSON_PARSING, defaults.forced_json_parsing),
            clarify_timeout_error: flag(Self::CLARIFY_TIMEOUT_ERROR, defaults.clarify_timeout_error),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(Self::SILENT_JSON_PARSING.into(), Value::Bool(self.silent_json_parsing));
        map.insert(Self::FORCED_JSON_PARSING.into(), Value::Bool(self.forced_json_parsing));
        map.insert(Self::CLARIFY_TIMEOUT_ERROR.into(), Value::Bool(self.clarify_timeout_error));
        map
    }
}

/// Root of the settings file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CourierConfig {
    /// Instance config merged over the library defaults.
    pub defaults: RequestConfig,

    /// Option validation behaviour.
    pub validation: ValidationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Option validation settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ValidationConfig {
    /// Treat unknown transitional flags as errors instead of warnings.
    pub strict_options: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record request metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_defaults() {
        let defaults = RequestConfig::library_defaults();
        assert_eq!(defaults.timeout, Some(0));
        assert_eq!(
            defaults.method_headers["common"].get_str("accept").as_deref(),
            Some("application/json, text/plain, */*")
        );
        assert!(defaults.method_headers.contains_key("post"));
        assert_eq!(defaults.transform_request.as_ref().map(Vec::len), Some(1));
        assert_eq!(defaults.transitional_options(), TransitionalOptions::default());
    }

    #[test]
    fn test_bare_address() {
        let config = RequestConfig::from("/users");
        assert_eq!(config.url.as_deref(), Some("/users"));
        assert_eq!(config.method_or_default(), "get");
    }

    #[test]
    fn test_blank_method_defaults_to_get() {
        assert_eq!(RequestConfig::from("/x").with_method("").method_or_default(), "get");
        assert_eq!(RequestConfig::from("/x").with_method("  ").method_or_default(), "get");
        assert_eq!(RequestConfig::from("/x").with_method(" PUT ").method_or_default(), "put");
    }

    #[test]
    fn test_transitional_resolve() {
        let mut bag = Map::new();
        bag.insert("silent_json_parsing".into(), Value::Bool(false));
        bag.insert("clarify_timeout_error".into(), Value::String("yes".into()));

        let opts = TransitionalOptions::resolve(Some(&bag));
        assert!(!opts.silent_json_parsing);
        assert!(opts.forced_json_parsing);
        assert!(!opts.clarify_timeout_error);
    }

    #[test]
    fn test_deserialize_request_config() {
        let config: RequestConfig = toml::from_str(
            r#"
            base_url = "https://api.example.com"
            timeout = 2500
            adapter = ["http", "xhr"]
            response_type = "json"
            custom_flag = true

            [headers]
            X-Client = "courier"
            Content-Type = false

            [method_headers.common]
            Accept = "application/json"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.timeout, Some(2500));
        assert_eq!(config.response_type, Some(ResponseType::Json));
        assert_eq!(config.headers.get_str("x-client").as_deref(), Some("courier"));
        assert!(config.headers.get("content-type").unwrap().is_disabled());
        assert_eq!(config.extra.get("custom_flag"), Some(&Value::Bool(true)));
        assert_eq!(config.adapter.map(|a| a.len()), Some(2));
    }
}
