//! Socket-based HTTP transport built on reqwest.
//!
//! # Responsibilities
//! - Turn a dispatched `RequestConfig` into one reqwest request
//! - Race the exchange against the config's cancel token / abort signal
//! - Map reqwest failures onto courier error codes
//! - Settle the response against `validate_status`
//!
//! # Design Decisions
//! - One shared connection pool, plus one cached client per distinct
//!   redirect limit
//! - Bodies are read as text; JSON parsing belongs to the response transforms
//! - `timeout = 0` means no timeout

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::Transport;
use crate::config::{RequestConfig, ResponseType};
use crate::dispatch::cancel::cancellation;
use crate::error::{CourierError, CourierResult, ErrorCode};
use crate::headers::{HeaderValue, Headers};
use crate::http::request::request_url;
use crate::http::response::{settle, Response};

/// The `http` builtin.
#[derive(Debug, Clone, Default)]
pub struct HttpAdapter {
    client: reqwest::Client,
    /// Clients keyed by `max_redirects`, shared across clones.
    redirect_clients: Arc<DashMap<u32, reqwest::Client>>,
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            redirect_clients: Arc::default(),
        }
    }

    fn client_for(&self, config: &RequestConfig) -> CourierResult<reqwest::Client> {
        let Some(max) = config.max_redirects else {
            return Ok(self.client.clone());
        };
        if let Some(cached) = self.redirect_clients.get(&max) {
            return Ok(cached.value().clone());
        }

        let policy = if max == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(max as usize)
        };
        let client = reqwest::Client::builder()
            .redirect(policy)
            .build()
            .map_err(|e| {
                CourierError::transport(ErrorCode::Network, e.to_string())
                    .with_config(config)
                    .with_cause(e)
            })?;
        tracing::debug!(max_redirects = max, "Built redirect-limited client");
        Ok(self
            .redirect_clients
            .entry(max)
            .or_insert(client)
            .value()
            .clone())
    }

    fn build(&self, config: &RequestConfig) -> CourierResult<reqwest::RequestBuilder> {
        let full = request_url(config);
        let url = url::Url::parse(&full).map_err(|e| {
            CourierError::transport(ErrorCode::InvalidUrl, format!("Invalid URL: {}", full))
                .with_config(config)
                .with_cause(e)
        })?;

        let method = config.method_or_default().to_uppercase();
        let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| {
            CourierError::transport(ErrorCode::BadOptionValue, format!("Invalid method {}", method))
                .with_config(config)
                .with_cause(e)
        })?;

        if config.socket_path.is_some() {
            tracing::warn!("socket_path is not supported by the http adapter; using TCP");
        }

        let mut builder = self.client_for(config)?.request(method, url);

        for (name, value) in config.headers.iter() {
            match value {
                HeaderValue::Multi(values) => {
                    for v in values {
                        builder = builder.header(name, v.as_str());
                    }
                }
                other => {
                    if let Some(v) = other.as_str() {
                        builder = builder.header(name, v);
                    }
                }
            }
        }

        if let Some(auth) = &config.auth {
            let username = auth.get("username").and_then(Value::as_str).unwrap_or("");
            let password = auth.get("password").and_then(Value::as_str);
            builder = builder.basic_auth(username, password);
        }

        if let Some(ms) = config.timeout.filter(|ms| *ms > 0) {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        if let Some(body) = request_body(config)? {
            builder = builder.body(body);
        }

        Ok(builder)
    }

    async fn exchange(&self, config: RequestConfig) -> CourierResult<Response> {
        let builder = self.build(&config)?;
        let clarify = config.transitional_options().clarify_timeout_error;
        let timeout = config.timeout.unwrap_or(0);

        let response = builder
            .send()
            .await
            .map_err(|e| map_error(e, &config, timeout, clarify))?;

        let status = response.status();
        let mut raw = String::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                raw.push_str(name.as_str());
                raw.push_str(": ");
                raw.push_str(v);
                raw.push('\n');
            }
        }
        let headers = Headers::from_raw(&raw);

        let text = response
            .text()
            .await
            .map_err(|e| map_error(e, &config, timeout, clarify))?;

        if let Some(limit) = config.max_content_length.filter(|l| *l > -1) {
            if text.len() as i64 > limit {
                return Err(CourierError::transport(
                    ErrorCode::BadResponse,
                    format!("maxContentLength size of {} exceeded", limit),
                )
                .with_config(&config));
            }
        }

        let data = match (config.response_type, text.is_empty()) {
            (Some(ResponseType::Json) | None, true) => Value::Null,
            _ => Value::String(text),
        };

        tracing::debug!(status = status.as_u16(), "Response received");
        let response = Response::new(status.as_u16(), data, config)
            .with_headers(headers)
            .with_status_text(status.canonical_reason().unwrap_or(""));
        settle(response)
    }
}

impl Transport for HttpAdapter {
    fn name(&self) -> &str {
        "http"
    }

    fn invoke(&self, config: RequestConfig) -> BoxFuture<'static, CourierResult<Response>> {
        let adapter = self.clone();
        Box::pin(async move {
            let watch = config.clone();
            tokio::select! {
                biased;
                err = cancellation(&watch) => Err(err),
                result = adapter.exchange(config) => result,
            }
        })
    }
}

/// Wire body after the request transforms ran.
fn request_body(config: &RequestConfig) -> CourierResult<Option<String>> {
    let body = match &config.data {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if let Some(limit) = config.max_body_length.filter(|l| *l > -1) {
        if body.len() as i64 > limit {
            return Err(CourierError::transport(
                ErrorCode::BadRequest,
                "Request body larger than maxBodyLength limit",
            )
            .with_config(config));
        }
    }
    Ok(Some(body))
}

fn map_error(err: reqwest::Error, config: &RequestConfig, timeout: u64, clarify: bool) -> CourierError {
    let (code, message) = if err.is_timeout() {
        let code = if clarify {
            ErrorCode::TimedOut
        } else {
            ErrorCode::ConnAborted
        };
        let message = if timeout > 0 {
            format!("timeout of {}ms exceeded", timeout)
        } else {
            "timeout exceeded".to_string()
        };
        (code, message)
    } else if err.is_redirect() {
        (ErrorCode::TooManyRedirects, "Maximum number of redirects exceeded".to_string())
    } else if err.is_builder() {
        (ErrorCode::BadOptionValue, err.to_string())
    } else {
        (ErrorCode::Network, err.to_string())
    };
    tracing::debug!(code = %code, error = %err, "Transport failure");
    CourierError::transport(code, message)
        .with_config(config)
        .with_cause(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body() {
        let config = RequestConfig::from("/x").with_data(json!("a=1"));
        assert_eq!(request_body(&config).unwrap().as_deref(), Some("a=1"));

        let config = RequestConfig::from("/x").with_data(json!({"a": 1}));
        assert_eq!(request_body(&config).unwrap().as_deref(), Some("{\"a\":1}"));

        assert!(request_body(&RequestConfig::from("/x")).unwrap().is_none());
    }

    #[test]
    fn test_body_limit() {
        let mut config = RequestConfig::from("/x").with_data(json!("0123456789"));
        config.max_body_length = Some(4);
        let err = request_body(&config).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadRequest));

        config.max_body_length = Some(-1);
        assert!(request_body(&config).is_ok());
    }

    #[test]
    fn test_redirect_clients_are_cached_per_limit() {
        let adapter = HttpAdapter::new();
        let mut config = RequestConfig::from("/x");

        adapter.client_for(&config).unwrap();
        assert_eq!(adapter.redirect_clients.len(), 0);

        config.max_redirects = Some(3);
        adapter.client_for(&config).unwrap();
        adapter.clone().client_for(&config).unwrap();
        assert_eq!(adapter.redirect_clients.len(), 1);

        config.max_redirects = Some(0);
        adapter.client_for(&config).unwrap();
        assert_eq!(adapter.redirect_clients.len(), 2);
    }

    #[tokio::test]
    async fn test_relative_url_is_invalid() {
        let err = HttpAdapter::new()
            .invoke(RequestConfig::from("/no-base"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidUrl));
    }
}
