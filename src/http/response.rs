//! Response value and status settlement.
//!
//! # Responsibilities
//! - Carry status, headers, body and the originating config back to callers
//! - Decide whether a status settles as success or as a transport error
//!
//! # Design Decisions
//! - The body is a `serde_json::Value` so transforms can reshape it freely
//! - A non-accepted status keeps the full response on the error for recovery
//! - 4xx maps to ERR_BAD_REQUEST, everything else to ERR_BAD_RESPONSE

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::config::RequestConfig;
use crate::error::{CourierError, CourierResult, ErrorCode};
use crate::headers::Headers;

/// A settled (or partial) response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub data: Value,
    /// Config the request was dispatched with.
    pub config: RequestConfig,
}

impl Response {
    pub fn new(status: u16, data: Value, config: RequestConfig) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Headers::new(),
            data,
            config,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }
}

/// Decides which statuses count as success.
#[derive(Clone)]
pub struct StatusValidator(Arc<dyn Fn(u16) -> bool + Send + Sync>);

impl StatusValidator {
    pub fn new(f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Accepts 2xx.
    pub fn success() -> Self {
        Self::new(|status| (200..300).contains(&status))
    }

    pub fn accepts(&self, status: u16) -> bool {
        (self.0)(status)
    }
}

impl fmt::Debug for StatusValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StatusValidator(..)")
    }
}

/// Resolve a response against its config's `validate_status`.
///
/// Without a validator (or with status 0) every response is accepted.
pub fn settle(response: Response) -> CourierResult<Response> {
    let accepted = response.status == 0
        || response
            .config
            .validate_status
            .as_ref()
            .map_or(true, |v| v.accepts(response.status));
    if accepted {
        return Ok(response);
    }

    let code = if (400..500).contains(&response.status) {
        ErrorCode::BadRequest
    } else {
        ErrorCode::BadResponse
    };
    tracing::debug!(status = response.status, code = %code, "Response rejected by status validator");

    let config = response.config.clone();
    Err(CourierError::transport(
        code,
        format!("Request failed with status code {}", response.status),
    )
    .with_config(&config)
    .with_response(response))
}
