//! Error types for the request pipeline.
//!
//! # Design Decisions
//! - Cancellation is its own variant so the dispatcher can recognize it
//!   without inspecting codes
//! - Transport failures carry the originating config and, when the server
//!   answered, the partial response so interceptors can recover them
//! - Every variant maps to a stable machine-readable code

use std::fmt;

use thiserror::Error;

use crate::config::RequestConfig;
use crate::http::Response;

/// Boxed cause attached to transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used across the crate.
pub type CourierResult<T> = Result<T, CourierError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadOptionValue,
    BadOption,
    Deprecated,
    NotSupport,
    Canceled,
    BadResponse,
    BadRequest,
    Network,
    ConnAborted,
    TimedOut,
    TooManyRedirects,
    InvalidUrl,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadOptionValue => "ERR_BAD_OPTION_VALUE",
            ErrorCode::BadOption => "ERR_BAD_OPTION",
            ErrorCode::Deprecated => "ERR_DEPRECATED",
            ErrorCode::NotSupport => "ERR_NOT_SUPPORT",
            ErrorCode::Canceled => "ERR_CANCELED",
            ErrorCode::BadResponse => "ERR_BAD_RESPONSE",
            ErrorCode::BadRequest => "ERR_BAD_REQUEST",
            ErrorCode::Network => "ERR_NETWORK",
            ErrorCode::ConnAborted => "ECONNABORTED",
            ErrorCode::TimedOut => "ETIMEDOUT",
            ErrorCode::TooManyRedirects => "ERR_FR_TOO_MANY_REDIRECTS",
            ErrorCode::InvalidUrl => "ERR_INVALID_URL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while configuring, dispatching or settling a request.
#[derive(Debug, Error)]
pub enum CourierError {
    /// The request was aborted through its cancel token or abort signal.
    #[error("{message}")]
    Canceled {
        message: String,
        config: Option<Box<RequestConfig>>,
    },

    /// A named adapter is not registered.
    #[error("Unknown adapter '{0}'")]
    UnknownAdapter(String),

    /// No candidate adapter is usable.
    #[error("There is no suitable adapter to dispatch the request {0}")]
    NotSupported(String),

    /// Bad option value, unknown option, or removed option.
    #[error("{message}")]
    Validation { code: ErrorCode, message: String },

    /// Failure reported by (or settled from) the transport.
    #[error("{message}")]
    Transport {
        code: ErrorCode,
        message: String,
        config: Option<Box<RequestConfig>>,
        response: Option<Box<Response>>,
        #[source]
        cause: Option<BoxError>,
    },

    /// Failure raised by an interceptor or transform.
    #[error("{0}")]
    Other(String),
}

impl CourierError {
    /// A cancellation error; `None` uses the default message.
    pub fn canceled(message: Option<&str>, config: Option<&RequestConfig>) -> Self {
        CourierError::Canceled {
            message: message.unwrap_or("canceled").to_string(),
            config: config.map(|c| Box::new(c.clone())),
        }
    }

    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        CourierError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn transport(code: ErrorCode, message: impl Into<String>) -> Self {
        CourierError::Transport {
            code,
            message: message.into(),
            config: None,
            response: None,
            cause: None,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        CourierError::Other(message.into())
    }

    /// Attach the originating config to a transport error.
    pub fn with_config(mut self, request: &RequestConfig) -> Self {
        if let CourierError::Transport { config, .. } = &mut self {
            *config = Some(Box::new(request.clone()));
        }
        self
    }

    /// Attach a partial response to a transport error.
    pub fn with_response(mut self, partial: Response) -> Self {
        if let CourierError::Transport { response, .. } = &mut self {
            *response = Some(Box::new(partial));
        }
        self
    }

    /// Attach an underlying cause to a transport error.
    pub fn with_cause(mut self, source: impl Into<BoxError>) -> Self {
        if let CourierError::Transport { cause, .. } = &mut self {
            *cause = Some(source.into());
        }
        self
    }

    /// Machine-readable code, if the variant has one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CourierError::Canceled { .. } => Some(ErrorCode::Canceled),
            CourierError::NotSupported(_) => Some(ErrorCode::NotSupport),
            CourierError::Validation { code, .. } | CourierError::Transport { code, .. } => {
                Some(*code)
            }
            CourierError::UnknownAdapter(_) | CourierError::Other(_) => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, CourierError::Canceled { .. })
    }

    /// Partial response carried by a transport error.
    pub fn response(&self) -> Option<&Response> {
        match self {
            CourierError::Transport { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    pub fn response_mut(&mut self) -> Option<&mut Response> {
        match self {
            CourierError::Transport { response, .. } => response.as_deref_mut(),
            _ => None,
        }
    }

    /// Config the failing request was dispatched with.
    pub fn config(&self) -> Option<&RequestConfig> {
        match self {
            CourierError::Canceled { config, .. } | CourierError::Transport { config, .. } => {
                config.as_deref()
            }
            _ => None,
        }
    }
}
