//! HTTP request client with pluggable transports.
//!
//! One call surface over interchangeable adapters, with layered config
//! merging, request/response transforms, interceptor chains and cooperative
//! cancellation.

// Core pipeline
pub mod adapters;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod headers;
pub mod interceptors;

// Values and cross-cutting concerns
pub mod error;
pub mod http;
pub mod observability;

pub use adapters::{Adapter, AdapterRegistry, AdapterSelection, Transport};
pub use client::{Client, ResponseFuture};
pub use config::{CourierConfig, RequestConfig};
pub use dispatch::{AbortController, AbortSignal, CancelToken};
pub use error::{CourierError, CourierResult, ErrorCode};
pub use headers::{HeaderValue, Headers};
pub use http::Response;
