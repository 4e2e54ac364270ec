//! HTTP request/response values.
//!
//! # Data Flow
//! ```text
//! merged RequestConfig
//!     → request.rs (base URL join, params serialization)
//!     → adapter performs I/O
//!     → response.rs (Response value, validate_status settlement)
//!     → response interceptors
//! ```

pub mod request;
pub mod response;

pub use request::{build_full_path, build_url, request_url, ParamsSerializer, ParamsSerializerConfig};
pub use response::{settle, Response, StatusValidator};
