//! Interceptor subsystem.
//!
//! # Data Flow
//! ```text
//! register/eject/clear (any thread)
//!     → manager.rs (tombstoned arena behind ArcSwap)
//!     → orchestrator snapshots live entries once per request
//!     → handler.rs stages run inline (fast path) or as deferred stages
//! ```
//!
//! # Design Decisions
//! - Indices are stable: ejection leaves a tombstone
//! - Mutations are visible to later requests only, never to in-flight ones
//! - Synchronicity is declared, and only honored for inline handlers

pub mod handler;
pub mod manager;

pub use handler::{AsyncFn, Handler, Interceptor, InterceptorOptions, RunWhen, SyncFn};
pub use manager::InterceptorManager;

use crate::config::RequestConfig;
use crate::http::Response;

/// Request and response interceptor registries of one client.
#[derive(Default)]
pub struct Interceptors {
    pub request: InterceptorManager<RequestConfig>,
    pub response: InterceptorManager<Response>,
}
