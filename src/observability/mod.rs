//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! client / dispatcher / adapters produce:
//!     → tracing events and one span per request (request_id)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → any metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event
//! - Request ID flows through every event of a request via its span
//! - Metrics are cheap and can be switched off from settings

pub mod logging;
pub mod metrics;
