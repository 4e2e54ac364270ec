//! Client subsystem.
//!
//! # Data Flow
//! ```text
//! request(input)
//!     → merge with instance defaults (ArcSwap snapshot)
//!     → validate, flatten method headers
//!     → snapshot interceptors, filter by run_when
//!     → fast path: request stages + pre-flight inline, I/O deferred
//!       chain path: every stage inside one boxed future
//!     → response interceptors
//!     → Response | CourierError
//! ```
//!
//! # Design Decisions
//! - One boolean chosen at chain build selects the execution path
//! - Interceptor mutations only affect requests started afterwards
//! - Each request runs in its own span keyed by a fresh request id

pub mod orchestrator;

pub use orchestrator::{reject, Client, ResponseFuture};
