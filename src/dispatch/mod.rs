//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! validated RequestConfig (headers flattened)
//!     → cancel.rs checkpoint
//!     → normalize headers, transform.rs request chain, default content type
//!     → adapter resolution (adapters::registry)
//!     → adapter invoke (the only suspension point)
//!     → cancel.rs checkpoint
//!     → transform.rs response chain, normalize response headers
//! ```
//!
//! # Design Decisions
//! - Pre-flight steps are synchronous so the orchestrator can run them eagerly
//! - Cancellation is polled at two checkpoints, never preemptive
//! - Cancellation errors skip response transforms

pub mod cancel;
pub mod sequencer;
pub mod transform;

pub use cancel::{AbortController, AbortSignal, CancelToken};
pub use sequencer::{Dispatcher, PreparedRequest};
pub use transform::{Transform, TransformContext};
