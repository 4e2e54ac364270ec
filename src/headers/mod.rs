//! Header model.
//!
//! # Data Flow
//! ```text
//! defaults / call-site config (maps, raw blocks)
//!     → container.rs (case-insensitive set with overwrite policy)
//!     → merge + flatten in the orchestrator (concat)
//!     → transforms and the adapter read/write the container
//!     → response headers parsed back from raw blocks (parse.rs)
//! ```
//!
//! # Design Decisions
//! - One entry per case-insensitive name; first-seen casing is displayed
//! - `false` is stored as `Disabled` and blocks implicit overwrites
//! - Accessors for common headers are generated from a static table

pub mod accessors;
pub mod container;
pub mod parse;
pub mod value;

pub use accessors::{accessor, HeaderAccessor, ACCESSOR_NAMES};
pub use container::{HeaderMatcher, HeaderPredicate, HeaderSource, Headers};
pub use value::HeaderValue;
