//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CourierConfig.defaults becomes the client's instance config
//!
//! Per request:
//!     library defaults × instance config × call-site config
//!     → merge.rs (per-field strategy)
//!     → validation.rs (option bags, method normalization)
//!     → RequestConfig owned by the request until it settles
//! ```
//!
//! # Design Decisions
//! - Every request field is optional so partial configs merge field by field
//! - Function-valued fields are never serialized and never combined
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod merge;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use merge::merge_config;
pub use schema::{CourierConfig, RequestConfig, ResponseType, TransitionalOptions};
