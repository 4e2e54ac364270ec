//! Configuration validation.
//!
//! # Responsibilities
//! - Option-bag checks run on every request (`assert_options`, transitional flags)
//! - Per-request normalization before chain build (`validate_request`)
//! - Semantic checks of the settings file (`validate_config`)
//!
//! # Design Decisions
//! - Settings validation returns all errors, not just the first
//! - Per-request validation fails on the first bad option, before dispatch
//! - Unknown options warn unless the caller asks for strictness

use serde_json::{Map, Value};

use crate::config::schema::{CourierConfig, RequestConfig, TransitionalOptions};
use crate::error::{CourierError, CourierResult, ErrorCode};
use crate::http::request::ParamsSerializerConfig;

/// Predicate a single option value must satisfy.
pub type OptionValidator = fn(&Value) -> bool;

pub fn boolean(value: &Value) -> bool {
    value.is_boolean()
}

/// Recognized transitional flags.
pub const TRANSITIONAL_SCHEMA: &[(&str, OptionValidator)] = &[
    (TransitionalOptions::SILENT_JSON_PARSING, boolean),
    (TransitionalOptions::FORCED_JSON_PARSING, boolean),
    (TransitionalOptions::CLARIFY_TIMEOUT_ERROR, boolean),
];

/// Check an option bag against `schema`.
///
/// Fails on the first recognized option whose value is rejected. Unknown
/// options fail with `ERR_BAD_OPTION` unless `allow_unknown`, in which case
/// they are logged and skipped.
pub fn assert_options(
    options: &Map<String, Value>,
    schema: &[(&str, OptionValidator)],
    allow_unknown: bool,
) -> CourierResult<()> {
    for (name, value) in options {
        match schema.iter().find(|(known, _)| known == name) {
            Some((_, validator)) => {
                if !validator(value) {
                    return Err(CourierError::validation(
                        ErrorCode::BadOptionValue,
                        format!("option {} must be a boolean", name),
                    ));
                }
            }
            None if allow_unknown => {
                tracing::warn!(option = %name, "Unknown option ignored");
            }
            None => {
                return Err(CourierError::validation(
                    ErrorCode::BadOption,
                    format!("Unknown option {}", name),
                ));
            }
        }
    }
    Ok(())
}

/// Validate and normalize a merged config in place.
///
/// Transitional flags are checked, a bare serializer function is wrapped
/// into the options form, and the method is lower-cased (default `get`).
pub fn validate_request(config: &mut RequestConfig, strict: bool) -> CourierResult<()> {
    if let Some(transitional) = &config.transitional {
        assert_options(transitional, TRANSITIONAL_SCHEMA, !strict)?;
    }

    if let Some(serializer) = config.params_serializer.take() {
        config.params_serializer = Some(ParamsSerializerConfig::Options(serializer.normalize()));
    }

    config.method = Some(config.method_or_default());
    Ok(())
}

/// A single settings-file problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Semantic checks of a parsed settings file.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let defaults = &config.defaults;

    if let Some(transitional) = &defaults.transitional {
        if let Err(err) = assert_options(
            transitional,
            TRANSITIONAL_SCHEMA,
            !config.validation.strict_options,
        ) {
            errors.push(ValidationError::new("defaults.transitional", err.to_string()));
        }
    }

    if let Some(base_url) = &defaults.base_url {
        if let Err(err) = url::Url::parse(base_url) {
            errors.push(ValidationError::new(
                "defaults.base_url",
                format!("'{}' is not an absolute URL: {}", base_url, err),
            ));
        }
    }

    if let Some(method) = &defaults.method {
        if method.trim().is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(ValidationError::new(
                "defaults.method",
                format!("'{}' is not a valid method", method),
            ));
        }
    }

    for (field, limit) in [
        ("defaults.max_content_length", defaults.max_content_length),
        ("defaults.max_body_length", defaults.max_body_length),
    ] {
        if matches!(limit, Some(n) if n < -1) {
            errors.push(ValidationError::new(field, "must be -1 (unlimited) or a byte count"));
        }
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not one of {}", config.observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
