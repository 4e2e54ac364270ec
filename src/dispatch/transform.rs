//! Request and response data transforms.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::config::{ResponseType, TransitionalOptions};
use crate::error::{CourierError, CourierResult, ErrorCode};
use crate::headers::Headers;

/// What a transform can see besides the data and headers.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext {
    /// Response status; `None` for request transforms.
    pub status: Option<u16>,
    pub response_type: Option<ResponseType>,
    pub transitional: TransitionalOptions,
}

type TransformFn =
    dyn Fn(Value, &mut Headers, &TransformContext) -> CourierResult<Value> + Send + Sync;

/// One stage of a transform chain.
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    pub fn new(
        f: impl Fn(Value, &mut Headers, &TransformContext) -> CourierResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, data: Value, headers: &mut Headers, ctx: &TransformContext) -> CourierResult<Value> {
        (self.0)(data, headers, ctx)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Run a chain left to right, each output feeding the next stage.
pub fn transform_data(
    chain: Option<&[Transform]>,
    data: Value,
    headers: &mut Headers,
    ctx: &TransformContext,
) -> CourierResult<Value> {
    let Some(chain) = chain else {
        return Ok(data);
    };
    chain
        .iter()
        .try_fold(data, |data, transform| transform.apply(data, headers, ctx))
}

fn has_json_content_type(headers: &Headers) -> bool {
    headers
        .content_type()
        .and_then(|v| v.as_str())
        .is_some_and(|ct| ct.contains("application/json"))
}

/// Strings that already parse as JSON pass through trimmed; anything else is
/// encoded.
fn stringify_safely(data: &Value) -> CourierResult<Value> {
    if let Value::String(raw) = data {
        if serde_json::from_str::<Value>(raw).is_ok() {
            return Ok(Value::String(raw.trim().to_string()));
        }
    }
    serde_json::to_string(data)
        .map(Value::String)
        .map_err(|e| CourierError::other(format!("failed to encode request body: {}", e)))
}

/// Objects and arrays become a JSON text body with `application/json`
/// unless a content type was already chosen.
pub fn default_transform_request() -> Transform {
    Transform::new(|data, headers, _ctx| {
        let is_object_payload = matches!(data, Value::Object(_) | Value::Array(_));
        if is_object_payload || (!data.is_null() && has_json_content_type(headers)) {
            headers.set_content_type("application/json", Some(false));
            return stringify_safely(&data);
        }
        Ok(data)
    })
}

/// Parses string bodies as JSON when asked to (or forced by the transitional
/// flags).
pub fn default_transform_response() -> Transform {
    Transform::new(|data, _headers, ctx| {
        let Value::String(text) = &data else {
            return Ok(data);
        };
        let json_requested = ctx.response_type == Some(ResponseType::Json);
        let forced = ctx.transitional.forced_json_parsing && ctx.response_type.is_none();
        if text.is_empty() || !(json_requested || forced) {
            return Ok(data);
        }

        match serde_json::from_str::<Value>(text) {
            Ok(parsed) => Ok(parsed),
            Err(err) if !ctx.transitional.silent_json_parsing && json_requested => {
                Err(CourierError::transport(ErrorCode::BadResponse, err.to_string()).with_cause(err))
            }
            Err(_) => Ok(data),
        }
    })
}
