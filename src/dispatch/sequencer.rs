//! The dispatch sequence for one request.

use serde_json::Value;
use std::sync::Arc;

use crate::adapters::{AdapterRegistry, Transport};
use crate::config::RequestConfig;
use crate::dispatch::cancel::throw_if_cancellation_requested;
use crate::dispatch::transform::{transform_data, TransformContext};
use crate::error::{CourierError, CourierResult};
use crate::http::Response;

const BODY_METHODS: [&str; 3] = ["post", "put", "patch"];

/// Runs transforms, resolves the adapter and invokes it.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<AdapterRegistry>,
}

/// A request that passed every pre-flight step and only awaits I/O.
pub struct PreparedRequest {
    config: RequestConfig,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    /// Pre-flight steps, run synchronously: cancellation check, header
    /// normalization, request transforms, default content type, adapter
    /// resolution.
    pub fn prepare(&self, mut config: RequestConfig) -> CourierResult<PreparedRequest> {
        throw_if_cancellation_requested(&config)?;

        config.headers.normalize(false);

        let ctx = TransformContext {
            status: None,
            response_type: config.response_type,
            transitional: config.transitional_options(),
        };
        let data = config.data.take().unwrap_or(Value::Null);
        let data = transform_data(
            config.transform_request.as_deref(),
            data,
            &mut config.headers,
            &ctx,
        )?;
        config.data = (!data.is_null()).then_some(data);

        let method = config.method_or_default();
        if BODY_METHODS.contains(&method.as_str()) {
            config
                .headers
                .set_content_type("application/x-www-form-urlencoded", Some(false));
        }

        let selection = config
            .adapter
            .clone()
            .unwrap_or_else(|| self.registry.default_selection());
        let transport = self.registry.resolve(&selection)?;

        tracing::debug!(method = %method, adapter = %transport.name(), "Request prepared");
        Ok(PreparedRequest { config, transport })
    }

    /// `prepare` followed by `send`.
    pub async fn dispatch(&self, config: RequestConfig) -> CourierResult<Response> {
        self.prepare(config)?.send().await
    }
}

impl PreparedRequest {
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Invoke the adapter and post-process its outcome.
    ///
    /// A cancellation observed after the adapter settles takes precedence
    /// over the adapter's own result.
    pub async fn send(self) -> CourierResult<Response> {
        let PreparedRequest { config, transport } = self;
        let outcome = transport.invoke(config.clone()).await;

        match outcome {
            Ok(mut response) => {
                throw_if_cancellation_requested(&config)?;
                post_process(&config, &mut response)?;
                Ok(response)
            }
            Err(err) if err.is_canceled() => Err(err),
            Err(mut err) => {
                throw_if_cancellation_requested(&config)?;
                if let Some(partial) = err.response_mut() {
                    post_process(&config, partial)?;
                }
                Err(err)
            }
        }
    }
}

/// Response transforms and header normalization.
fn post_process(config: &RequestConfig, response: &mut Response) -> CourierResult<()> {
    let ctx = TransformContext {
        status: Some(response.status),
        response_type: config.response_type,
        transitional: config.transitional_options(),
    };
    let data = std::mem::take(&mut response.data);
    response.data = transform_data(
        config.transform_response.as_deref(),
        data,
        &mut response.headers,
        &ctx,
    )
    .map_err(|err| match err {
        CourierError::Transport { .. } => err.with_config(config),
        other => other,
    })?;
    response.headers.normalize(false);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Adapter, AdapterSelection};
    use crate::dispatch::cancel::CancelToken;
    use crate::error::ErrorCode;
    use serde_json::json;

    /// Echoes the dispatched body and headers back.
    fn echo() -> Adapter {
        Adapter::from_fn("echo", |config: RequestConfig| async move {
            let body = json!({
                "data": config.data.clone(),
                "headers": config.headers.to_json(true),
            });
            Ok(Response::new(200, Value::String(body.to_string()), config))
        })
    }

    fn dispatcher() -> Dispatcher {
        let registry = AdapterRegistry::with_builtins();
        registry.register("echo", echo());
        Dispatcher::new(Arc::new(registry))
    }

    fn request(method: &str) -> RequestConfig {
        let mut config = RequestConfig::library_defaults();
        config.url = Some("/x".into());
        config.method = Some(method.into());
        config.adapter = Some("echo".into());
        config
    }

    #[tokio::test]
    async fn test_dispatch_applies_transforms() {
        let config = request("post").with_data(json!({"name": "ada"}));
        let response = dispatcher().dispatch(config).await.unwrap();

        // Forced JSON parsing turned the echoed text back into an object
        assert_eq!(response.data["data"], json!("{\"name\":\"ada\"}"));
        assert_eq!(response.data["headers"]["Content-Type"], json!("application/json"));
    }

    #[tokio::test]
    async fn test_form_default_for_body_methods() {
        let response = dispatcher()
            .dispatch(request("put").with_data(json!("a=1")))
            .await
            .unwrap();
        assert_eq!(
            response.data["headers"]["Content-Type"],
            json!("application/x-www-form-urlencoded")
        );

        let suppressed = request("patch").with_header("Content-Type", false);
        let response = dispatcher().dispatch(suppressed).await.unwrap();
        assert!(response.data["headers"].get("Content-Type").is_none());

        let response = dispatcher().dispatch(request("get")).await.unwrap();
        assert!(response.data["headers"].get("Content-Type").is_none());
    }

    #[tokio::test]
    async fn test_precheck_cancels_before_transforms() {
        let token = CancelToken::new();
        token.cancel(Some("too late"));

        let mut config = request("get").with_cancel_token(token);
        config.transform_request = Some(vec![crate::dispatch::transform::Transform::new(
            |_, _, _| panic!("transform ran after cancellation"),
        )]);

        let err = dispatcher().prepare(config).err().unwrap();
        assert!(err.is_canceled());
        assert_eq!(err.to_string(), "too late");
    }

    #[tokio::test]
    async fn test_unsupported_adapter_fails_prepare() {
        let mut config = request("get");
        config.adapter = Some(AdapterSelection::from("xhr"));
        let err = dispatcher().prepare(config).err().unwrap();
        assert_eq!(err.code(), Some(ErrorCode::NotSupport));
    }

    #[tokio::test]
    async fn test_partial_response_is_transformed() {
        let registry = AdapterRegistry::empty();
        registry.register(
            "failing",
            Adapter::from_fn("failing", |config: RequestConfig| async move {
                let partial = Response::new(500, json!("{\"reason\":\"down\"}"), config.clone());
                Err(CourierError::transport(ErrorCode::BadResponse, "Request failed with status code 500")
                    .with_config(&config)
                    .with_response(partial))
            }),
        );
        let mut config = request("get");
        config.adapter = Some("failing".into());

        let err = Dispatcher::new(Arc::new(registry)).dispatch(config).await.unwrap_err();
        assert_eq!(err.response().map(|r| r.data.clone()), Some(json!({"reason": "down"})));
    }
}
