//! Request orchestration: merge, validate, build chains, run.

use arc_swap::ArcSwap;
use futures_util::future::{self, BoxFuture};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::adapters::AdapterRegistry;
use crate::config::merge::{merge_config, merge_headers};
use crate::config::validation::validate_request;
use crate::config::{CourierConfig, RequestConfig};
use crate::dispatch::Dispatcher;
use crate::error::{CourierError, CourierResult};
use crate::headers::HeaderSource;
use crate::http::request::{build_full_path, build_url, ParamsSerializerConfig};
use crate::http::Response;
use crate::interceptors::{Interceptor, Interceptors};
use crate::observability::metrics;

/// Eventual outcome of one request.
pub type ResponseFuture = BoxFuture<'static, CourierResult<Response>>;

/// HTTP client: instance defaults, interceptors and adapters.
///
/// Cloning is cheap and clones share all three.
#[derive(Clone)]
pub struct Client {
    defaults: Arc<ArcSwap<RequestConfig>>,
    interceptors: Arc<Interceptors>,
    adapters: Arc<AdapterRegistry>,
    dispatcher: Dispatcher,
    strict_options: bool,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Client over the library defaults.
    pub fn new() -> Self {
        Self::with_config(RequestConfig::new())
    }

    /// Client whose defaults are `instance` merged over the library defaults.
    pub fn with_config(instance: RequestConfig) -> Self {
        let adapters = Arc::new(AdapterRegistry::with_builtins());
        Self {
            defaults: Arc::new(ArcSwap::from_pointee(merge_config(
                &RequestConfig::library_defaults(),
                &instance,
            ))),
            interceptors: Arc::new(Interceptors::default()),
            dispatcher: Dispatcher::new(Arc::clone(&adapters)),
            adapters,
            strict_options: false,
        }
    }

    /// Client configured from a loaded settings file.
    pub fn from_settings(settings: &CourierConfig) -> Self {
        Self::with_config(settings.defaults.clone()).strict(settings.validation.strict_options)
    }

    /// Treat unknown transitional flags as fatal.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_options = strict;
        self
    }

    /// Use a different adapter registry.
    pub fn with_adapters(mut self, adapters: Arc<AdapterRegistry>) -> Self {
        self.dispatcher = Dispatcher::new(Arc::clone(&adapters));
        self.adapters = adapters;
        self
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Current instance defaults.
    pub fn defaults(&self) -> Arc<RequestConfig> {
        self.defaults.load_full()
    }

    /// Replace the instance defaults. In-flight requests keep their snapshot.
    pub fn set_defaults(&self, defaults: RequestConfig) {
        self.defaults.store(Arc::new(defaults));
    }

    /// Edit the instance defaults in place.
    pub fn update_defaults(&self, edit: impl Fn(&mut RequestConfig)) {
        self.defaults.rcu(|current| {
            let mut next = RequestConfig::clone(current);
            edit(&mut next);
            next
        });
    }

    /// Start a request.
    ///
    /// Merge and validation errors are returned directly. When every
    /// applicable request interceptor is synchronous they run before this
    /// returns, together with the pre-flight dispatch steps; otherwise all
    /// stages run inside the returned future.
    pub fn request(&self, input: impl Into<RequestConfig>) -> CourierResult<ResponseFuture> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("request", request_id = %request_id);
        let _entered = span.enter();

        let mut config = merge_config(&self.defaults.load(), &input.into());
        validate_request(&mut config, self.strict_options)?;
        let method = config.method_or_default();
        flatten_headers(&mut config, &method);

        let mut synchronous = true;
        let mut request_chain: Vec<Arc<Interceptor<RequestConfig>>> = Vec::new();
        for interceptor in self.interceptors.request.snapshot() {
            if !interceptor.should_run(&config) {
                continue;
            }
            synchronous &= interceptor.is_synchronous();
            request_chain.push(interceptor);
        }
        // Last registered request interceptor runs first
        request_chain.reverse();
        let response_chain = self.interceptors.response.snapshot();

        tracing::debug!(
            method = %method,
            url = config.url.as_deref().unwrap_or(""),
            request_interceptors = request_chain.len(),
            response_interceptors = response_chain.len(),
            synchronous,
            "Request started"
        );

        let outcome: ResponseFuture = if synchronous {
            self.run_sync(config, &request_chain, response_chain)?
        } else {
            let dispatcher = self.dispatcher.clone();
            Box::pin(async move {
                let mut state = Ok(config);
                for interceptor in &request_chain {
                    state = interceptor.settle(state).await;
                }
                let dispatched = match state {
                    Ok(config) => dispatcher.dispatch(config).await,
                    Err(err) => Err(err),
                };
                run_response_chain(dispatched, &response_chain).await
            })
        };

        let start = Instant::now();
        Ok(Box::pin(
            async move {
                let result = outcome.await;
                let label = match &result {
                    Ok(response) => response.status.to_string(),
                    Err(err) => err.code().map_or("error", |c| c.as_str()).to_string(),
                };
                metrics::record_request(&method, &label, start);
                match &result {
                    Ok(response) => tracing::debug!(status = response.status, "Request settled"),
                    Err(err) => tracing::debug!(error = %err, "Request failed"),
                }
                result
            }
            .instrument(span.clone()),
        ))
    }

    /// Fast path: request interceptors and pre-flight run inline.
    fn run_sync(
        &self,
        config: RequestConfig,
        request_chain: &[Arc<Interceptor<RequestConfig>>],
        response_chain: Vec<Arc<Interceptor<Response>>>,
    ) -> CourierResult<ResponseFuture> {
        let mut current = config;
        for interceptor in request_chain {
            let Some(fulfilled) = &interceptor.fulfilled else {
                continue;
            };
            let Some(result) = fulfilled.call_now(current.clone()) else {
                continue;
            };
            match result {
                Ok(next) => current = next,
                Err(err) => {
                    let Some(rejected) = &interceptor.rejected else {
                        return Err(err);
                    };
                    // A recovered value is not fed forward; the walk stops
                    if let Some(Err(err)) = rejected.call_now(err) {
                        return Err(err);
                    }
                    tracing::debug!("Request interceptor recovered; continuing with last config");
                    break;
                }
            }
        }

        let prepared = match self.dispatcher.prepare(current) {
            Ok(prepared) => prepared,
            // Settles without running response interceptors
            Err(err) => return Ok(Box::pin(future::ready(Err(err)))),
        };

        Ok(Box::pin(async move {
            let dispatched = prepared.send().await;
            run_response_chain(dispatched, &response_chain).await
        }))
    }

    /// Start a request and wait for it.
    pub async fn send(&self, input: impl Into<RequestConfig>) -> CourierResult<Response> {
        self.request(input)?.await
    }

    /// Request with an explicit method, url and optional body.
    pub async fn send_with(
        &self,
        method: &str,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> CourierResult<Response> {
        let mut config = config.with_method(method).with_url(url);
        if data.is_some() {
            config.data = data;
        }
        self.send(config).await
    }

    pub async fn get(&self, url: &str) -> CourierResult<Response> {
        self.send_with("get", url, None, RequestConfig::new()).await
    }

    pub async fn delete(&self, url: &str) -> CourierResult<Response> {
        self.send_with("delete", url, None, RequestConfig::new()).await
    }

    pub async fn head(&self, url: &str) -> CourierResult<Response> {
        self.send_with("head", url, None, RequestConfig::new()).await
    }

    pub async fn options(&self, url: &str) -> CourierResult<Response> {
        self.send_with("options", url, None, RequestConfig::new()).await
    }

    pub async fn post(&self, url: &str, data: Value) -> CourierResult<Response> {
        self.send_with("post", url, Some(data), RequestConfig::new()).await
    }

    pub async fn put(&self, url: &str, data: Value) -> CourierResult<Response> {
        self.send_with("put", url, Some(data), RequestConfig::new()).await
    }

    pub async fn patch(&self, url: &str, data: Value) -> CourierResult<Response> {
        self.send_with("patch", url, Some(data), RequestConfig::new()).await
    }

    /// Full URL a request would be sent to, params included.
    pub fn get_uri(&self, input: impl Into<RequestConfig>) -> String {
        let config = merge_config(&self.defaults.load(), &input.into());
        let full = build_full_path(config.base_url.as_deref(), config.url.as_deref().unwrap_or(""));
        let serializer = config.params_serializer.map(ParamsSerializerConfig::normalize);
        build_url(&full, config.params.as_ref(), serializer.as_ref())
    }
}

/// Fold the `common` and method buckets into the flat headers.
///
/// Flat headers win over bucket headers, except where a bucket disabled one.
fn flatten_headers(config: &mut RequestConfig, method: &str) {
    let buckets = std::mem::take(&mut config.method_headers);
    let common = buckets.get("common").cloned().unwrap_or_default();
    let context = match buckets.get(method) {
        Some(specific) => merge_headers(&common, specific),
        None => common,
    };
    let flat = std::mem::take(&mut config.headers);
    config.headers = context.concat([HeaderSource::from(flat)]);
}

async fn run_response_chain(
    mut outcome: CourierResult<Response>,
    chain: &[Arc<Interceptor<Response>>],
) -> CourierResult<Response> {
    for interceptor in chain {
        outcome = interceptor.settle(outcome).await;
    }
    outcome
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("request_interceptors", &self.interceptors.request.len())
            .field("response_interceptors", &self.interceptors.response.len())
            .field("adapters", &self.adapters.names())
            .field("strict_options", &self.strict_options)
            .finish()
    }
}

/// Surface a handler-raised error from inside a closure.
pub fn reject<T>(message: impl Into<String>) -> CourierResult<T> {
    Err(CourierError::other(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Adapter;
    use crate::interceptors::{Handler, InterceptorOptions};
    use serde_json::json;

    fn echo_client() -> Client {
        let client = Client::with_config(RequestConfig::new().with_adapter("echo"));
        client.adapters().register(
            "echo",
            Adapter::from_fn("echo", |config: RequestConfig| async move {
                let headers = Value::Object(config.headers.to_json(true));
                Ok(Response::new(200, headers, config))
            }),
        );
        client
    }

    #[test]
    fn test_flatten_headers() {
        let mut config = RequestConfig::library_defaults().with_header("X-Flat", "1");
        config
            .method_headers
            .get_mut("post")
            .unwrap()
            .set("Content-Type", "text/csv");
        config
            .method_headers
            .get_mut("get")
            .unwrap()
            .set("X-Get-Only", "1");

        flatten_headers(&mut config, "post");
        assert!(config.method_headers.is_empty());
        assert_eq!(config.headers.get_str("accept").as_deref(), Some("application/json, text/plain, */*"));
        assert_eq!(config.headers.get_str("content-type").as_deref(), Some("text/csv"));
        assert!(!config.headers.has("x-get-only"));
        assert!(config.headers.has("x-flat"));
    }

    #[test]
    fn test_merge_errors_return_directly() {
        let client = echo_client();
        let mut config = RequestConfig::from("/x");
        let mut transitional = serde_json::Map::new();
        transitional.insert("silent_json_parsing".into(), json!(1));
        config.transitional = Some(transitional);

        let err = client.request(config).err().unwrap();
        assert_eq!(err.to_string(), "option silent_json_parsing must be a boolean");
    }

    #[tokio::test]
    async fn test_sync_rejection_recovers_with_last_config() {
        let client = echo_client();
        client.interceptors().request.register(
            Some(Handler::sync(|_config: RequestConfig| reject("broken"))),
            Some(Handler::sync(|_err: CourierError| Ok(RequestConfig::from("/ignored")))),
            InterceptorOptions::synchronous(),
        );
        client.interceptors().request.register(
            Some(Handler::sync(|config: RequestConfig| Ok(config.with_header("X-Second", "1")))),
            None,
            InterceptorOptions::synchronous(),
        );

        let response = client.send("/x").await.unwrap();
        // Last registered ran first and its change survived
        assert_eq!(response.data["X-Second"], json!("1"));
        assert_eq!(response.config.url.as_deref(), Some("/x"));
    }

    #[test]
    fn test_sync_rejection_without_handler_fails_request() {
        let client = echo_client();
        client.interceptors().request.register(
            Some(Handler::sync(|_config: RequestConfig| reject("denied"))),
            None,
            InterceptorOptions::synchronous(),
        );
        let err = client.request("/x").err().unwrap();
        assert_eq!(err.to_string(), "denied");
    }

    #[tokio::test]
    async fn test_sync_prepare_failure_skips_response_interceptors() {
        let client = echo_client();
        client.interceptors().response.register(
            None,
            Some(Handler::sync(|_err: CourierError| reject("response interceptor ran"))),
            InterceptorOptions::default(),
        );

        let future = client.request(RequestConfig::from("/x").with_adapter("bogus")).unwrap();
        let err = future.await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown adapter 'bogus'");
    }

    #[tokio::test]
    async fn test_run_when_filters_interceptor() {
        let client = echo_client();
        client.interceptors().request.register(
            Some(Handler::future(|config: RequestConfig| async move {
                Ok(config.with_header("X-Async", "1"))
            })),
            None,
            InterceptorOptions::default().run_when(|config| config.url.as_deref() == Some("/only")),
        );

        let skipped = client.send("/other").await.unwrap();
        assert!(skipped.data.get("X-Async").is_none());
        let applied = client.send("/only").await.unwrap();
        assert_eq!(applied.data["X-Async"], json!("1"));
    }

    #[test]
    fn test_get_uri() {
        let mut instance = RequestConfig::new();
        instance.base_url = Some("https://api.example.com/v1/".into());
        let client = Client::with_config(instance);

        let mut config = RequestConfig::from("/users");
        config.params = serde_json::from_value(json!({"page": 3})).ok();
        assert_eq!(client.get_uri(config), "https://api.example.com/v1/users?page=3");
    }

    #[test]
    fn test_update_defaults() {
        let client = Client::new();
        client.update_defaults(|d| d.timeout = Some(1500));
        assert_eq!(client.defaults().timeout, Some(1500));
        assert!(client.defaults().method_headers.contains_key("common"));
    }
}
