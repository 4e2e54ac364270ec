//! Adapter lookup and resolution.

use dashmap::DashMap;
use std::sync::Arc;

use crate::adapters::{Adapter, AdapterCandidate, AdapterSelection, Transport};
use crate::error::{CourierError, CourierResult};
use crate::observability::metrics;

/// Named adapters available to a client.
///
/// Names are matched case-insensitively. Builtins are `http`, `xhr` and
/// `fetch`; only `http` can perform I/O, and only when the `http-adapter`
/// feature is enabled.
pub struct AdapterRegistry {
    adapters: DashMap<String, Adapter>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl AdapterRegistry {
    /// Empty registry, without builtins.
    pub fn empty() -> Self {
        Self {
            adapters: DashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        registry.register("xhr", Adapter::Disabled);
        registry.register("fetch", Adapter::Disabled);
        #[cfg(feature = "http-adapter")]
        registry.register("http", Adapter::transport(crate::adapters::http::HttpAdapter::new()));
        #[cfg(not(feature = "http-adapter"))]
        registry.register("http", Adapter::Unsupported);
        registry
    }

    /// Register or replace an adapter under `name`.
    pub fn register(&self, name: &str, adapter: Adapter) {
        tracing::debug!(adapter = %name, kind = ?adapter, "Adapter registered");
        self.adapters.insert(name.to_lowercase(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Adapter> {
        self.adapters.get(&name.to_lowercase()).map(|entry| entry.value().clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Selection used when a request names no adapter.
    pub fn default_selection(&self) -> AdapterSelection {
        AdapterSelection::default_builtins()
    }

    /// Walk `selection` in order and return the first usable transport.
    ///
    /// Sentinels are recorded as rejections and the walk continues. An
    /// unregistered name fails immediately with `UnknownAdapter`. When no
    /// candidate is usable the error lists every rejection.
    pub fn resolve(&self, selection: &AdapterSelection) -> CourierResult<Arc<dyn Transport>> {
        let mut rejected: Vec<(String, &'static str)> = Vec::new();

        for (index, candidate) in selection.iter().enumerate() {
            let (id, adapter) = match candidate {
                AdapterCandidate::Adapter(adapter) => (format!("#{}", index), adapter.clone()),
                AdapterCandidate::Named(name) => match self.get(name) {
                    Some(adapter) => (name.clone(), adapter),
                    None => {
                        tracing::warn!(adapter = %name, "Unknown adapter requested");
                        return Err(CourierError::UnknownAdapter(name.clone()));
                    }
                },
            };

            match adapter {
                Adapter::Transport(transport) => {
                    tracing::trace!(adapter = %transport.name(), "Adapter resolved");
                    metrics::record_adapter_resolution(transport.name(), true);
                    return Ok(transport);
                }
                sentinel => {
                    metrics::record_adapter_resolution(&id, false);
                    if let Some(reason) = sentinel.rejection() {
                        rejected.push((id, reason));
                    }
                }
            }
        }

        Err(CourierError::NotSupported(describe_rejections(&rejected)))
    }
}

fn describe_rejections(rejected: &[(String, &'static str)]) -> String {
    let lines: Vec<String> = rejected
        .iter()
        .map(|(id, reason)| format!("adapter {} {}", id, reason))
        .collect();
    match lines.as_slice() {
        [] => "as no adapter specified".to_string(),
        [single] => format!("- {}", single),
        many => format!("since :\n- {}", many.join("\n- ")),
    }
}
