//! Transport adapters.
//!
//! # Data Flow
//! ```text
//! config.adapter (names and/or handles)
//!     → registry.rs (walk candidates, collect rejections)
//!     → Arc<dyn Transport>
//!     → invoke(config) → Response | transport error
//! ```
//!
//! # Design Decisions
//! - Sentinels describe why a builtin cannot be used; they are never invoked
//! - Unknown names fail at once rather than falling through to the next candidate
//! - Custom transports register by name next to the builtins

#[cfg(feature = "http-adapter")]
pub mod http;
pub mod registry;

pub use registry::AdapterRegistry;

use futures_util::future::BoxFuture;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::config::RequestConfig;
use crate::error::CourierResult;
use crate::http::Response;

/// Something that can perform a request.
///
/// Implementations should honor `config.cancel_token` and `config.signal`
/// where they can, and attach the config to any error they return.
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    fn invoke(&self, config: RequestConfig) -> BoxFuture<'static, CourierResult<Response>>;
}

type InvokeFn = dyn Fn(RequestConfig) -> BoxFuture<'static, CourierResult<Response>> + Send + Sync;

/// Transport backed by a closure.
pub struct FnTransport {
    name: String,
    invoke: Box<InvokeFn>,
}

impl FnTransport {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CourierResult<Response>> + Send + 'static,
    {
        Self {
            name: name.into(),
            invoke: Box::new(move |config| Box::pin(f(config))),
        }
    }
}

impl Transport for FnTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, config: RequestConfig) -> BoxFuture<'static, CourierResult<Response>> {
        (self.invoke)(config)
    }
}

/// A registry entry: a usable transport or a reason it is not usable.
#[derive(Clone)]
pub enum Adapter {
    Transport(Arc<dyn Transport>),
    /// Not supported by the environment.
    Disabled,
    /// Not available in the build.
    Unsupported,
}

impl Adapter {
    pub fn transport(transport: impl Transport + 'static) -> Self {
        Adapter::Transport(Arc::new(transport))
    }

    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CourierResult<Response>> + Send + 'static,
    {
        Self::transport(FnTransport::new(name, f))
    }

    /// Rejection wording for sentinels; `None` for usable transports.
    pub fn rejection(&self) -> Option<&'static str> {
        match self {
            Adapter::Transport(_) => None,
            Adapter::Disabled => Some("is not supported by the environment"),
            Adapter::Unsupported => Some("is not available in the build"),
        }
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adapter::Transport(t) => f.debug_tuple("Transport").field(&t.name()).finish(),
            Adapter::Disabled => f.write_str("Disabled"),
            Adapter::Unsupported => f.write_str("Unsupported"),
        }
    }
}

/// One entry of an adapter selection.
#[derive(Debug, Clone)]
pub enum AdapterCandidate {
    Named(String),
    Adapter(Adapter),
}

impl From<&str> for AdapterCandidate {
    fn from(name: &str) -> Self {
        AdapterCandidate::Named(name.to_string())
    }
}

impl From<String> for AdapterCandidate {
    fn from(name: String) -> Self {
        AdapterCandidate::Named(name)
    }
}

impl From<Adapter> for AdapterCandidate {
    fn from(adapter: Adapter) -> Self {
        AdapterCandidate::Adapter(adapter)
    }
}

/// Ordered adapter candidates. A single name or handle is a one-entry list.
#[derive(Debug, Clone, Default)]
pub struct AdapterSelection(pub Vec<AdapterCandidate>);

impl AdapterSelection {
    /// `xhr`, `http`, `fetch`.
    pub fn default_builtins() -> Self {
        Self(["xhr", "http", "fetch"].into_iter().map(AdapterCandidate::from).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdapterCandidate> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AdapterSelection {
    fn from(name: &str) -> Self {
        Self(vec![name.into()])
    }
}

impl From<String> for AdapterSelection {
    fn from(name: String) -> Self {
        Self(vec![name.into()])
    }
}

impl From<Adapter> for AdapterSelection {
    fn from(adapter: Adapter) -> Self {
        Self(vec![adapter.into()])
    }
}

impl<T: Into<AdapterCandidate>> From<Vec<T>> for AdapterSelection {
    fn from(candidates: Vec<T>) -> Self {
        candidates.into_iter().collect()
    }
}

impl<T: Into<AdapterCandidate>> FromIterator<T> for AdapterSelection {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Handles serialize by transport name; sentinels are dropped.
impl Serialize for AdapterSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<&str> = self
            .0
            .iter()
            .filter_map(|c| match c {
                AdapterCandidate::Named(name) => Some(name.as_str()),
                AdapterCandidate::Adapter(Adapter::Transport(t)) => Some(t.name()),
                AdapterCandidate::Adapter(_) => None,
            })
            .collect();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for AdapterSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SelectionVisitor)
    }
}

struct SelectionVisitor;

impl<'de> Visitor<'de> for SelectionVisitor {
    type Value = AdapterSelection;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an adapter name or a list of adapter names")
    }

    fn visit_str<E: de::Error>(self, name: &str) -> Result<AdapterSelection, E> {
        Ok(AdapterSelection::from(name))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<AdapterSelection, A::Error> {
        let mut candidates = Vec::new();
        while let Some(name) = seq.next_element::<String>()? {
            candidates.push(AdapterCandidate::Named(name));
        }
        Ok(AdapterSelection(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_serde() {
        let one: AdapterSelection = serde_json::from_str(r#""http""#).unwrap();
        assert_eq!(one.len(), 1);

        let many: AdapterSelection = serde_json::from_str(r#"["fetch", "http"]"#).unwrap();
        assert_eq!(serde_json::to_string(&many).unwrap(), r#"["fetch","http"]"#);
    }

    #[test]
    fn test_sentinel_wording() {
        assert_eq!(Adapter::Disabled.rejection(), Some("is not supported by the environment"));
        assert_eq!(Adapter::Unsupported.rejection(), Some("is not available in the build"));
    }
}
