//! Interceptor handler types.

use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::config::RequestConfig;
use crate::error::{CourierError, CourierResult};

pub type SyncFn<I, O> = Arc<dyn Fn(I) -> CourierResult<O> + Send + Sync>;
pub type AsyncFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, CourierResult<O>> + Send + Sync>;

/// Predicate deciding whether a request interceptor joins the chain.
pub type RunWhen = Arc<dyn Fn(&RequestConfig) -> bool + Send + Sync>;

/// A fulfilled or rejected handler.
///
/// `Sync` handlers may run inline on the fast path; `Async` handlers can only
/// run as a stage of the deferred chain.
pub enum Handler<I, O = I> {
    Sync(SyncFn<I, O>),
    Async(AsyncFn<I, O>),
}

impl<I, O> Clone for Handler<I, O> {
    fn clone(&self) -> Self {
        match self {
            Handler::Sync(f) => Handler::Sync(Arc::clone(f)),
            Handler::Async(f) => Handler::Async(Arc::clone(f)),
        }
    }
}

impl<I, O> fmt::Debug for Handler<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

impl<I: Send + 'static, O: Send + 'static> Handler<I, O> {
    pub fn sync(f: impl Fn(I) -> CourierResult<O> + Send + Sync + 'static) -> Self {
        Handler::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CourierResult<O>> + Send + 'static,
    {
        Handler::Async(Arc::new(move |input| Box::pin(f(input))))
    }

    pub fn is_sync(&self) -> bool {
        matches!(self, Handler::Sync(_))
    }

    pub async fn call(&self, input: I) -> CourierResult<O> {
        match self {
            Handler::Sync(f) => f(input),
            Handler::Async(f) => f(input).await,
        }
    }

    /// Run inline. `None` for async handlers.
    pub fn call_now(&self, input: I) -> Option<CourierResult<O>> {
        match self {
            Handler::Sync(f) => Some(f(input)),
            Handler::Async(_) => None,
        }
    }
}

/// Options accepted by `InterceptorManager::register`.
#[derive(Clone, Default)]
pub struct InterceptorOptions {
    /// Declare the handlers non-suspending so the fast path may be taken.
    pub synchronous: bool,
    pub run_when: Option<RunWhen>,
}

impl InterceptorOptions {
    pub fn synchronous() -> Self {
        Self {
            synchronous: true,
            run_when: None,
        }
    }

    pub fn run_when(mut self, f: impl Fn(&RequestConfig) -> bool + Send + Sync + 'static) -> Self {
        self.run_when = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for InterceptorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorOptions")
            .field("synchronous", &self.synchronous)
            .field("run_when", &self.run_when.is_some())
            .finish()
    }
}

/// One registered interceptor.
pub struct Interceptor<T> {
    pub fulfilled: Option<Handler<T>>,
    pub rejected: Option<Handler<CourierError, T>>,
    synchronous: bool,
    run_when: Option<RunWhen>,
}

impl<T: Send + 'static> Interceptor<T> {
    pub(crate) fn new(
        fulfilled: Option<Handler<T>>,
        rejected: Option<Handler<CourierError, T>>,
        options: InterceptorOptions,
    ) -> Self {
        let all_sync = fulfilled.as_ref().map_or(true, Handler::is_sync)
            && rejected.as_ref().map_or(true, Handler::is_sync);
        if options.synchronous && !all_sync {
            tracing::warn!("Interceptor declared synchronous but has async handlers; using the deferred chain");
        }

        Self {
            fulfilled,
            rejected,
            synchronous: options.synchronous && all_sync,
            run_when: options.run_when,
        }
    }

    /// Declared synchronous and every handler can run inline.
    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// False only when a `run_when` predicate rejects the config.
    pub fn should_run(&self, config: &RequestConfig) -> bool {
        self.run_when.as_ref().map_or(true, |f| f(config))
    }

    /// Advance a chain by one stage: fulfilled on `Ok`, rejected on `Err`,
    /// pass-through when the matching handler is absent.
    pub async fn settle(&self, state: CourierResult<T>) -> CourierResult<T> {
        match state {
            Ok(value) => match &self.fulfilled {
                Some(handler) => handler.call(value).await,
                None => Ok(value),
            },
            Err(err) => match &self.rejected {
                Some(handler) => handler.call(err).await,
                None => Err(err),
            },
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("fulfilled", &self.fulfilled)
            .field("rejected", &self.rejected)
            .field("synchronous", &self.synchronous)
            .field("run_when", &self.run_when.is_some())
            .finish()
    }
}
