//! Cooperative cancellation.
//!
//! Both handles are a one-shot flag plus a `Notify`. The dispatcher polls the
//! flag at its checkpoints; adapters may await `cancelled()` to abort I/O.

use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

use crate::config::RequestConfig;
use crate::error::{CourierError, CourierResult};

#[derive(Default)]
struct CancelState {
    reason: OnceLock<String>,
    notify: Notify,
}

impl CancelState {
    fn fire(&self, reason: String) -> bool {
        let first = self.reason.set(reason).is_ok();
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.reason.get().is_some() {
                return;
            }
            notified.await;
        }
    }
}

/// Cancellation handle shared between the caller and a request.
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Only the first reason is kept.
    pub fn cancel(&self, reason: Option<&str>) {
        if self.state.fire(reason.unwrap_or("canceled").to_string()) {
            tracing::debug!("Cancel token fired");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.reason.get().is_some()
    }

    pub fn reason(&self) -> Option<&str> {
        self.state.reason.get().map(String::as_str)
    }

    /// `Err(Canceled)` once cancellation was requested.
    pub fn throw_if_requested(&self, config: Option<&RequestConfig>) -> CourierResult<()> {
        match self.reason() {
            Some(reason) => Err(CourierError::canceled(Some(reason), config)),
            None => Ok(()),
        }
    }

    /// Resolves when cancellation is requested.
    pub async fn cancelled(&self) {
        self.state.wait().await
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &self.reason())
            .finish()
    }
}

/// Owner side of an abort signal.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn abort(&self) {
        if self.signal.state.fire("canceled".to_string()) {
            tracing::debug!("Abort signal fired");
        }
    }
}

/// Read side of an `AbortController`.
#[derive(Clone, Default)]
pub struct AbortSignal {
    state: Arc<CancelState>,
}

impl AbortSignal {
    pub fn aborted(&self) -> bool {
        self.state.reason.get().is_some()
    }

    pub async fn cancelled(&self) {
        self.state.wait().await
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.aborted())
            .finish()
    }
}

/// Fail with `Canceled` if the config's token or signal has fired.
pub fn throw_if_cancellation_requested(config: &RequestConfig) -> CourierResult<()> {
    if let Some(token) = &config.cancel_token {
        token.throw_if_requested(Some(config))?;
    }
    if config.signal.as_ref().is_some_and(AbortSignal::aborted) {
        return Err(CourierError::canceled(None, Some(config)));
    }
    Ok(())
}

/// Resolves with a `Canceled` error once the token or signal fires.
/// Never resolves when the config has neither.
pub async fn cancellation(config: &RequestConfig) -> CourierError {
    let token = config.cancel_token.clone();
    let signal = config.signal.clone();
    let reason = tokio::select! {
        _ = async {
            match &token {
                Some(t) => t.cancelled().await,
                None => std::future::pending().await,
            }
        } => token.as_ref().and_then(|t| t.reason().map(str::to_string)),
        _ = async {
            match &signal {
                Some(s) => s.cancelled().await,
                None => std::future::pending().await,
            }
        } => None,
    };
    CourierError::canceled(reason.as_deref(), Some(config))
}
