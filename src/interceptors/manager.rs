//! Interceptor registry with stable indices.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::error::CourierError;
use crate::interceptors::handler::{Handler, Interceptor, InterceptorOptions};

type Slots<T> = Vec<Option<Arc<Interceptor<T>>>>;

/// Ordered interceptor arena.
///
/// Ejected slots become tombstones and are never reused, so every index
/// handed out by `register` stays valid until `clear`. Readers take a
/// snapshot of the arena; writers swap in a new one.
pub struct InterceptorManager<T> {
    handlers: ArcSwap<Slots<T>>,
}

impl<T> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self {
            handlers: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl<T: Send + 'static> InterceptorManager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor. Returns its index for `eject`.
    pub fn register(
        &self,
        fulfilled: Option<Handler<T>>,
        rejected: Option<Handler<CourierError, T>>,
        options: InterceptorOptions,
    ) -> usize {
        let entry = Arc::new(Interceptor::new(fulfilled, rejected, options));
        let previous = self.handlers.rcu(|slots| {
            let mut next: Slots<T> = slots.as_ref().clone();
            next.push(Some(Arc::clone(&entry)));
            next
        });
        let index = previous.len();
        tracing::debug!(index, synchronous = entry.is_synchronous(), "Interceptor registered");
        index
    }

    /// Tombstone the slot at `index`. Unknown or ejected indices are ignored.
    pub fn eject(&self, index: usize) {
        let current = self.handlers.load();
        if !matches!(current.get(index), Some(Some(_))) {
            return;
        }
        self.handlers.rcu(|slots| {
            let mut next: Slots<T> = slots.as_ref().clone();
            if let Some(slot) = next.get_mut(index) {
                *slot = None;
            }
            next
        });
        tracing::debug!(index, "Interceptor ejected");
    }

    /// Drop every slot. Indexing restarts at zero.
    pub fn clear(&self) {
        self.handlers.store(Arc::new(Vec::new()));
    }

    /// Visit live interceptors in registration order.
    pub fn for_each(&self, mut visit: impl FnMut(&Interceptor<T>)) {
        let slots = self.handlers.load_full();
        for interceptor in slots.iter().flatten() {
            visit(interceptor);
        }
    }

    /// Live interceptors as of now, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Interceptor<T>>> {
        self.handlers.load().iter().flatten().cloned().collect()
    }

    /// Number of live interceptors.
    pub fn len(&self) -> usize {
        self.handlers.load().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagging(tag: &'static str) -> Handler<Vec<&'static str>> {
        Handler::sync(move |mut seen: Vec<&'static str>| {
            seen.push(tag);
            Ok(seen)
        })
    }

    async fn run_all(manager: &InterceptorManager<Vec<&'static str>>) -> Vec<&'static str> {
        let mut state = Ok(Vec::new());
        for interceptor in manager.snapshot() {
            state = interceptor.settle(state).await;
        }
        state.unwrap()
    }

    #[tokio::test]
    async fn test_registration_order() {
        let manager = InterceptorManager::new();
        assert_eq!(manager.register(Some(tagging("a")), None, InterceptorOptions::default()), 0);
        assert_eq!(manager.register(Some(tagging("b")), None, InterceptorOptions::default()), 1);

        assert_eq!(run_all(&manager).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_eject_leaves_tombstone() {
        let manager = InterceptorManager::new();
        let a = manager.register(Some(tagging("a")), None, InterceptorOptions::default());
        let b = manager.register(Some(tagging("b")), None, InterceptorOptions::default());

        manager.eject(a);
        assert_eq!(run_all(&manager).await, vec!["b"]);

        // Indices are not reused or renumbered
        let c = manager.register(Some(tagging("c")), None, InterceptorOptions::default());
        assert_eq!(c, 2);
        manager.eject(a);
        manager.eject(99);
        assert_eq!(run_all(&manager).await, vec!["b", "c"]);

        manager.eject(b);
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets() {
        let manager = InterceptorManager::new();
        manager.register(Some(tagging("a")), None, InterceptorOptions::default());
        manager.clear();
        assert!(manager.is_empty());
        assert_eq!(manager.register(Some(tagging("z")), None, InterceptorOptions::default()), 0);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let manager = InterceptorManager::new();
        manager.register(Some(tagging("a")), None, InterceptorOptions::default());

        let snapshot = manager.snapshot();
        manager.register(Some(tagging("b")), None, InterceptorOptions::default());
        manager.eject(0);

        assert_eq!(snapshot.len(), 1);
        let mut visited = 0;
        manager.for_each(|_| visited += 1);
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_synchronous_requires_sync_handlers() {
        let manager: InterceptorManager<u32> = InterceptorManager::new();
        manager.register(Some(Handler::sync(Ok)), None, InterceptorOptions::synchronous());
        manager.register(
            Some(Handler::future(|n: u32| async move { Ok::<_, CourierError>(n) })),
            None,
            InterceptorOptions::synchronous(),
        );
        manager.register(Some(Handler::sync(Ok)), None, InterceptorOptions::default());

        let flags: Vec<bool> = manager.snapshot().iter().map(|i| i.is_synchronous()).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[tokio::test]
    async fn test_rejected_handler_recovers() {
        let manager: InterceptorManager<u32> = InterceptorManager::new();
        manager.register(
            None,
            Some(Handler::sync(|_err: CourierError| Ok(7))),
            InterceptorOptions::default(),
        );

        let snapshot = manager.snapshot();
        let interceptor = &snapshot[0];
        let settled = interceptor.settle(Err(CourierError::other("boom"))).await;
        assert_eq!(settled.unwrap(), 7);
        assert_eq!(interceptor.settle(Ok(3)).await.unwrap(), 3);
    }
}
