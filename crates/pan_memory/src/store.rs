use pan_core::PersistentStore;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared access to the persistent store with session-wide degradation.
///
/// The first failed call raises the flag; from then on every call is skipped
/// and callers fall back to in-process state for the rest of the session.
#[derive(Clone)]
pub struct StoreHandle {
    store: Option<Arc<dyn PersistentStore>>,
    degraded: Arc<AtomicBool>,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self {
            store: Some(store),
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle with no store behind it, degraded from the start.
    pub fn offline() -> Self {
        Self {
            store: None,
            degraded: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Run `op` against the store. Returns `None` when degraded or on failure.
    pub async fn call<'a, T, F, Fut>(&'a self, what: &str, op: F) -> Option<T>
    where
        F: FnOnce(&'a dyn PersistentStore) -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + 'a,
    {
        if self.is_degraded() {
            return None;
        }
        let store = self.store.as_deref()?;
        match op(store).await {
            Ok(value) => Some(value),
            Err(e) => {
                self.mark_degraded(what, &e);
                None
            }
        }
    }

    fn mark_degraded(&self, what: &str, err: &anyhow::Error) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                "Memory store failed during {} ({:#}); continuing with short-term memory only",
                what,
                err
            );
        }
    }
}
