use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Trailing-edge debounce: only the last call within `window` fires, with its own value.
/// A call that already fired is not interrupted by later ones.
#[derive(Clone)]
pub struct Debouncer {
    window: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self { Self { window, generation: Arc::new(AtomicU64::new(0)) } }

    pub fn window(&self) -> Duration { self.window }

    /// Schedule `action(value)` after the window. Any earlier scheduled call that has
    /// not fired yet is dropped. The handle resolves to whether this call fired.
    pub fn call<T, F, Fut>(&self, value: T, action: F) -> JoinHandle<bool>
    where
        T: Send + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mine = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if generation.load(Ordering::SeqCst) != mine {
                debug!(generation = mine, "debounced call superseded");
                return false;
            }
            action(value).await;
            true
        })
    }

    /// Drop whatever is pending without scheduling anything new.
    pub fn cancel(&self) { self.generation.fetch_add(1, Ordering::SeqCst); }
}
