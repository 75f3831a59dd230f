//! Graceful Shutdown Coordination
//!
//! [`Graceful`] is shared by every supervised service. Services register
//! shutdown hooks with it, and any of them can ask the whole process to
//! stop.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::signal;
use tokio::sync::watch;

type ShutdownHook = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

#[derive(Default)]
struct Hooks {
    pending: Vec<ShutdownHook>,
    /// Set once the hooks have been taken for running.
    drained: bool,
}

/// Process-wide shutdown coordinator.
///
/// # Example
///
/// ```rust
/// use meshestra_http::lifecycle::Graceful;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let graceful = Graceful::new();
/// graceful.add_shutdown_handler(|| async {
///     // close connections, flush buffers...
/// });
///
/// graceful.shutdown();
/// graceful.wait().await;
/// graceful.run_shutdown_handlers().await;
/// # }
/// ```
pub struct Graceful {
    hooks: Mutex<Hooks>,
    requested: watch::Sender<bool>,
    requests: AtomicUsize,
}

impl Default for Graceful {
    fn default() -> Self {
        Self::new()
    }
}

impl Graceful {
    pub fn new() -> Self {
        Self {
            hooks: Mutex::new(Hooks::default()),
            requested: watch::Sender::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    /// Register a hook to run once when the process shuts down.
    ///
    /// A hook added after the hooks have already run is started right away
    /// on the current tokio runtime.
    pub fn add_shutdown_handler<F, Fut>(&self, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: ShutdownHook = Box::new(move || -> Pin<Box<dyn Future<Output = ()> + Send>> {
            Box::pin(hook())
        });

        {
            let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            if !hooks.drained {
                hooks.pending.push(hook);
                return;
            }
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Shutdown already in progress, running late hook now");
                handle.spawn(hook());
            }
            Err(_) => {
                tracing::warn!("Late shutdown hook dropped: no tokio runtime to run it on");
            }
        }
    }

    /// Ask the whole process to shut down.
    pub fn shutdown(&self) {
        let previous = self.requests.fetch_add(1, Ordering::SeqCst);
        if previous == 0 {
            tracing::info!("Shutdown requested");
        }
        self.requested.send_replace(true);
    }

    /// How many times [`Graceful::shutdown`] has been called.
    pub fn shutdown_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        *self.requested.borrow()
    }

    /// Hooks waiting for [`Graceful::run_shutdown_handlers`].
    pub fn handler_count(&self) -> usize {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    /// Wait until shutdown is requested.
    pub async fn wait(&self) {
        wait_until_set(self.requested.subscribe()).await;
    }

    /// Wait until shutdown is requested or the process receives SIGINT or
    /// SIGTERM.
    pub async fn wait_for_signal(&self) {
        tokio::select! {
            _ = self.wait() => {},
            _ = shutdown_signal() => self.shutdown(),
        }
    }

    /// Run every registered hook, most recently registered first.
    ///
    /// Hooks are consumed, so each runs at most once. Hooks added later run
    /// as soon as they are added.
    pub async fn run_shutdown_handlers(&self) {
        let hooks = {
            let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            hooks.drained = true;
            std::mem::take(&mut hooks.pending)
        };

        tracing::info!("Starting graceful shutdown ({} hooks)...", hooks.len());
        for hook in hooks.into_iter().rev() {
            hook().await;
        }
        tracing::info!("Graceful shutdown complete");
    }
}

/// Resolve once the watched flag is set, or once its sender is gone.
pub(crate) async fn wait_until_set(mut flag: watch::Receiver<bool>) {
    while !*flag.borrow_and_update() {
        if flag.changed().await.is_err() {
            return;
        }
    }
}

/// Create a future that completes when a shutdown signal is received
///
/// # Example
///
/// ```rust,ignore
/// use meshestra_http::lifecycle::shutdown_signal;
///
/// tokio::select! {
///     _ = shutdown_signal() => {
///         println!("Shutdown signal received");
///     }
///     _ = server.run(listener) => {}
/// }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_hooks_run_once_in_reverse_order() {
        let graceful = Graceful::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            graceful.add_shutdown_handler(move || async move {
                order.lock().unwrap().push(i);
            });
        }
        assert_eq!(graceful.handler_count(), 3);

        graceful.shutdown();
        graceful.shutdown();
        graceful.run_shutdown_handlers().await;
        graceful.run_shutdown_handlers().await;

        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
        assert_eq!(graceful.shutdown_requests(), 2);
        assert!(graceful.is_shutdown());
    }

    #[tokio::test]
    async fn test_wait_resolves_after_request() {
        let graceful = Arc::new(Graceful::new());
        let waiter = Arc::clone(&graceful);
        let task = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        graceful.shutdown();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_hook_added_after_drain_runs_immediately() {
        let graceful = Graceful::new();
        graceful.shutdown();
        graceful.run_shutdown_handlers().await;

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        graceful.add_shutdown_handler(move || async move {
            let _ = done_tx.send(());
        });

        assert_eq!(graceful.handler_count(), 0);
        tokio::time::timeout(Duration::from_secs(1), done_rx)
            .await
            .unwrap()
            .unwrap();
    }
}
