//! The HTTP service provider.

use super::{DaemonProvider, Graceful, LifecycleError, Provider, Result};
use crate::di::{Container, Resolver};
use crate::options::ServerOption;
use crate::server::{HttpServer, ListenerBuilder, ServerError, TracingLogger};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strum_macros::Display;

/// How long the shutdown hook waits for in-flight requests.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Where an [`HttpProvider`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProviderState {
    Unregistered,
    Registered,
    Booted,
    Running,
    Stopped,
}

/// Runs an [`HttpServer`] as a supervised background service.
///
/// - `register` puts a fresh server into the container.
/// - `boot` applies the options to it, in order, exactly once.
/// - `daemon` serves on the listener until the process shuts down.
///
/// # Example
///
/// ```rust,no_run
/// use meshestra_http::prelude::*;
/// use meshestra_http::server::BindListener;
///
/// let provider = HttpProvider::new(
///     BindListener::new("127.0.0.1:8080"),
///     vec![
///         default_request_log_option(),
///         route_option(|_, _, server| {
///             server.route("/health", get(|| async { "ok" }));
///             Ok(())
///         }),
///     ],
/// );
/// ```
pub struct HttpProvider {
    listener_builder: Box<dyn ListenerBuilder>,
    options: Vec<ServerOption>,
    state: Mutex<ProviderState>,
}

impl HttpProvider {
    pub fn new(listener_builder: impl ListenerBuilder + 'static, options: Vec<ServerOption>) -> Self {
        Self {
            listener_builder: Box::new(listener_builder),
            options,
            state: Mutex::new(ProviderState::Unregistered),
        }
    }

    pub fn state(&self) -> ProviderState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(
        &self,
        allowed: &[ProviderState],
        next: ProviderState,
        phase: &'static str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !allowed.contains(&*state) {
            return Err(LifecycleError::invalid_transition(*state, phase));
        }
        *state = next;
        Ok(())
    }

    fn stop(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = ProviderState::Stopped;
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn register(&self, container: &mut Container) -> Result<()> {
        self.advance(
            &[ProviderState::Unregistered, ProviderState::Registered],
            ProviderState::Registered,
            "register",
        )?;

        container.singleton_override(|| {
            let server = HttpServer::new();
            server
                .use_recovery()
                .configure(|config| config.startup_log = false)
                .install_logger(Arc::new(TracingLogger));
            server
        });
        Ok(())
    }

    async fn boot(&self, resolver: &Resolver) -> Result<()> {
        let server = resolver.resolve::<HttpServer>()?;
        // Booted is entered before the options run so a failed boot is never retried.
        self.advance(&[ProviderState::Registered], ProviderState::Booted, "boot")?;

        for (index, option) in self.options.iter().enumerate() {
            option(resolver, &server).map_err(|e| LifecycleError::OptionFailed {
                index,
                message: format!("{:#}", e),
            })?;
        }
        tracing::debug!("Applied {} server options", self.options.len());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "HttpProvider"
    }
}

#[async_trait]
impl DaemonProvider for HttpProvider {
    async fn daemon(&self, resolver: Resolver) -> Result<()> {
        self.advance(&[ProviderState::Booted], ProviderState::Running, "run")?;

        let (graceful, server) = match (
            resolver.resolve::<Graceful>(),
            resolver.resolve::<HttpServer>(),
        ) {
            (Ok(graceful), Ok(server)) => (graceful, server),
            (Err(e), _) | (_, Err(e)) => {
                self.stop();
                return Err(e.into());
            }
        };

        let listener = match self.listener_builder.build(&resolver).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("failed to build http listener: {}", e);
                self.stop();
                graceful.shutdown();
                return Err(LifecycleError::Listener(e));
            }
        };

        let hook_server = Arc::clone(&server);
        graceful.add_shutdown_handler(move || async move {
            tracing::debug!("prepare to shutdown http server...");
            if let Err(e) = hook_server.shutdown(SHUTDOWN_TIMEOUT).await {
                tracing::error!("shutdown http server failed: {}", e);
            }
            tracing::warn!("http server has been shutdown");
        });

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(addr) = listener.local_addr() {
                tracing::debug!("http server started on {}", addr);
            }
        }

        let result = server.run(listener).await;
        self.stop();
        match result {
            Ok(()) | Err(ServerError::Closed) => {
                tracing::debug!("http server closed");
                Ok(())
            }
            Err(e) => {
                tracing::debug!("http server stopped unexpectedly: {}", e);
                graceful.shutdown();
                Err(LifecycleError::Server(e))
            }
        }
    }
}
