//! Application Bootstrap
//!
//! Supervises providers for the lifetime of the process.

use super::{DaemonProvider, Graceful, LifecycleError, LifecycleManager, Provider, Result};
use crate::di::{Container, Resolver};
use std::sync::Arc;
use std::time::Duration;

/// A booted application, ready to run its daemons.
///
/// # Example
///
/// ```rust,no_run
/// use meshestra_http::prelude::*;
/// use meshestra_http::server::ConfiguredListener;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let http = HttpProvider::new(ConfiguredListener, vec![default_request_log_option()]);
///
///     let app = Application::builder()
///         .daemon(Arc::new(http))
///         .build()
///         .await?;
///
///     app.run().await?;
///     Ok(())
/// }
/// ```
pub struct Application {
    resolver: Resolver,
    graceful: Arc<Graceful>,
    lifecycle_manager: LifecycleManager,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Get a reference to the container
    pub fn container(&self) -> &Arc<Container> {
        self.resolver.container()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The shutdown coordinator shared with every provider.
    pub fn graceful(&self) -> Arc<Graceful> {
        Arc::clone(&self.graceful)
    }

    /// Run every daemon until shutdown is requested or a signal arrives,
    /// then run the shutdown hooks and wait for the daemons to finish.
    ///
    /// Returns the first daemon failure, if any.
    pub async fn run(self) -> Result<()> {
        let daemons = self.lifecycle_manager.spawn_daemons(&self.resolver);
        tracing::info!("Application started ({} daemons)", daemons.len());

        self.graceful.wait_for_signal().await;
        self.graceful.run_shutdown_handlers().await;

        let mut failure = None;
        for daemon in daemons {
            let error = match daemon.handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => LifecycleError::daemon_failed(daemon.name, e.to_string()),
                Err(e) => LifecycleError::daemon_failed(daemon.name, e.to_string()),
            };
            tracing::error!("{}", error);
            failure.get_or_insert(error);
        }

        tracing::info!("Application shutdown complete");
        failure.map_or(Ok(()), Err)
    }
}

/// Builder for Application
#[derive(Default)]
pub struct ApplicationBuilder {
    container: Option<Container>,
    lifecycle_manager: LifecycleManager,
    boot_timeout: Option<Duration>,
}

impl ApplicationBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the DI container. An empty one is used otherwise.
    pub fn container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// Set a timeout for the boot phase
    pub fn boot_timeout(mut self, timeout: Duration) -> Self {
        self.boot_timeout = Some(timeout);
        self
    }

    /// Add a provider without a background task
    pub fn provider<P: Provider + 'static>(mut self, provider: Arc<P>) -> Self {
        self.lifecycle_manager.add_provider(provider);
        self
    }

    /// Add a provider that runs a daemon
    pub fn daemon<P: DaemonProvider + 'static>(mut self, provider: Arc<P>) -> Self {
        self.lifecycle_manager.add_daemon(provider);
        self
    }

    /// Register and boot every provider
    ///
    /// A [`Graceful`] coordinator is registered unless the container
    /// already holds one.
    ///
    /// # Errors
    ///
    /// Returns the first register or boot failure.
    pub async fn build(self) -> Result<Application> {
        let mut container = self.container.unwrap_or_default();

        tracing::info!("Starting application initialization...");

        if !container.contains::<Graceful>() {
            container.register(Graceful::new());
        }
        self.lifecycle_manager.register_all(&mut container)?;

        let resolver = Resolver::from(container);
        let graceful = resolver.resolve::<Graceful>()?;

        match self.boot_timeout {
            Some(timeout) => {
                self.lifecycle_manager
                    .boot_all_with_timeout(&resolver, timeout)
                    .await?
            }
            None => self.lifecycle_manager.boot_all(&resolver).await?,
        }

        tracing::info!("Application initialization complete");

        Ok(Application {
            resolver,
            graceful,
            lifecycle_manager: self.lifecycle_manager,
        })
    }
}
