//! Lifecycle Manager
//!
//! Drives the register, boot and daemon phases of every registered provider.

use super::{DaemonProvider, LifecycleError, Provider, Result};
use crate::di::{Container, Resolver};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A daemon running on its own task.
pub struct RunningDaemon {
    pub name: &'static str,
    pub handle: JoinHandle<Result<()>>,
}

/// Runs provider phases in the correct order
///
/// The LifecycleManager is responsible for:
/// - Registering every provider before any provider boots
/// - Booting providers in registration order
/// - Spawning one task per daemon provider
///
/// # Example
///
/// ```rust,ignore
/// use meshestra_http::lifecycle::LifecycleManager;
///
/// let mut manager = LifecycleManager::new();
/// manager.add_daemon(Arc::new(http_provider));
///
/// manager.register_all(&mut container)?;
/// let resolver = Resolver::from(container);
/// manager.boot_all(&resolver).await?;
/// let daemons = manager.spawn_daemons(&resolver);
/// ```
#[derive(Default)]
pub struct LifecycleManager {
    providers: Vec<Arc<dyn Provider>>,
    daemons: Vec<Arc<dyn DaemonProvider>>,
}

impl LifecycleManager {
    /// Create a new LifecycleManager
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider without a background task
    pub fn add_provider<P>(&mut self, provider: Arc<P>)
    where
        P: Provider + 'static,
    {
        self.providers.push(provider);
    }

    /// Add a provider that also runs a daemon
    pub fn add_daemon<P>(&mut self, provider: Arc<P>)
    where
        P: DaemonProvider + 'static,
    {
        self.providers.push(Arc::clone(&provider) as Arc<dyn Provider>);
        self.daemons.push(provider);
    }

    /// Register every provider with the container.
    ///
    /// Providers are registered in the order they were added.
    pub fn register_all(&self, container: &mut Container) -> Result<()> {
        tracing::info!("Registering providers...");

        for provider in &self.providers {
            tracing::debug!("Registering: {}", provider.name());
            provider.register(container).map_err(|e| {
                tracing::error!("Register failed for {}: {}", provider.name(), e);
                e
            })?;
        }

        tracing::info!(
            "Registration complete ({} providers)",
            self.providers.len()
        );
        Ok(())
    }

    /// Boot every provider.
    ///
    /// Providers are booted in the order they were added. The first failure
    /// stops the phase.
    pub async fn boot_all(&self, resolver: &Resolver) -> Result<()> {
        tracing::info!("Booting providers...");

        for provider in &self.providers {
            tracing::debug!("Booting: {}", provider.name());
            provider.boot(resolver).await.map_err(|e| {
                tracing::error!("Boot failed for {}: {}", provider.name(), e);
                e
            })?;
            tracing::debug!("Booted: {}", provider.name());
        }

        tracing::info!("Boot complete ({} providers)", self.providers.len());
        Ok(())
    }

    /// Boot every provider with a timeout
    pub async fn boot_all_with_timeout(&self, resolver: &Resolver, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.boot_all(resolver))
            .await
            .map_err(|_| LifecycleError::timeout("Boot", format!("Timeout after {:?}", timeout)))?
    }

    /// Start every daemon on its own task
    pub fn spawn_daemons(&self, resolver: &Resolver) -> Vec<RunningDaemon> {
        self.daemons
            .iter()
            .map(|daemon| {
                let name = daemon.name();
                tracing::debug!("Starting daemon: {}", name);
                let daemon = Arc::clone(daemon);
                let resolver = resolver.clone();
                RunningDaemon {
                    name,
                    handle: tokio::spawn(async move { daemon.daemon(resolver).await }),
                }
            })
            .collect()
    }

    /// Get the number of registered providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Get the number of registered daemons
    pub fn daemon_count(&self) -> usize {
        self.daemons.len()
    }
}
