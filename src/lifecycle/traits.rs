//! Provider traits
//!
//! These traits define the phases a supervised service goes through. The
//! [`Application`](super::Application) drives them in order: every provider
//! is registered, then every provider is booted, then each daemon runs on
//! its own task.

use super::Result;
use crate::di::{Container, Resolver};
use async_trait::async_trait;

/// A service that contributes bindings to the container.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Add bindings. Called once, before any provider is booted.
    fn register(&self, container: &mut Container) -> Result<()>;

    /// Configure what was registered.
    ///
    /// Called after every provider has registered and before any daemon
    /// starts.
    async fn boot(&self, _resolver: &Resolver) -> Result<()> {
        Ok(())
    }

    /// Name used in lifecycle logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A provider that also runs a long-lived background task.
#[async_trait]
pub trait DaemonProvider: Provider {
    /// Run until the service stops. Called on a dedicated task after boot.
    async fn daemon(&self, resolver: Resolver) -> Result<()>;
}
