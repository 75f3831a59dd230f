//! Service Lifecycle Module
//!
//! Providers move through three phases, driven by the [`Application`]:
//!
//! ```text
//! 1. Register (each provider)     ← bindings go into the container
//!    ↓
//! 2. Boot (each provider)         ← options configure what was registered
//!    ↓
//! 3. Daemon (each daemon, own task)
//!    ↓
//! [Running...]
//!    ↓
//! 4. Shutdown request or signal (SIGTERM/SIGINT)
//!    ↓
//! 5. Shutdown hooks (most recent first)
//!    ↓
//! 6. Daemons joined
//! ```
//!
//! [`HttpProvider`] is the provider that runs the HTTP server. Its shutdown
//! hook waits at most [`SHUTDOWN_TIMEOUT`] for in-flight requests.

mod application;
mod error;
mod manager;
mod provider;
mod shutdown;
mod traits;

pub use application::{Application, ApplicationBuilder};
pub use error::{LifecycleError, Result};
pub use manager::{LifecycleManager, RunningDaemon};
pub use provider::{HttpProvider, ProviderState, SHUTDOWN_TIMEOUT};
pub use shutdown::{Graceful, shutdown_signal};
pub use traits::{DaemonProvider, Provider};

pub(crate) use shutdown::wait_until_set;
