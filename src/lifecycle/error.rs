//! Lifecycle-specific error types

use super::ProviderState;
use crate::error::MeshestraHttpError;
use crate::server::ServerError;
use thiserror::Error;

/// Errors that can occur during lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A phase was invoked out of order
    #[error("Cannot {phase} a provider in state {from}")]
    InvalidTransition {
        /// State the provider was in
        from: ProviderState,
        /// The phase that was attempted
        phase: &'static str,
    },

    /// A server option failed during boot
    #[error("Server option #{index} failed: {message}")]
    OptionFailed { index: usize, message: String },

    /// A dependency needed by a phase is missing
    #[error(transparent)]
    Resolve(#[from] MeshestraHttpError),

    /// The network listener could not be built
    #[error("Failed to build listener: {0}")]
    Listener(#[source] std::io::Error),

    /// The server stopped for a reason other than shutdown
    #[error("Server failed: {0}")]
    Server(#[from] ServerError),

    /// Operation timed out
    #[error("Timeout during {phase}: {message}")]
    Timeout {
        /// The lifecycle phase where timeout occurred
        phase: String,
        /// Additional error message
        message: String,
    },

    /// A provider's daemon task ended abnormally
    #[error("Daemon failed for {service}: {message}")]
    DaemonFailed {
        /// Name of the provider that failed
        service: String,
        /// Error message
        message: String,
    },
}

impl LifecycleError {
    /// Create an invalid transition error
    pub fn invalid_transition(from: ProviderState, phase: &'static str) -> Self {
        Self::InvalidTransition { from, phase }
    }

    /// Create a timeout error
    pub fn timeout(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout {
            phase: phase.into(),
            message: message.into(),
        }
    }

    /// Create a daemon failure error
    pub fn daemon_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DaemonFailed {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
