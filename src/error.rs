use thiserror::Error;

pub type Result<T> = std::result::Result<T, MeshestraHttpError>;

/// Type-erased error reported by a handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum MeshestraHttpError {
    #[error("Dependency not found: {type_name}")]
    DependencyNotFound { type_name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Failed to read request body: {message}")]
    BodyRead { message: String },

    #[error("Request body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },
}

impl MeshestraHttpError {
    pub(crate) fn not_found<T: ?Sized>() -> Self {
        MeshestraHttpError::DependencyNotFound {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    pub(crate) fn downcast_failed<T: ?Sized>() -> Self {
        MeshestraHttpError::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }
}

/// A failure explicitly returned by a handler instead of a value.
///
/// Handlers that only report success or failure can return
/// `HandlerError` or `Result<(), HandlerError>`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::new(format!("{:#}", err))
    }
}
