//! Per-request recovery boundary.
//!
//! Injected handlers never write a body for a failed request. They return a
//! [`Fault`], whose response carries a [`FaultRecord`] extension. The
//! recovery middleware installed by
//! [`HttpServer::use_recovery`](crate::server::HttpServer::use_recovery)
//! logs the record and asks an [`ExceptionFilter`] for the response the
//! client sees. Panics inside handlers are caught and reported the same way.

use crate::error::{BoxError, MeshestraHttpError};
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

pub mod http;

pub use http::HttpExceptionFilter;

/// Why a request could not be completed.
#[derive(Debug, Error)]
pub enum Fault {
    /// A handler parameter could not be resolved.
    #[error("dependency resolution failed: {0}")]
    Resolution(#[from] MeshestraHttpError),

    /// The handler reported an error.
    #[error("handler failed: {0}")]
    Handler(BoxError),
}

impl Fault {
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Resolution(_) => FaultKind::Resolution,
            Fault::Handler(_) => FaultKind::Handler,
        }
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        // An oversized body is the client's mistake, not a fault to recover.
        if let Fault::Resolution(MeshestraHttpError::BodyTooLarge { .. }) = self {
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }

        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(FaultRecord {
            kind: self.kind(),
            message: self.to_string(),
        });
        response
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FaultKind {
    Resolution,
    Handler,
    Panic,
}

/// What the recovery layer knows about a failed request.
#[derive(Debug, Clone)]
pub struct FaultRecord {
    pub kind: FaultKind,
    pub message: String,
}

impl FaultRecord {
    fn from_panic(panic: Box<dyn Any + Send + 'static>) -> Self {
        let message = if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else {
            "unknown panic payload".to_string()
        };
        Self {
            kind: FaultKind::Panic,
            message,
        }
    }
}

/// Renders the response for a failed request.
///
/// Filters only shape what the client sees; logging is done by the
/// recovery layer.
pub trait ExceptionFilter: Send + Sync + 'static {
    fn catch(&self, fault: &FaultRecord) -> Response;
}

pub(crate) async fn recover(
    filter: Arc<dyn ExceptionFilter>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;
    match response.extensions().get::<FaultRecord>() {
        Some(fault) => {
            tracing::error!(
                method = %method,
                path = %path,
                kind = %fault.kind,
                "request failed: {}",
                fault.message
            );
            filter.catch(fault)
        }
        None => response,
    }
}

pub(crate) fn recover_panic(
    filter: &dyn ExceptionFilter,
    panic: Box<dyn Any + Send + 'static>,
) -> Response {
    let fault = FaultRecord::from_panic(panic);
    tracing::error!(kind = %fault.kind, "handler panicked: {}", fault.message);
    filter.catch(&fault)
}
