//! # Meshestra HTTP
//!
//! An HTTP service provider for a dependency-injected application runtime.
//!
//! ## Features
//!
//! - **Injected Handlers**: Async functions with up to twelve typed parameters,
//!   resolved from the DI container on every request
//! - **Typed Replies**: Strings, numbers, JSON values and errors become
//!   responses through [`IntoReply`](handler::IntoReply)
//! - **Managed Lifecycle**: The server is registered, configured by options
//!   and run as a supervised daemon
//! - **Bounded Shutdown**: In-flight requests get at most
//!   [`SHUTDOWN_TIMEOUT`](lifecycle::SHUTDOWN_TIMEOUT) to finish
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshestra_http::prelude::*;
//! use meshestra_http::server::BindListener;
//!
//! // 1. Define your service
//! struct UserService;
//!
//! impl UserService {
//!     fn find_one(&self, id: &str) -> serde_json::Value {
//!         serde_json::json!({ "id": id })
//!     }
//! }
//!
//! // 2. Define your handler
//! async fn get_user(
//!     users: Inject<UserService>,
//!     ctx: RequestContext,
//! ) -> Result<Json<serde_json::Value>, HandlerError> {
//!     let id = ctx.param("id").ok_or_else(|| HandlerError::new("missing id"))?;
//!     Ok(Json(users.find_one(id)))
//! }
//!
//! // 3. Bootstrap your application
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = ContainerBuilder::new().register(UserService).build();
//!
//!     let http = HttpProvider::new(
//!         BindListener::new("127.0.0.1:8080"),
//!         vec![
//!             default_request_log_option(),
//!             route_option(|_, injector, server| {
//!                 server.route("/users/{id}", get(injector.handler(get_user)));
//!                 Ok(())
//!             }),
//!         ],
//!     );
//!
//!     Application::builder()
//!         .container(container)
//!         .daemon(Arc::new(http))
//!         .build()
//!         .await?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod di;
pub mod error;
pub mod exception;
pub mod handler;
pub mod lifecycle;
pub mod options;
pub mod server;

// Re-export core types
pub use di::{Container, ContainerBuilder, FromScope, Inject, Resolver};
pub use error::{HandlerError, MeshestraHttpError, Result};
pub use handler::{InjectedHandler, Injector, IntoReply, Reply, RequestContext};
pub use lifecycle::{Application, HttpProvider};
pub use options::ServerOption;
pub use server::HttpServer;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_http::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::HttpConfig;
    pub use crate::di::{Container, ContainerBuilder, FromScope, Inject, Resolver};
    pub use crate::error::HandlerError;
    pub use crate::exception::{ExceptionFilter, HttpExceptionFilter};
    pub use crate::handler::{Injector, IntoReply, Reply, RequestContext};
    pub use crate::lifecycle::{
        Application, ApplicationBuilder, DaemonProvider, Graceful, HttpProvider, LifecycleError,
        Provider, shutdown_signal,
    };
    pub use crate::options::{
        RequestLog, ServerOption, default_request_log_option, init_option, request_log_option,
        route_option,
    };
    pub use crate::server::HttpServer;
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        http::StatusCode,
        routing::{delete, get, patch, post, put},
    };
    pub use std::sync::Arc;
}
