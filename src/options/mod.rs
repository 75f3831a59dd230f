//! Server options applied during boot.
//!
//! Options run once each, in the order they were handed to
//! [`HttpProvider::new`](crate::lifecycle::HttpProvider::new). The first
//! failing option aborts boot.

mod logging;

pub use logging::{RequestLog, RequestLogFn, default_request_log_option, request_log_option};

use crate::di::Resolver;
use crate::handler::Injector;
use crate::server::HttpServer;

/// A configuration step run against the server during boot.
pub type ServerOption =
    Box<dyn Fn(&Resolver, &HttpServer) -> anyhow::Result<()> + Send + Sync>;

/// Custom initialisation of the server.
pub fn init_option<F>(f: F) -> ServerOption
where
    F: Fn(&Resolver, &HttpServer) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Register routes. `f` also receives an [`Injector`] for turning injectable
/// functions into handlers.
pub fn route_option<F>(f: F) -> ServerOption
where
    F: Fn(&Resolver, &Injector, &HttpServer) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Box::new(move |resolver: &Resolver, server: &HttpServer| -> anyhow::Result<()> {
        let injector = Injector::new(resolver.clone());
        f(resolver, &injector, server)
    })
}
