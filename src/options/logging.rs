use crate::di::Resolver;
use crate::options::ServerOption;
use crate::server::HttpServer;
use axum::{
    extract::{ConnectInfo, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One served request, as reported to a request log handler.
#[derive(Debug, Clone)]
pub struct RequestLog {
    pub end_time: DateTime<Utc>,
    pub latency: Duration,
    pub status: StatusCode,
    pub ip: String,
    pub method: Method,
    pub path: String,
}

pub type RequestLogFn = Arc<dyn Fn(&RequestLog) + Send + Sync>;

/// Report every request to `handler` once its response is ready.
pub fn request_log_option<F>(handler: F) -> ServerOption
where
    F: Fn(&RequestLog) + Send + Sync + 'static,
{
    let handler: RequestLogFn = Arc::new(handler);
    Box::new(move |_resolver: &Resolver, server: &HttpServer| -> anyhow::Result<()> {
        let handler = Arc::clone(&handler);
        server.layer(axum::middleware::from_fn(
            move |request: Request, next: Next| {
                let handler = Arc::clone(&handler);
                async move { log_request(handler, request, next).await }
            },
        ));
        Ok(())
    })
}

/// Request logging at debug level through `tracing`.
pub fn default_request_log_option() -> ServerOption {
    request_log_option(|log: &RequestLog| {
        tracing::debug!(
            latency = ?log.latency,
            status = log.status.as_u16(),
            ip = %log.ip,
            method = %log.method,
            path = %log.path,
            "{} {} [{}] [{:?}]",
            log.method,
            log.path,
            log.status.as_u16(),
            log.latency
        );
    })
}

async fn log_request(handler: RequestLogFn, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(request).await;

    handler(&RequestLog {
        end_time: Utc::now(),
        latency: start.elapsed(),
        status: response.status(),
        ip,
        method,
        path,
    });
    response
}
