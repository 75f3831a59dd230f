//! The HTTP server engine.
//!
//! [`HttpServer`] wraps an axum [`Router`] so it can be shared through the
//! DI container. Options add routes and middleware to it during boot. The
//! daemon later runs it on a listener, and a shutdown hook closes it within
//! a bounded time.

mod listener;
mod logger;

pub use listener::{BindListener, ConfiguredListener, InheritedListener, ListenerBuilder};
pub use logger::{EngineLogger, TracingLogger};

use crate::exception::{self, ExceptionFilter, HttpExceptionFilter};
use crate::lifecycle::wait_until_set;
use axum::{
    Router,
    extract::Request,
    middleware::Next,
    response::IntoResponse,
    routing::{MethodRouter, Route},
};
use std::convert::Infallible;
use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::{Layer, Service};
use tower_http::catch_panic::CatchPanicLayer;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The server was stopped through [`HttpServer::shutdown`].
    #[error("http: Server closed")]
    Closed,

    #[error("http server has already been started")]
    AlreadyStarted,

    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Engine settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Announce the listening address through the engine logger on start.
    pub startup_log: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { startup_log: true }
    }
}

type Middleware = Box<dyn FnOnce(Router) -> Router + Send>;

pub struct HttpServer {
    router: Mutex<Router>,
    middleware: Mutex<Vec<Middleware>>,
    recovery: Mutex<Option<Arc<dyn ExceptionFilter>>>,
    config: Mutex<ServerConfig>,
    logger: RwLock<Arc<dyn EngineLogger>>,
    local_addr: Mutex<Option<SocketAddr>>,
    started: AtomicBool,
    running: AtomicBool,
    closing: watch::Sender<bool>,
    forced: watch::Sender<bool>,
    stopped: watch::Sender<bool>,
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpServer {
    pub fn new() -> Self {
        Self {
            router: Mutex::new(Router::new()),
            middleware: Mutex::new(Vec::new()),
            recovery: Mutex::new(None),
            config: Mutex::new(ServerConfig::default()),
            logger: RwLock::new(Arc::new(TracingLogger)),
            local_addr: Mutex::new(None),
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            closing: watch::Sender::new(false),
            forced: watch::Sender::new(false),
            stopped: watch::Sender::new(false),
        }
    }

    /// Add a route.
    ///
    /// Panics on a conflicting or malformed path, like [`Router::route`].
    pub fn route(&self, path: &str, method_router: MethodRouter) -> &Self {
        let mut router = self.router.lock().unwrap_or_else(PoisonError::into_inner);
        let current = std::mem::replace(&mut *router, Router::new());
        *router = current.route(path, method_router);
        self
    }

    /// Merge the routes of another router.
    pub fn merge(&self, other: Router) -> &Self {
        let mut router = self.router.lock().unwrap_or_else(PoisonError::into_inner);
        let current = std::mem::replace(&mut *router, Router::new());
        *router = current.merge(other);
        self
    }

    /// Install a middleware layer.
    ///
    /// Layers wrap every route, including routes added after the call.
    /// Earlier layers sit outside later ones.
    pub fn layer<L>(&self, layer: L) -> &Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.middleware
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(move |router: Router| router.layer(layer)));
        self
    }

    /// Turn handler faults and panics into the generic failure response.
    pub fn use_recovery(&self) -> &Self {
        self.use_recovery_with(HttpExceptionFilter)
    }

    pub fn use_recovery_with(&self, filter: impl ExceptionFilter) -> &Self {
        *self.recovery.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(filter));
        self
    }

    pub fn configure(&self, f: impl FnOnce(&mut ServerConfig)) -> &Self {
        f(&mut self.config.lock().unwrap_or_else(PoisonError::into_inner));
        self
    }

    pub fn config(&self) -> ServerConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Redirect the engine's own log output.
    pub fn install_logger(&self, logger: Arc<dyn EngineLogger>) -> &Self {
        *self.logger.write().unwrap_or_else(PoisonError::into_inner) = logger;
        self
    }

    pub fn logger(&self) -> Arc<dyn EngineLogger> {
        Arc::clone(&self.logger.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Address of the listener while the server runs.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Take the configured routes and wrap them in the installed middleware.
    ///
    /// The router is moved out; routes added afterwards start a new one.
    pub fn build_router(&self) -> Router {
        let router = std::mem::replace(
            &mut *self.router.lock().unwrap_or_else(PoisonError::into_inner),
            Router::new(),
        );
        let middleware =
            std::mem::take(&mut *self.middleware.lock().unwrap_or_else(PoisonError::into_inner));

        let mut router = middleware
            .into_iter()
            .rev()
            .fold(router, |router, apply| apply(router));

        let recovery = self
            .recovery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(filter) = recovery {
            let on_fault = Arc::clone(&filter);
            router = router
                .layer(axum::middleware::from_fn(move |request: Request, next: Next| {
                    exception::recover(Arc::clone(&on_fault), request, next)
                }))
                .layer(CatchPanicLayer::custom(
                    move |panic: Box<dyn std::any::Any + Send + 'static>| {
                        exception::recover_panic(filter.as_ref(), panic)
                    },
                ));
        }
        router
    }

    /// Serve on `listener` until the server is shut down.
    ///
    /// Always ends in an error: [`ServerError::Closed`] after
    /// [`HttpServer::shutdown`], anything else is an unexpected failure.
    pub async fn run(&self, listener: TcpListener) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }
        self.running.store(true, Ordering::SeqCst);

        let result = self.serve(listener).await;

        self.running.store(false, Ordering::SeqCst);
        self.stopped.send_replace(true);
        match result {
            Ok(()) => Err(ServerError::Closed),
            Err(e) => {
                self.logger().error(&format!("http server failed: {}", e));
                Err(ServerError::Io(e))
            }
        }
    }

    async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        let addr = listener.local_addr()?;
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = Some(addr);

        if self.config().startup_log {
            self.logger()
                .info(&format!("Now listening on: http://{}", addr));
        }

        let app = self.build_router();
        let closing = self.closing.subscribe();
        let serve = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(wait_until_set(closing))
        .into_future();

        tokio::select! {
            result = serve => result,
            _ = wait_until_set(self.forced.subscribe()) => {
                self.logger().warn("abandoning connections that did not drain in time");
                Ok(())
            }
        }
    }

    /// Stop accepting connections and wait up to `timeout` for in-flight
    /// requests to finish.
    ///
    /// When the deadline passes, `run` is released anyway and
    /// [`ServerError::ShutdownTimeout`] is returned.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ServerError> {
        self.closing.send_replace(true);
        if !self.is_running() {
            return Ok(());
        }

        let stopped = wait_until_set(self.stopped.subscribe());
        match tokio::time::timeout(timeout, stopped).await {
            Ok(()) => Ok(()),
            Err(_) => {
                self.forced.send_replace(true);
                Err(ServerError::ShutdownTimeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        let request = axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_layers_wrap_later_routes() {
        let hits = Arc::new(AtomicUsize::new(0));
        let server = HttpServer::new();

        let counted = Arc::clone(&hits);
        server.layer(axum::middleware::from_fn(
            move |request: Request, next: Next| {
                let counted = Arc::clone(&counted);
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    next.run(request).await
                }
            },
        ));
        server.route("/late", get(|| async { "ok" }));

        let router = server.build_router();
        assert_eq!(status_of(router, "/late").await, StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovery_catches_panics() {
        let server = HttpServer::new();
        server.use_recovery();
        server.route(
            "/panic",
            get(|| async {
                if true {
                    panic!("handler exploded");
                }
                "unreachable"
            }),
        );

        let router = server.build_router();
        assert_eq!(
            status_of(router, "/panic").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_shutdown_before_run_closes_immediately() {
        let server = HttpServer::new();
        server.shutdown(Duration::from_millis(10)).await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = server.run(listener).await;
        assert!(matches!(result, Err(ServerError::Closed)));
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let server = HttpServer::new();
        server.shutdown(Duration::from_millis(10)).await.unwrap();
        let _ = server.run(TcpListener::bind("127.0.0.1:0").await.unwrap()).await;

        let again = server.run(TcpListener::bind("127.0.0.1:0").await.unwrap()).await;
        assert!(matches!(again, Err(ServerError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_serves_and_closes() {
        let server = Arc::new(HttpServer::new());
        server.configure(|c| c.startup_log = false);
        server.route("/ping", get(|| async { "pong" }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = Arc::clone(&server);
        let task = tokio::spawn(async move { running.run(listener).await });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /ping HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("pong"));

        server.shutdown(Duration::from_secs(5)).await.unwrap();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::Closed)));
        assert!(!server.is_running());
    }

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<String>>,
    }

    impl EngineLogger for RecordingLogger {
        fn print(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("print {}", message));
        }

        fn error(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("error {}", message));
        }

        fn warn(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("warn {}", message));
        }

        fn info(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("info {}", message));
        }

        fn debug(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("debug {}", message));
        }
    }

    #[tokio::test]
    async fn test_startup_banner_goes_to_installed_logger() {
        let logger = Arc::new(RecordingLogger::default());
        let server = Arc::new(HttpServer::new());
        server.install_logger(logger.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = Arc::clone(&server);
        let task = tokio::spawn(async move { running.run(listener).await });

        while server.local_addr().is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        server.shutdown(Duration::from_secs(5)).await.unwrap();
        assert!(matches!(task.await.unwrap(), Err(ServerError::Closed)));

        let lines = logger.lines.lock().unwrap();
        assert_eq!(*lines, vec![format!("info Now listening on: http://{}", addr)]);
    }

    #[tokio::test]
    async fn test_shutdown_is_bounded() {
        let server = Arc::new(HttpServer::new());
        server.configure(|c| c.startup_log = false);
        server.route("/hang", get(|| std::future::pending::<()>()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = Arc::clone(&server);
        let task = tokio::spawn(async move { running.run(listener).await });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /hang HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = Instant::now();
        let result = server.shutdown(Duration::from_millis(300)).await;
        assert!(matches!(result, Err(ServerError::ShutdownTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::Closed)));
        drop(stream);
    }
}
