/// Sink for the server engine's own log lines (startup banner, serve
/// errors, shutdown progress).
pub trait EngineLogger: Send + Sync {
    fn print(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards engine logs into `tracing`, the engine's default. Plain prints
/// are treated as debug output.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl EngineLogger for TracingLogger {
    fn print(&self, message: &str) {
        tracing::debug!(target: "meshestra_http::engine", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "meshestra_http::engine", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "meshestra_http::engine", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "meshestra_http::engine", "{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "meshestra_http::engine", "{}", message);
    }
}
