use crate::exception::{ExceptionFilter, FaultRecord};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The default exception filter: a generic 500 that does not leak the
/// failure detail to the client.
#[derive(Default)]
pub struct HttpExceptionFilter;

impl ExceptionFilter for HttpExceptionFilter {
    fn catch(&self, _fault: &FaultRecord) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        (
            status,
            Json(json!({
                "statusCode": status.as_u16(),
                "message": "Internal Server Error",
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response()
    }
}
