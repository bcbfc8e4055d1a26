//! Structured response payloads.
//!
//! Every error the core emits to a client carries the same shape:
//! `{"success": false, "error": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// A structured error response.
pub fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: error.into(),
        }),
    )
        .into_response()
}

/// A structured success response wrapping a result value.
pub fn success_response(result: Value) -> Response {
    Json(json!({"success": true, "result": result})).into_response()
}
