//! JSON error envelope
//!
//! Every failure leaves the gateway as `{"error": <context>, "message": <detail>}`
//! (validation failures may carry other fields, e.g. `required`).

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::error::GatewayError;

/// Error returned from a handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    /// Error with an explicit status and body
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// 400 with only an `error` field
    pub fn bad_request(error: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, json!({ "error": error }))
    }

    /// Map a gateway error under a handler-specific context line
    ///
    /// Validation failures become 400; everything else is a 500.
    pub fn from_gateway(context: &str, err: GatewayError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %err, "{}", context);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, json!({ "error": context, "message": err.to_string() }))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Invalid request body", "message": rejection.body_text() }),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Invalid query parameters", "message": rejection.body_text() }),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
