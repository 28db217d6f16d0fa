//! Route handlers
//!
//! Each handler validates its input, makes one service call and reshapes the
//! result. Errors leave through [`ApiError`].

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::google::auth::TokenSet;
use crate::google::calendar::{CreateEventParams, CreatedEvent, ListEventsParams, ListEventsResult};
use crate::google::gmail::SearchResult;
use crate::google::query::SearchFilters;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::mail::validate_email;

type Shared = State<Arc<AppState>>;

/// Endpoints advertised by the 404 handler
pub const AVAILABLE_ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /test-smtp",
    "POST /send-email",
    "POST /gmail/search",
    "GET /calendar/events",
    "POST /calendar/events",
    "GET /auth/url",
    "POST /auth/token",
    "GET /oauth2callback",
];

// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Email service is running" }))
}

// GET /test-smtp
pub async fn test_smtp(State(state): Shared) -> Result<Json<Value>, ApiError> {
    state
        .mail
        .test_connection()
        .await
        .map_err(|e| ApiError::from_gateway("SMTP connection test failed", e))?;

    Ok(Json(json!({
        "success": true,
        "message": "SMTP connection test successful"
    })))
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message: String,
    pub message_id: String,
}

// POST /send-email
pub async fn send_email(
    State(state): Shared,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Json(request) = payload?;

    let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    let (to, subject, body) = match (
        present(&request.to),
        present(&request.subject),
        present(&request.body),
    ) {
        (Some(to), Some(subject), Some(body)) => (to, subject, body),
        _ => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Missing required fields",
                    "required": ["to", "subject", "body"]
                }),
            ))
        }
    };

    if !validate_email(&to) {
        return Err(ApiError::bad_request("Invalid email address format"));
    }

    let receipt = state
        .mail
        .send(&to, &subject, &body)
        .await
        .map_err(|e| ApiError::from_gateway("Failed to send email", e))?;

    Ok(Json(SendEmailResponse {
        success: true,
        message: "Email sent successfully".to_string(),
        message_id: receipt.message_id,
    }))
}

// POST /gmail/search
pub async fn search_emails(
    State(state): Shared,
    payload: Result<Json<SearchFilters>, JsonRejection>,
) -> Result<Json<SearchResult>, ApiError> {
    let Json(filters) = payload?;

    let result = state
        .gmail
        .search(&filters)
        .await
        .map_err(|e| ApiError::from_gateway("Failed to search emails", e))?;

    info!(total = result.total, "Gmail search complete");
    Ok(Json(result))
}

// GET /calendar/events
pub async fn list_events(
    State(state): Shared,
    params: Result<Query<ListEventsParams>, QueryRejection>,
) -> Result<Json<ListEventsResult>, ApiError> {
    let Query(params) = params?;

    let result = state
        .calendar
        .list_events(&params)
        .await
        .map_err(|e| ApiError::from_gateway("Failed to list events", e))?;

    Ok(Json(result))
}

// POST /calendar/events
pub async fn create_event(
    State(state): Shared,
    payload: Result<Json<CreateEventParams>, JsonRejection>,
) -> Result<Json<CreatedEvent>, ApiError> {
    let Json(params) = payload?;

    let created = state
        .calendar
        .create_meet_event(&params)
        .await
        .map_err(|e| ApiError::from_gateway("Failed to create event", e))?;

    Ok(Json(created))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthUrlQuery {
    /// Comma or space separated scope list
    pub scopes: Option<String>,
}

// GET /auth/url
pub async fn auth_url(
    State(state): Shared,
    query: Result<Query<AuthUrlQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;

    let scopes: Vec<String> = query
        .scopes
        .unwrap_or_default()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let url = state
        .oauth
        .auth_url(&scopes)
        .map_err(|e| ApiError::from_gateway("Failed to build authorization URL", e))?;

    Ok(Json(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub code: Option<String>,
}

// POST /auth/token
pub async fn exchange_token(
    State(state): Shared,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenSet>, ApiError> {
    let Json(request) = payload?;
    exchange(&state, request.code).await
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

// GET /oauth2callback
pub async fn oauth_callback(
    State(state): Shared,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Json<TokenSet>, ApiError> {
    let Query(query) = query?;

    if let Some(error) = query.error {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Authorization denied", "message": error }),
        ));
    }
    exchange(&state, query.code).await
}

async fn exchange(state: &AppState, code: Option<String>) -> Result<Json<TokenSet>, ApiError> {
    let code = code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let tokens = state
        .oauth
        .exchange_code(&code)
        .await
        .map_err(|e| ApiError::from_gateway("Failed to exchange authorization code", e))?;

    Ok(Json(tokens))
}

// Fallback
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "availableEndpoints": AVAILABLE_ENDPOINTS
        })),
    )
}
