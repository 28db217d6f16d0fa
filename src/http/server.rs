//! HTTP server wiring
//!
//! Builds the shared service state, the route table and the request logging
//! middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info, info_span, Instrument};

use crate::config::Config;
use crate::error::Result;
use crate::google::auth::OAuthClient;
use crate::google::calendar::CalendarClient;
use crate::google::gmail::GmailClient;
use crate::http::handlers;
use crate::mail::sender::MailSender;

/// Header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Services shared by all handlers
pub struct AppState {
    pub mail: MailSender,
    pub gmail: GmailClient,
    pub calendar: CalendarClient,
    pub oauth: Arc<OAuthClient>,
}

impl AppState {
    /// Build every service from configuration
    pub async fn new(config: &Config) -> Result<Self> {
        let oauth = Arc::new(OAuthClient::new(config.google.clone()).await?);

        Ok(Self {
            mail: MailSender::new(&config.smtp)?,
            gmail: GmailClient::new(Arc::clone(&oauth), config.google.gmail_api_base.clone()),
            calendar: CalendarClient::new(
                Arc::clone(&oauth),
                config.google.calendar_api_base.clone(),
            ),
            oauth,
        })
    }
}

/// Route table with middleware applied
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/test-smtp", get(handlers::test_smtp))
        .route("/send-email", post(handlers::send_email))
        .route("/gmail/search", post(handlers::search_emails))
        .route(
            "/calendar/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route("/auth/url", get(handlers::auth_url))
        .route("/auth/token", post(handlers::exchange_token))
        .route("/oauth2callback", get(handlers::oauth_callback))
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(request_context))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Tag each request with an id, log its start and its outcome
async fn request_context(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().simple().to_string()[..9].to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!("request", id = %request_id, method = %method, path = %path);

    async move {
        let started = Instant::now();
        info!("Request started");

        let mut response = next.run(request).await;

        let status = response.status();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if status.is_server_error() {
            error!(status = status.as_u16(), elapsed_ms, "Request failed");
        } else {
            info!(status = status.as_u16(), elapsed_ms, "Request finished");
        }

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

fn handle_panic(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Something went wrong!" })),
    )
        .into_response()
}

/// Bind and serve until the process is stopped
pub async fn serve(config: Config) -> Result<()> {
    config.log_summary();

    let state = Arc::new(AppState::new(&config).await?);
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
