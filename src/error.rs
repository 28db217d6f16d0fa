//! Error types for the workspace gateway
//!
//! This module defines the error hierarchy for all operations in the gateway.

use thiserror::Error;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Gmail / Calendar API errors
    #[error("Google API error: {0}")]
    Google(#[from] GoogleApiError),

    /// SMTP errors
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    /// Whether the error was caused by the caller's input rather than the
    /// gateway or an upstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::Validation(_))
    }
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing GOOGLE_CLIENT_ID or GOOGLE_CLIENT_SECRET")]
    MissingClientCredentials,

    #[error("Invalid OAuth keys file {path}: {message}")]
    InvalidKeysFile { path: String, message: String },

    #[error("No Google OAuth credentials found. Set GOOGLE_REFRESH_TOKEN or provide token.json.")]
    NoCredentials,

    #[error("Failed to read token file {path}: {message}")]
    InvalidTokenFile { path: String, message: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },

    #[error("No authorization code provided")]
    NoAuthCode,
}

/// Gmail / Calendar API errors
#[derive(Error, Debug)]
pub enum GoogleApiError {
    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Calendar not found: {calendar_id}")]
    CalendarNotFound { calendar_id: String },

    #[error("API request failed: {message}")]
    RequestFailed { message: String },
}

/// SMTP errors
#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("SMTP configuration is incomplete. Please check your environment variables.")]
    IncompleteConfig,

    #[error("Invalid SMTP host {host}: {message}")]
    InvalidHost { host: String, message: String },

    #[error("SMTP server rejected the connection test")]
    ConnectionRejected,

    #[error("Failed to build message: {message}")]
    MessageBuild { message: String },

    #[error("Failed to send email: {message}")]
    SendFailed { message: String },

    #[error("{0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidEnvVar { var: String, value: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required fields: {fields}")]
    MissingFields { fields: String },

    #[error("Invalid date: {input}")]
    InvalidDate { input: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
