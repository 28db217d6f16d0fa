//! Configuration management for the workspace gateway
//!
//! Handles environment variables, defaults and configuration loading.

use std::path::PathBuf;

use crate::error::{ConfigError, GatewayError, Result};

/// Configuration for the workspace gateway
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub host: String,

    /// Port to bind the HTTP server to
    pub port: u16,

    /// SMTP settings
    pub smtp: SmtpConfig,

    /// Google OAuth and API settings
    pub google: GoogleConfig,
}

/// SMTP connection settings
#[derive(Clone, Default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,

    /// Display name used in the From header and the signature
    pub from_name: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl SmtpConfig {
    /// Whether host, user and password are all present
    pub fn is_complete(&self) -> bool {
        self.host.is_some() && self.user.is_some() && self.password.is_some()
    }
}

/// Google OAuth client and endpoint settings
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,

    /// Refresh token from the environment; takes priority over the token file
    pub refresh_token: Option<String>,

    /// Where exchanged tokens are persisted
    pub token_path: PathBuf,

    /// Optional Google console client-secret file
    pub oauth_keys_path: Option<PathBuf>,

    pub auth_uri: String,
    pub token_uri: String,
    pub gmail_api_base: String,
    pub calendar_api_base: String,

    /// Scopes requested when the caller does not name any
    pub default_scopes: Vec<String>,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("redirect_uri", &self.redirect_uri)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("token_path", &self.token_path)
            .field("oauth_keys_path", &self.oauth_keys_path)
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: google::OOB_REDIRECT_URI.to_string(),
            refresh_token: None,
            token_path: PathBuf::from(google::TOKEN_FILE_NAME),
            oauth_keys_path: None,
            auth_uri: google::AUTH_URI.to_string(),
            token_uri: google::TOKEN_URI.to_string(),
            gmail_api_base: google::GMAIL_API_BASE.to_string(),
            calendar_api_base: google::CALENDAR_API_BASE.to_string(),
            default_scopes: vec![
                google::GMAIL_READONLY_SCOPE.to_string(),
                google::CALENDAR_EVENTS_SCOPE.to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_port(&var, "PORT", 3000)?;
        let smtp_port = parse_port(&var, "SMTP_PORT", 465)?;

        let smtp = SmtpConfig {
            host: var("SMTP_HOST"),
            port: smtp_port,
            user: var("SMTP_USER"),
            password: var("SMTP_PASS"),
            from_name: var("SMTP_FROM_NAME").unwrap_or_else(|| "Workspace Gateway".to_string()),
        };

        let defaults = GoogleConfig::default();
        let google = GoogleConfig {
            client_id: var("GOOGLE_CLIENT_ID"),
            client_secret: var("GOOGLE_CLIENT_SECRET"),
            redirect_uri: var("GOOGLE_REDIRECT_URI").unwrap_or(defaults.redirect_uri),
            refresh_token: var("GOOGLE_REFRESH_TOKEN"),
            token_path: var("GOOGLE_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_path),
            oauth_keys_path: var("GOOGLE_OAUTH_KEYS_PATH").map(PathBuf::from),
            ..defaults
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            smtp,
            google,
        })
    }

    /// Log which settings are present without revealing secrets
    pub fn log_summary(&self) {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "NOT SET".to_string());
        tracing::info!(
            host = %show(&self.smtp.host),
            port = self.smtp.port,
            user = %show(&self.smtp.user),
            pass = if self.smtp.password.is_some() { "***SET***" } else { "NOT SET" },
            "SMTP configuration"
        );
        tracing::info!(
            client_id = self.google.client_id.is_some(),
            refresh_token = self.google.refresh_token.is_some(),
            token_path = %self.google.token_path.display(),
            "Google OAuth configuration"
        );
    }
}

fn parse_port<F>(var: &F, key: &str, default: u16) -> Result<u16>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            GatewayError::Config(ConfigError::InvalidEnvVar {
                var: key.to_string(),
                value,
            })
        }),
    }
}

/// Locations searched for a Google console client-secret file
pub fn oauth_keys_candidates(explicit: Option<&PathBuf>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.clone());
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(google::OAUTH_KEYS_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".workspace-gateway").join(google::OAUTH_KEYS_FILE_NAME));
    }
    candidates
}

/// Google API constants
pub mod google {
    pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
    pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
    pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

    pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
    pub const TOKEN_FILE_NAME: &str = "token.json";
    pub const OAUTH_KEYS_FILE_NAME: &str = "gcp-oauth.keys.json";

    pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
    pub const CALENDAR_EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// Calendar used when the caller does not name one
    pub const PRIMARY_CALENDAR: &str = "primary";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.smtp.port, 465);
        assert!(!config.smtp.is_complete());
        assert_eq!(config.google.redirect_uri, google::OOB_REDIRECT_URI);
        assert_eq!(config.google.token_path, PathBuf::from("token.json"));
        assert_eq!(config.google.default_scopes.len(), 2);
        assert!(config.google.default_scopes[0].contains("gmail.readonly"));
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "me@example.com"),
            ("SMTP_PASS", "secret"),
            ("GOOGLE_REFRESH_TOKEN", "refresh"),
            ("GOOGLE_TOKEN_PATH", "/tmp/tokens.json"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.smtp.is_complete());
        assert_eq!(config.google.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(config.google.token_path, PathBuf::from("/tmp/tokens.json"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config_from(&[("SMTP_PASS", "  "), ("GOOGLE_REFRESH_TOKEN", "")]).unwrap();
        assert!(config.smtp.password.is_none());
        assert!(config.google.refresh_token.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Config(ConfigError::InvalidEnvVar { .. })
        ));
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config = config_from(&[("SMTP_PASS", "hunter2"), ("GOOGLE_CLIENT_SECRET", "s3cr3t")])
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("s3cr3t"));
    }
}
