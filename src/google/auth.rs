//! OAuth authentication for Google APIs
//!
//! Handles the OAuth 2.0 flow including:
//! - Resolving client credentials (environment or Google console keys file)
//! - Building the consent URL and exchanging authorization codes
//! - Choosing between a configured refresh token and the persisted token file
//! - Refreshing and caching access tokens

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use yup_oauth2::ApplicationSecret;

use crate::config::{oauth_keys_candidates, GoogleConfig};
use crate::error::{AuthError, GatewayError, Result};

/// Access tokens closer than this to expiry are refreshed
const EXPIRY_MARGIN_MS: i64 = 60_000;

/// Token set as persisted in the token file
///
/// Field names and the millisecond `expiry_date` match the `token.json`
/// written by Google's client libraries, so existing files keep working.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Expiry timestamp (Unix milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl TokenSet {
    fn from_response(response: TokenResponse, now_ms: i64) -> Self {
        Self {
            access_token: Some(response.access_token),
            refresh_token: response.refresh_token,
            scope: response.scope,
            token_type: response.token_type,
            id_token: response.id_token,
            expiry_date: response.expires_in.map(|secs| now_ms + secs * 1000),
        }
    }

    /// A usable access token, if one is present and not about to expire
    fn valid_access_token(&self, now_ms: i64) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        match self.expiry_date {
            Some(expiry) if expiry - now_ms < EXPIRY_MARGIN_MS => None,
            _ => Some(token),
        }
    }
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Where API credentials come from, in order of precedence
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    /// Refresh token supplied through configuration
    RefreshToken(String),

    /// Tokens persisted by a previous code exchange
    TokenFile { path: PathBuf, tokens: TokenSet },
}

impl CredentialSource {
    fn refresh_token(&self) -> Option<&str> {
        match self {
            CredentialSource::RefreshToken(token) => Some(token),
            CredentialSource::TokenFile { tokens, .. } => tokens.refresh_token.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    refresh_token: Option<String>,
    tokens: TokenSet,
}

/// OAuth client shared by the Gmail and Calendar wrappers
pub struct OAuthClient {
    config: GoogleConfig,

    http_client: reqwest::Client,

    /// Client id/secret, when configured
    secret: Option<ApplicationSecret>,

    /// Last access token obtained by a refresh
    cached: Arc<RwLock<Option<CachedToken>>>,
}

impl OAuthClient {
    /// Create a new OAuth client, resolving the client secret
    pub async fn new(config: GoogleConfig) -> Result<Self> {
        let secret = Self::resolve_secret(&config).await?;
        if secret.is_none() {
            warn!("Google client credentials not configured");
        }

        Ok(Self {
            config,
            http_client: reqwest::Client::new(),
            secret,
            cached: Arc::new(RwLock::new(None)),
        })
    }

    /// Client secret from the environment, else from a console keys file
    async fn resolve_secret(config: &GoogleConfig) -> Result<Option<ApplicationSecret>> {
        if let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret)
        {
            return Ok(Some(ApplicationSecret {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                auth_uri: config.auth_uri.clone(),
                token_uri: config.token_uri.clone(),
                redirect_uris: vec![config.redirect_uri.clone()],
                ..Default::default()
            }));
        }

        for path in oauth_keys_candidates(config.oauth_keys_path.as_ref()) {
            if !path.exists() {
                continue;
            }
            let secret = yup_oauth2::read_application_secret(&path)
                .await
                .map_err(|e| {
                    GatewayError::Auth(AuthError::InvalidKeysFile {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })
                })?;
            info!(path = %path.display(), "Loaded Google client secret from keys file");
            return Ok(Some(secret));
        }

        Ok(None)
    }

    fn secret(&self) -> Result<&ApplicationSecret> {
        self.secret
            .as_ref()
            .ok_or(GatewayError::Auth(AuthError::MissingClientCredentials))
    }

    /// Generate the consent URL; an empty scope list requests the defaults
    pub fn auth_url(&self, scopes: &[String]) -> Result<String> {
        let secret = self.secret()?;
        let scopes = if scopes.is_empty() {
            self.config.default_scopes.join(" ")
        } else {
            scopes.join(" ")
        };

        Ok(format!(
            "{}?access_type=offline&prompt=consent&response_type=code&client_id={}&redirect_uri={}&scope={}",
            secret.auth_uri,
            urlencoding::encode(&secret.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scopes)
        ))
    }

    /// Exchange an authorization code for tokens and persist them
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        let code = code.trim();
        if code.is_empty() {
            return Err(GatewayError::Auth(AuthError::NoAuthCode));
        }
        let secret = self.secret()?;

        let params = [
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&secret.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Auth(AuthError::TokenExchangeFailed {
                message: format!("({}) {}", status, text),
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        let tokens = TokenSet::from_response(token_response, now_ms());

        if tokens.refresh_token.is_none() {
            warn!("Token exchange returned no refresh token");
        }

        // Persisting is a convenience for local use; the caller still gets the tokens.
        if let Err(e) = save_tokens(&self.config.token_path, &tokens).await {
            warn!(path = %self.config.token_path.display(), error = %e, "Failed to persist tokens");
        } else {
            info!(path = %self.config.token_path.display(), "Tokens persisted");
        }

        Ok(tokens)
    }

    /// Resolve credentials: configured refresh token, then the token file
    pub async fn credential_source(&self) -> Result<CredentialSource> {
        if let Some(ref token) = self.config.refresh_token {
            return Ok(CredentialSource::RefreshToken(token.clone()));
        }

        let path = &self.config.token_path;
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            let tokens = load_tokens(path).await?;
            return Ok(CredentialSource::TokenFile {
                path: path.clone(),
                tokens,
            });
        }

        Err(GatewayError::Auth(AuthError::NoCredentials))
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn access_token(&self) -> Result<String> {
        let source = self.credential_source().await?;
        let refresh_token = source.refresh_token().map(str::to_string);
        let now = now_ms();

        {
            let cached = self.cached.read().await;
            if let Some(ref cached) = *cached {
                if cached.refresh_token == refresh_token {
                    if let Some(token) = cached.tokens.valid_access_token(now) {
                        return Ok(token.to_string());
                    }
                }
            }
        }

        if let CredentialSource::TokenFile { ref tokens, .. } = source {
            if let Some(token) = tokens.valid_access_token(now) {
                return Ok(token.to_string());
            }
        }

        let refresh_token = refresh_token.ok_or_else(|| {
            GatewayError::Auth(AuthError::TokenRefreshFailed {
                message: "No refresh token available".to_string(),
            })
        })?;

        debug!("Refreshing Google access token");
        let mut refreshed = self.refresh(&refresh_token).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token.clone());
        }

        if let CredentialSource::TokenFile { path, tokens } = source {
            let merged = TokenSet {
                scope: refreshed.scope.clone().or(tokens.scope),
                id_token: refreshed.id_token.clone().or(tokens.id_token),
                ..refreshed.clone()
            };
            if let Err(e) = save_tokens(&path, &merged).await {
                warn!(path = %path.display(), error = %e, "Failed to persist refreshed tokens");
            }
        }

        let access_token = refreshed.access_token.clone().unwrap_or_default();
        *self.cached.write().await = Some(CachedToken {
            refresh_token: Some(refresh_token),
            tokens: refreshed,
        });

        Ok(access_token)
    }

    /// Refresh the access token using the refresh token
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let secret = self.secret()?;

        let params = [
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&secret.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Auth(AuthError::TokenRefreshFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(TokenSet::from_response(token_response, now_ms()))
    }

    /// Run the consent flow from a terminal
    ///
    /// Prints (and optionally opens) the consent URL, then takes the code from
    /// `code`, from a local callback server when the redirect URI points at
    /// localhost, or from stdin.
    pub async fn authenticate_interactive(
        &self,
        scopes: &[String],
        code: Option<String>,
        open_browser: bool,
    ) -> Result<TokenSet> {
        if let Some(code) = code {
            return self.exchange_code(&code).await;
        }

        let auth_url = self.auth_url(scopes)?;
        eprintln!("\nPlease visit this URL to authenticate:");
        eprintln!("{}\n", auth_url);

        if open_browser {
            if let Err(e) = open::that(&auth_url) {
                eprintln!("Could not open browser automatically: {}", e);
                eprintln!("Please open the URL manually.");
            }
        }

        let code = match loopback_port(&self.config.redirect_uri) {
            Some((port, path)) => wait_for_callback(port, &path).await?,
            None => read_code_from_stdin().await?,
        };

        eprintln!("Received authorization code, exchanging for tokens...");
        self.exchange_code(&code).await
    }
}

/// Port and path of a `http://localhost:<port>/...` redirect URI
fn loopback_port(redirect_uri: &str) -> Option<(u16, String)> {
    let url = reqwest::Url::parse(redirect_uri).ok()?;
    if url.scheme() != "http" {
        return None;
    }
    match url.host_str()? {
        "localhost" | "127.0.0.1" => Some((url.port_or_known_default()?, url.path().to_string())),
        _ => None,
    }
}

/// Serve a single OAuth callback and return the code it carries
async fn wait_for_callback(port: u16, path: &str) -> Result<String> {
    use axum::{extract::Query, response::Html, routing::get, Router};
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    let (tx, rx) = oneshot::channel::<String>();
    let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

    let callback_handler = move |Query(params): Query<HashMap<String, String>>| async move {
        match params.get("code") {
            Some(code) => {
                if let Ok(mut slot) = tx.lock() {
                    if let Some(tx) = slot.take() {
                        let _ = tx.send(code.clone());
                    }
                }
                Html("<html><body><h1>Authentication successful!</h1><p>You can close this window.</p></body></html>")
            }
            None => Html("<html><body><h1>Authentication failed</h1><p>No authorization code received.</p></body></html>"),
        }
    };

    let app = Router::new().route(path, get(callback_handler));
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    eprintln!("Waiting for authentication callback on port {}...", port);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
            Err(GatewayError::Auth(AuthError::NoAuthCode))
        }
        code = rx => code.map_err(|_| GatewayError::Auth(AuthError::NoAuthCode)),
    }
}

async fn read_code_from_stdin() -> Result<String> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    eprint!("Enter the authorization code: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

    let code = line.trim().to_string();
    if code.is_empty() {
        return Err(GatewayError::Auth(AuthError::NoAuthCode));
    }
    Ok(code)
}

async fn load_tokens(path: &Path) -> Result<TokenSet> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| {
        GatewayError::Auth(AuthError::InvalidTokenFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })
}

async fn save_tokens(path: &Path, tokens: &TokenSet) -> Result<()> {
    let content = serde_json::to_string_pretty(tokens)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
