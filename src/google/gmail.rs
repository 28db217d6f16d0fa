//! Gmail search client
//!
//! Lists messages matching a filter-built query and fetches their details.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::google::USER_ID;
use crate::error::{GatewayError, GoogleApiError, Result};
use crate::google::auth::OAuthClient;
use crate::google::message::{extract_body, find_header};
use crate::google::query::{build_gmail_query, SearchFilters};
use crate::google::types::{Message, MessageList};

/// One message in a search result
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: String,
    pub thread_id: String,
    pub snippet: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,

    /// Decoded body, only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Result of a search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub total: usize,
    pub emails: Vec<EmailSummary>,
}

/// Gmail API client
pub struct GmailClient {
    http_client: reqwest::Client,
    auth: Arc<OAuthClient>,
    api_base: String,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new(auth: Arc<OAuthClient>, api_base: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            auth,
            api_base: api_base.into(),
        }
    }

    /// Base URL for messages
    fn messages_url(&self) -> String {
        format!("{}/users/{}/messages", self.api_base, USER_ID)
    }

    /// Search messages matching `filters`
    pub async fn search(&self, filters: &SearchFilters) -> Result<SearchResult> {
        let query = build_gmail_query(filters);
        let max_results = filters.effective_max_results();
        info!(query = %query, max_results, "Searching Gmail");

        let token = self.auth.access_token().await?;
        let max = max_results.to_string();

        let response = self
            .http_client
            .get(self.messages_url())
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("maxResults", max.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Google(GoogleApiError::RequestFailed {
                message: format!("Failed to search messages ({}): {}", status, text),
            }));
        }

        let list: MessageList = response.json().await?;
        if list.messages.is_empty() {
            return Ok(SearchResult {
                query,
                total: 0,
                emails: Vec::new(),
            });
        }

        debug!(count = list.messages.len(), "Fetching message details");
        let emails = try_join_all(
            list.messages
                .iter()
                .map(|m| self.fetch_summary(&token, &m.id, filters.include_body)),
        )
        .await?;

        Ok(SearchResult {
            query,
            total: emails.len(),
            emails,
        })
    }

    /// Fetch a full message and reduce it to a summary
    async fn fetch_summary(
        &self,
        token: &str,
        message_id: &str,
        include_body: bool,
    ) -> Result<EmailSummary> {
        let url = format!("{}/{}", self.messages_url(), message_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[("format", "full")])
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Err(GatewayError::Google(GoogleApiError::MessageNotFound {
                message_id: message_id.to_string(),
            }));
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Google(GoogleApiError::RequestFailed {
                message: format!("Failed to get message ({}): {}", status, text),
            }));
        }

        let message: Message = response.json().await?;
        Ok(summarize(message, include_body))
    }
}

/// Reshape a full message into the search result form
pub fn summarize(message: Message, include_body: bool) -> EmailSummary {
    let payload = message.payload.unwrap_or_default();

    EmailSummary {
        id: message.id,
        thread_id: message.thread_id.unwrap_or_default(),
        snippet: message.snippet.unwrap_or_default(),
        from: find_header(&payload, "From").to_string(),
        to: find_header(&payload, "To").to_string(),
        subject: find_header(&payload, "Subject").to_string(),
        date: find_header(&payload, "Date").to_string(),
        body: include_body.then(|| extract_body(&payload)),
    }
}
