use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{with_retry, RetryConfig};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// Page size requested from both endpoints. GitHub caps `per_page` at 100,
/// so asking for more just gets silently clamped anyway.
pub const PER_PAGE: u32 = 100;

/// Delay awaited between consecutive page requests. One shared rate-limited
/// key serves the whole request, so pages are paced rather than burst.
pub const DEFAULT_PAGE_DELAY_MS: u64 = 750;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication required")]
    AuthRequired,

    /// The API refuses to serve further pages for this query. Not a real
    /// failure: pagination stops and whatever was collected is kept.
    #[error("pagination window exceeded")]
    PaginationLimitReached,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl GitHubError {
    /// Errors worth another attempt with backoff. A 404, a 422 pagination
    /// refusal, or a bad token will fail identically on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GitHubError::ServerError(_)
                | GitHubError::RateLimitExceeded
                | GitHubError::NetworkError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
    page_delay: Duration,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, GITHUB_API_BASE.to_string())
    }

    /// For GitHub Enterprise instances, or tests pointing at a mock server
    pub fn with_base_url(token: Option<String>, base_url: String) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("GitPulse/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token,
            base_url,
            retry_config: RetryConfig::default(),
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
        }
    }

    /// Replace the retry configuration
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Replace the inter-page pacing delay (tests set this to zero)
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }

    /// One page of a user's public event feed
    pub async fn user_events_page(
        &self,
        login: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RawEvent>> {
        let url = format!("{}/users/{}/events", self.base_url, login);
        let token = self.token.clone();

        with_retry(&self.retry_config, GitHubError::is_transient, || async {
            let mut request = self.client.get(&url).query(&[
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ]);

            if let Some(ref token) = token {
                request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
            }

            let response = request.send().await?;

            if !response.status().is_success() {
                return Err(classify_failure(response, login).await);
            }

            let events: Vec<RawEvent> = response.json().await?;
            Ok(events)
        })
        .await
    }

    /// One page of issue/PR search results for a combined query.
    ///
    /// The raw JSON of each item is kept alongside the parsed fields so
    /// callers can preserve the payload verbatim.
    pub async fn search_issues_page(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage> {
        let url = format!("{}/search/issues", self.base_url);
        let token = self.token.clone();

        with_retry(&self.retry_config, GitHubError::is_transient, || async {
            let mut request = self.client.get(&url).query(&[
                ("q", query.to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("sort", "updated".to_string()),
                ("order", "desc".to_string()),
            ]);

            if let Some(ref token) = token {
                request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
            }

            let response = request.send().await?;

            if !response.status().is_success() {
                return Err(classify_failure(response, query).await);
            }

            let body: serde_json::Value = response.json().await?;

            let total_count = body
                .get("total_count")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);

            let raw_items = match body.get("items").and_then(serde_json::Value::as_array) {
                Some(items) => items.clone(),
                None => Vec::new(),
            };

            let mut items = Vec::with_capacity(raw_items.len());
            for raw in raw_items {
                let mut item: SearchItem = serde_json::from_value(raw.clone())?;
                item.raw = raw;
                items.push(item);
            }

            Ok(SearchPage { total_count, items })
        })
        .await
    }
}

/// Map a non-2xx response onto the error taxonomy.
///
/// The pagination-limit signal is a 422 whose message mentions pagination;
/// GitHub phrases it differently per endpoint ("pagination is limited for
/// this resource" on the event feed, "only the first 1000 search results
/// are available" on search), so the match is by substring.
async fn classify_failure(response: reqwest::Response, context: &str) -> GitHubError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 => GitHubError::AuthRequired,
        404 => GitHubError::NotFound(context.to_string()),
        429 => GitHubError::RateLimitExceeded,
        403 if body.to_ascii_lowercase().contains("rate limit") => GitHubError::RateLimitExceeded,
        422 if is_pagination_limit(&body) => GitHubError::PaginationLimitReached,
        _ if status.is_server_error() => {
            GitHubError::ServerError(format!("Status {}: {}", status, body))
        }
        _ => GitHubError::RequestFailed(format!("Status {}: {}", status, body)),
    }
}

fn is_pagination_limit(body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    body.contains("pagination is limited") || body.contains("first 1000 search results")
}

/// One record from a user's public event feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub actor: EventActor,
    #[serde(default)]
    pub repo: Option<EventRepo>,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventActor {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRepo {
    pub id: u64,
    pub name: String,
}

/// One page of search results
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub total_count: u64,
    pub items: Vec<SearchItem>,
}

/// One issue or pull request from the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<ItemUser>,
    #[serde(default)]
    pub assignee: Option<ItemUser>,
    #[serde(default)]
    pub assignees: Vec<ItemUser>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
    /// Original payload as returned by the API, attached after parsing
    #[serde(skip)]
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemUser {
    pub login: String,
}
