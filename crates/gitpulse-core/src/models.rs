use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Raw submit input as it arrives from the caller, before validation
#[derive(Debug, Clone, Default)]
pub struct FetchInput {
    /// Comma-separated account names
    pub identities: String,
    /// `YYYY-MM-DD`
    pub start: String,
    /// `YYYY-MM-DD`
    pub end: String,
    pub token: Option<String>,
}

/// A validated request: normalized identities and a sane date range
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Trimmed, deduplicated, first-seen order preserved
    pub identities: Vec<String>,
    pub start: NaiveDate,
    /// Inclusive through the whole end day
    pub end: NaiveDate,
    pub token: Option<String>,
}

/// One timestamped activity record from a user's event feed.
/// Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    /// Account that generated the event
    pub identity: String,
    /// Event kind tag, e.g. "PushEvent"
    pub kind: String,
    pub repo: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Opaque payload, kept as the API returned it
    pub payload: serde_json::Value,
}

/// One issue or pull request involving any of the identities.
///
/// Deduplicated by `id` across queries; the first-seen copy wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Globally unique numeric id in the remote system - the dedup key
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Normalized to empty rather than absent
    pub assignee: String,
    pub assignees: Vec<String>,
    /// Original payload preserved verbatim for later raw inspection
    pub raw: serde_json::Value,
}

/// Which API surface produced a stored collection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiMode {
    EventsFeed,
    Search,
}

impl std::fmt::Display for ApiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiMode::EventsFeed => write!(f, "events"),
            ApiMode::Search => write!(f, "search"),
        }
    }
}

/// Metadata stored alongside each committed collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchMetadata {
    pub last_fetch: DateTime<Utc>,
    pub identities: Vec<String>,
    pub api_mode: ApiMode,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Everything one request produced: merged collections plus per-identity
/// failures. Built incrementally during the request, handed out once at
/// the end (or on early termination, with whatever was collected).
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Newest first
    pub events: Vec<ActivityEvent>,
    /// Most recently updated first
    pub work_items: Vec<WorkItem>,
    pub fetched_at: DateTime<Utc>,
    pub identities: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// (identity, error message) for each identity whose events fetch failed
    pub failed_identities: Vec<(String, String)>,
}
