use async_trait::async_trait;
use gitpulse_api::DateWindow;

use crate::{
    models::{ActivityEvent, WorkItem},
    Result,
};

/// Trait for the per-identity event feed - makes testing easier and keeps
/// the orchestrator independent of the HTTP layer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventsSource: Send + Sync {
    /// All of one identity's events inside the window, unordered
    async fn events_for(&self, login: &str, window: &DateWindow) -> Result<Vec<ActivityEvent>>;
}

/// Trait for the combined issue/PR search across all identities
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    /// Issues and PRs involving any of the identities, deduplicated,
    /// unordered. One call per request regardless of identity count.
    async fn work_items_for(
        &self,
        identities: &[String],
        window: &DateWindow,
    ) -> Result<Vec<WorkItem>>;
}
