// GitHub provider - bridges the API clients with the source traits
use async_trait::async_trait;
use gitpulse_api::{fetch_user_events, fetch_work_items, DateWindow, GitHubClient, RawEvent, SearchItem};

use crate::{
    models::{ActivityEvent, WorkItem},
    sources::{EventsSource, WorkItemSource},
    Result,
};

/// Wrapper around GitHubClient that implements both source traits.
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct GitHubActivityProvider {
    client: GitHubClient,
}

impl GitHubActivityProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: GitHubClient::new(token),
        }
    }

    pub fn with_client(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventsSource for GitHubActivityProvider {
    async fn events_for(&self, login: &str, window: &DateWindow) -> Result<Vec<ActivityEvent>> {
        let events = fetch_user_events(&self.client, login, window).await?;
        Ok(events.into_iter().map(raw_to_event).collect())
    }
}

#[async_trait]
impl WorkItemSource for GitHubActivityProvider {
    async fn work_items_for(
        &self,
        identities: &[String],
        window: &DateWindow,
    ) -> Result<Vec<WorkItem>> {
        let items = fetch_work_items(&self.client, identities, window).await?;
        Ok(items.into_iter().map(item_to_work_item).collect())
    }
}

/// Convert a raw feed event to our internal model
fn raw_to_event(raw: RawEvent) -> ActivityEvent {
    ActivityEvent {
        id: raw.id,
        identity: raw.actor.login,
        kind: raw.kind,
        repo: raw.repo.map(|r| r.name),
        created_at: raw.created_at,
        payload: raw.payload,
    }
}

/// Convert a search item to our internal model, with assignee fields
/// normalized to empty rather than absent
fn item_to_work_item(item: SearchItem) -> WorkItem {
    WorkItem {
        id: item.id,
        number: item.number,
        title: item.title,
        state: item.state,
        created_at: item.created_at,
        updated_at: item.updated_at,
        assignee: item.assignee.map(|u| u.login).unwrap_or_default(),
        assignees: item.assignees.into_iter().map(|u| u.login).collect(),
        raw: item.raw,
    }
}
