use async_trait::async_trait;

use crate::{
    models::{ActivityEvent, FetchMetadata, WorkItem},
    Result,
};

/// Storage key for committed event collections
pub const EVENTS_KEY: &str = "events";
/// Storage key for committed issue/PR collections
pub const WORK_ITEMS_KEY: &str = "work_items";

/// Abstract output sink for committed collections.
///
/// The engine only depends on this store/clear capability; where the data
/// actually lands (SQLite, a remote structured store, a flat key-value
/// fallback) is the implementor's business, never special-cased here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Store an event collection under `key`, replacing any previous one
    async fn store_events(
        &self,
        key: &str,
        events: &[ActivityEvent],
        metadata: &FetchMetadata,
    ) -> Result<()>;

    /// Store a work-item collection under `key`, replacing any previous one
    async fn store_work_items(
        &self,
        key: &str,
        items: &[WorkItem],
        metadata: &FetchMetadata,
    ) -> Result<()>;

    /// Drop whatever is stored under `key`
    async fn clear(&self, key: &str) -> Result<()>;

    /// Whether anything is stored under `key`
    async fn contains(&self, key: &str) -> Result<bool>;
}
