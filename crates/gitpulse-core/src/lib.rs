// Core engine logic lives here - validation, orchestration, aggregation
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod sink;
pub mod sources;
pub mod validate;

pub use config::Config;
pub use error::Error;
pub use models::{ActivityEvent, ApiMode, FetchInput, FetchMetadata, FetchOutcome, SearchRequest, WorkItem};
pub use orchestrator::{CancelHandle, FetchOrchestrator, FetchPhase, FetchProgress};
pub use sink::{ResultSink, EVENTS_KEY, WORK_ITEMS_KEY};
pub use sources::{EventsSource, WorkItemSource};

// Re-exported so callers don't need a direct gitpulse-api dependency
pub use gitpulse_api::DateWindow;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
