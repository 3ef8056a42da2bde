// HTTP layer for the GitHub REST and Search APIs
pub mod events;
pub mod github;
pub mod retry;
pub mod search;
pub mod window;

// Re-export common types
pub use events::fetch_user_events;
pub use github::{GitHubClient, GitHubError, RawEvent, SearchItem, SearchPage};
pub use retry::RetryConfig;
pub use search::{build_query, fetch_work_items, ItemKind};
pub use window::DateWindow;
