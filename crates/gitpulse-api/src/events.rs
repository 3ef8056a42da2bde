// Paged fetcher for a single user's public event feed
use tokio::time::sleep;
use tracing::debug;

use crate::github::{GitHubClient, GitHubError, RawEvent, Result, PER_PAGE};
use crate::window::DateWindow;

/// The event feed does not guarantee stable pagination beyond a small
/// window (GitHub only serves ~300 events per user), so fetching stops
/// after this many pages regardless of how much the server claims remains.
/// A deliberate completeness trade-off, not a bug.
pub const EVENTS_PAGE_CEILING: u32 = 3;

/// Fetch all of one user's events inside the date window.
///
/// Events outside the window are dropped but never treated as a stop
/// signal: the feed is only roughly chronological, so a window can
/// straddle page boundaries imperfectly.
///
/// A pagination-limit response ends the loop gracefully and returns what
/// was accumulated. Any other failure propagates; the caller decides
/// whether to skip this user and continue with others.
pub async fn fetch_user_events(
    client: &GitHubClient,
    login: &str,
    window: &DateWindow,
) -> Result<Vec<RawEvent>> {
    let mut collected = Vec::new();

    for page in 1..=EVENTS_PAGE_CEILING {
        if page > 1 {
            sleep(client.page_delay()).await;
        }

        let batch = match client.user_events_page(login, page, PER_PAGE).await {
            Ok(batch) => batch,
            Err(GitHubError::PaginationLimitReached) => {
                debug!(
                    "Event feed for {} refused page {}; keeping {} events",
                    login,
                    page,
                    collected.len()
                );
                break;
            }
            Err(e) => return Err(e),
        };

        let raw_len = batch.len();
        collected.extend(batch.into_iter().filter(|e| window.contains(e.created_at)));

        // A short page means the feed is exhausted
        if (raw_len as u32) < PER_PAGE {
            break;
        }
    }

    Ok(collected)
}
