// Paged fetcher for the issue/PR search endpoint
use std::collections::HashSet;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::github::{GitHubClient, GitHubError, Result, SearchItem, PER_PAGE};
use crate::window::DateWindow;

/// The search API refuses to serve results past the first thousand, so
/// pagination never goes beyond this many pages per query.
pub const SEARCH_PAGE_CEILING: u32 = 10;

/// The two item kinds searched per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    pub const ALL: [ItemKind; 2] = [ItemKind::Issue, ItemKind::PullRequest];

    fn qualifier(self) -> &'static str {
        match self {
            ItemKind::Issue => "is:issue",
            ItemKind::PullRequest => "is:pr",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Issue => write!(f, "issues"),
            ItemKind::PullRequest => write!(f, "pull requests"),
        }
    }
}

/// Build one combined query for all identities, OR-of-ANDs:
///
/// `is:issue created:A..B involves:u1 OR is:issue created:A..B involves:u2`
///
/// In the search grammar whitespace (AND) binds tighter than OR, which is
/// what makes the single combined query equivalent to the union of
/// per-identity queries. One query per kind regardless of identity count.
pub fn build_query(kind: ItemKind, identities: &[String], window: &DateWindow) -> String {
    identities
        .iter()
        .map(|login| format!("{} created:{} involves:{}", kind.qualifier(), window, login))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Accumulates items across both queries of one request, deduplicating by
/// the item's numeric id as pages arrive. First-seen copy wins. Owned and
/// passed explicitly so there is no shared state between requests.
#[derive(Default)]
struct SearchAccumulator {
    seen: HashSet<u64>,
    items: Vec<SearchItem>,
}

impl SearchAccumulator {
    fn absorb(&mut self, batch: Vec<SearchItem>) {
        for item in batch {
            if self.seen.insert(item.id) {
                self.items.push(item);
            }
        }
    }
}

/// Fetch all issues and PRs involving any of the identities in the window.
///
/// Runs exactly two paginated queries (one per kind). A pagination-limit
/// response ends that query and moves on to the next. Any other failure
/// returns what was accumulated so far as a partial result, unless nothing
/// was accumulated yet, in which case the error propagates: a caller with
/// zero items could not otherwise tell "no activity" from "total failure".
pub async fn fetch_work_items(
    client: &GitHubClient,
    identities: &[String],
    window: &DateWindow,
) -> Result<Vec<SearchItem>> {
    let mut acc = SearchAccumulator::default();

    for (i, kind) in ItemKind::ALL.into_iter().enumerate() {
        if i > 0 {
            sleep(client.page_delay()).await;
        }

        let query = build_query(kind, identities, window);
        match run_query(client, &query, &mut acc).await {
            Ok(()) => {}
            Err(e) if !acc.items.is_empty() => {
                warn!(
                    "Search for {} failed after {} items were collected: {}; keeping partial result",
                    kind,
                    acc.items.len(),
                    e
                );
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(acc.items)
}

/// Paginate one query into the accumulator.
///
/// Stops at the page ceiling, on a short page, or once the cumulative raw
/// count reaches the query's reported total. Stop conditions use the raw
/// page size, not the post-dedup size, so duplicates cannot mask the last
/// page.
async fn run_query(
    client: &GitHubClient,
    query: &str,
    acc: &mut SearchAccumulator,
) -> Result<()> {
    let mut fetched: u64 = 0;

    for page in 1..=SEARCH_PAGE_CEILING {
        if page > 1 {
            sleep(client.page_delay()).await;
        }

        let result = client.search_issues_page(query, page, PER_PAGE).await;
        let search_page = match result {
            Ok(p) => p,
            Err(GitHubError::PaginationLimitReached) => {
                debug!("Search refused page {} for this query; moving on", page);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let raw_len = search_page.items.len();
        fetched += raw_len as u64;
        acc.absorb(search_page.items);

        if (raw_len as u32) < PER_PAGE || fetched >= search_page.total_count {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use chrono::NaiveDate;
    use mockito::Matcher;
    use std::time::Duration;

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    fn identities(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn test_client(base_url: String) -> GitHubClient {
        GitHubClient::with_base_url(None, base_url)
            .with_retry_config(RetryConfig::none())
            .with_page_delay(Duration::ZERO)
    }

    fn item_json(id: u64, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "number": id,
            "title": title,
            "state": "open",
            "created_at": "2024-01-10T12:00:00Z",
            "updated_at": "2024-01-11T12:00:00Z",
            "user": {"login": "user1"},
            "assignees": [],
        })
    }

    fn page_body(ids: std::ops::Range<u64>, total_count: u64) -> String {
        let items: Vec<_> = ids.map(|id| item_json(id, "item")).collect();
        serde_json::json!({"total_count": total_count, "items": items}).to_string()
    }

    fn match_kind(kind: ItemKind, ids: &[String]) -> Matcher {
        Matcher::UrlEncoded("q".into(), build_query(kind, ids, &window()))
    }

    fn match_kind_page(kind: ItemKind, ids: &[String], page: u32) -> Matcher {
        Matcher::AllOf(vec![
            match_kind(kind, ids),
            Matcher::UrlEncoded("page".into(), page.to_string()),
        ])
    }

    #[test]
    fn test_build_query_combines_identities_with_or() {
        let ids = identities(&["user1", "user2"]);
        let q = build_query(ItemKind::Issue, &ids, &window());
        assert_eq!(
            q,
            "is:issue created:2024-01-01..2024-01-31 involves:user1 \
             OR is:issue created:2024-01-01..2024-01-31 involves:user2"
        );
    }

    #[test]
    fn test_build_query_pr_qualifier() {
        let ids = identities(&["user1"]);
        let q = build_query(ItemKind::PullRequest, &ids, &window());
        assert_eq!(q, "is:pr created:2024-01-01..2024-01-31 involves:user1");
    }

    #[tokio::test]
    async fn test_issues_and_prs_are_two_queries_regardless_of_identity_count() {
        let mut server = mockito::Server::new_async().await;
        let ids = identities(&["user1", "user2", "user3"]);

        let issues = server
            .mock("GET", "/search/issues")
            .match_query(match_kind(ItemKind::Issue, &ids))
            .with_status(200)
            .with_body(page_body(1..3, 2))
            .expect(1)
            .create_async()
            .await;
        let prs = server
            .mock("GET", "/search/issues")
            .match_query(match_kind(ItemKind::PullRequest, &ids))
            .with_status(200)
            .with_body(page_body(10..11, 1))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(server.url());
        let items = fetch_work_items(&client, &ids, &window()).await.unwrap();

        issues.assert_async().await;
        prs.assert_async().await;
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_ten_page_ceiling() {
        let mut server = mockito::Server::new_async().await;
        let ids = identities(&["user1"]);

        // The server always claims more data is available
        let issues = server
            .mock("GET", "/search/issues")
            .match_query(match_kind(ItemKind::Issue, &ids))
            .with_status(200)
            .with_body(page_body(0..100, 5000))
            .expect(10)
            .create_async()
            .await;
        let prs = server
            .mock("GET", "/search/issues")
            .match_query(match_kind(ItemKind::PullRequest, &ids))
            .with_status(200)
            .with_body(page_body(0..0, 0))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(server.url());
        fetch_work_items(&client, &ids, &window()).await.unwrap();

        issues.assert_async().await;
        prs.assert_async().await;
    }

    #[tokio::test]
    async fn test_stops_when_cumulative_count_reaches_total() {
        let mut server = mockito::Server::new_async().await;
        let ids = identities(&["user1"]);

        let page1 = server
            .mock("GET", "/search/issues")
            .match_query(match_kind_page(ItemKind::Issue, &ids, 1))
            .with_status(200)
            .with_body(page_body(0..100, 200))
            .expect(1)
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/search/issues")
            .match_query(match_kind_page(ItemKind::Issue, &ids, 2))
            .with_status(200)
            .with_body(page_body(100..200, 200))
            .expect(1)
            .create_async()
            .await;
        let prs = server
            .mock("GET", "/search/issues")
            .match_query(match_kind(ItemKind::PullRequest, &ids))
            .with_status(200)
            .with_body(page_body(0..0, 0))
            .create_async()
            .await;

        let client = test_client(server.url());
        let items = fetch_work_items(&client, &ids, &window()).await.unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        prs.assert_async().await;
        assert_eq!(items.len(), 200);
    }

    #[tokio::test]
    async fn test_dedup_across_pages_and_kinds_first_seen_wins() {
        let mut server = mockito::Server::new_async().await;
        let ids = identities(&["user1"]);

        let issue_items = serde_json::json!({
            "total_count": 3,
            "items": [item_json(1, "first copy"), item_json(2, "first copy"), item_json(3, "first copy")],
        });
        let pr_items = serde_json::json!({
            "total_count": 2,
            "items": [item_json(2, "second copy"), item_json(4, "first copy")],
        });

        let _issues = server
            .mock("GET", "/search/issues")
            .match_query(match_kind(ItemKind::Issue, &ids))
            .with_status(200)
            .with_body(issue_items.to_string())
            .create_async()
            .await;
        let _prs = server
            .mock("GET", "/search/issues")
            .match_query(match_kind(ItemKind::PullRequest, &ids))
            .with_status(200)
            .with_body(pr_items.to_string())
            .create_async()
            .await;

        let client = test_client(server.url());
        let items = fetch_work_items(&client, &ids, &window()).await.unwrap();

        let got: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(got, vec![1, 2, 3, 4]);
        let duplicated = items.iter().find(|i| i.id == 2).unwrap();
        assert_eq!(duplicated.title, "first copy");
    }

    #[tokio::test]
    async fn test_pagination_limit_ends_query_and_moves_to_next() {
        let mut server = mockito::Server::new_async().await;
        let ids = identities(&["user1"]);

        let _page1 = server
            .mock("GET", "/search/issues")
            .match_query(match_kind_page(ItemKind::Issue, &ids, 1))
            .with_status(200)
            .with_body(page_body(0..100, 5000))
            .create_async()
            .await;
        let _page2 = server
            .mock("GET", "/search/issues")
            .match_query(match_kind_page(ItemKind::Issue, &ids, 2))
            .with_status(422)
            .with_body(r#"{"message":"Only the first 1000 search results are available"}"#)
            .create_async()
            .await;
        let prs = server
            .mock("GET", "/search/issues")
            .match_query(match_kind(ItemKind::PullRequest, &ids))
            .with_status(200)
            .with_body(page_body(200..201, 1))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(server.url());
        let items = fetch_work_items(&client, &ids, &window()).await.unwrap();

        prs.assert_async().await;
        assert_eq!(items.len(), 101);
    }

    #[tokio::test]
    async fn test_failure_after_partial_accumulation_returns_partial() {
        let mut server = mockito::Server::new_async().await;
        let ids = identities(&["user1"]);

        let _page1b = server
            .mock("GET", "/search/issues")
            .match_query(match_kind_page(ItemKind::Issue, &ids, 1))
            .with_status(200)
            .with_body(page_body(0..100, 5000))
            .create_async()
            .await;
        let _page2b = server
            .mock("GET", "/search/issues")
            .match_query(match_kind_page(ItemKind::Issue, &ids, 2))
            .with_status(500)
            .with_body(r#"{"message":"boom"}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let items = fetch_work_items(&client, &ids, &window()).await.unwrap();

        assert_eq!(items.len(), 100);
    }

    #[tokio::test]
    async fn test_failure_with_nothing_accumulated_propagates() {
        let mut server = mockito::Server::new_async().await;
        let ids = identities(&["user1"]);

        let _any = server
            .mock("GET", "/search/issues")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"message":"boom"}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let result = fetch_work_items(&client, &ids, &window()).await;

        assert!(matches!(result, Err(GitHubError::ServerError(_))));
    }
}
