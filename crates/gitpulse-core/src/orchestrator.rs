// Fetch orchestration - sequences the fetchers, aggregates, commits
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use gitpulse_api::DateWindow;
use tracing::{debug, info, warn};

use crate::{
    models::{ActivityEvent, ApiMode, FetchInput, FetchMetadata, FetchOutcome, SearchRequest},
    sink::{ResultSink, EVENTS_KEY, WORK_ITEMS_KEY},
    sources::{EventsSource, WorkItemSource},
    validate::{validate_request, MAX_IDENTITIES},
    Error, Result,
};

/// Where a request currently is. `Failed` is only reachable from
/// `Validating`: validation failures never start network work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Validating,
    Fetching,
    Aggregating,
    Committing,
    Failed,
}

/// One progress notification. Percentage is derived from the unit counts:
/// one unit per identity's events fetch plus one for the combined search.
#[derive(Debug, Clone)]
pub struct FetchProgress {
    pub completed: usize,
    pub total: usize,
    pub message: String,
}

impl FetchProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

pub type ProgressFn = dyn Fn(&FetchProgress) + Send + Sync;
pub type ErrorFn = dyn Fn(&str) + Send + Sync;

/// Cooperative cancellation flag, checked between units of work.
///
/// Dropping the `run` future also abandons a request; this handle exists
/// so an outer caller can supersede a request it no longer owns the
/// future of. A cancelled request stops fetching and skips the commit.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives one request end to end:
/// validate, search once for all identities, fetch each identity's events
/// in order, sort, commit. Owns the in-flight aggregation buffers; the
/// caller must serialize requests - at most one in flight per orchestrator.
///
/// Fetches are deliberately sequential: everything shares one rate-limited
/// API key, and bursts would trip throttling.
pub struct FetchOrchestrator {
    events: Box<dyn EventsSource>,
    search: Box<dyn WorkItemSource>,
    sink: Box<dyn ResultSink>,
    on_progress: Option<Box<ProgressFn>>,
    on_error: Option<Box<ErrorFn>>,
    cancel: CancelHandle,
    max_identities: usize,
    phase: FetchPhase,
}

impl FetchOrchestrator {
    pub fn new(
        events: Box<dyn EventsSource>,
        search: Box<dyn WorkItemSource>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        Self {
            events,
            search,
            sink,
            on_progress: None,
            on_error: None,
            cancel: CancelHandle::default(),
            max_identities: MAX_IDENTITIES,
            phase: FetchPhase::Idle,
        }
    }

    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&FetchProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn with_error_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn with_max_identities(mut self, max_identities: usize) -> Self {
        self.max_identities = max_identities;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    /// Run one request to completion.
    ///
    /// Partial failure is not fatal: a failed identity is recorded and
    /// reported, and the rest of the request proceeds. A search failure
    /// with nothing accumulated aborts the request before anything is
    /// committed.
    pub async fn run(&mut self, input: &FetchInput) -> Result<FetchOutcome> {
        self.phase = FetchPhase::Validating;

        let request = match validate_request(
            &input.identities,
            &input.start,
            &input.end,
            input.token.clone(),
            self.max_identities,
        ) {
            Ok(request) => request,
            Err(errors) => {
                self.phase = FetchPhase::Failed;
                for error in &errors {
                    self.report_error(error);
                }
                return Err(Error::Validation(errors));
            }
        };

        self.phase = FetchPhase::Fetching;
        info!(
            "Fetching activity for {} users, {}..{}",
            request.identities.len(),
            request.start,
            request.end
        );

        // Stale keys are cleared only when nothing is stored yet; existing
        // data survives until a fresh non-empty result replaces it
        for key in [EVENTS_KEY, WORK_ITEMS_KEY] {
            if !self.sink.contains(key).await? {
                self.sink.clear(key).await?;
            }
        }

        let window = DateWindow::new(request.start, request.end);
        let total = request.identities.len() + 1;
        let mut completed = 0;

        // The combined search first: two queries total, however many users
        let mut work_items = match self.search.work_items_for(&request.identities, &window).await
        {
            Ok(items) => items,
            Err(e) => {
                let message = format!("Failed to fetch issues and pull requests: {e}");
                warn!("{message}");
                self.report_error(&message);
                self.phase = FetchPhase::Idle;
                return Err(e);
            }
        };
        completed += 1;
        self.report_progress(completed, total, "Fetched issues and pull requests".into());

        // Events per identity, in order. Outcomes are collected and errors
        // surfaced after the loop so reporting order is deterministic.
        let mut outcomes: Vec<(String, Result<Vec<ActivityEvent>>)> = Vec::new();
        for login in &request.identities {
            if self.cancel.is_cancelled() {
                info!("Request cancelled; skipping remaining users");
                break;
            }

            let result = self.events.events_for(login, &window).await;
            completed += 1;
            self.report_progress(completed, total, format!("Fetched events for {login}"));
            outcomes.push((login.clone(), result));
        }

        let mut events = Vec::new();
        let mut failed_identities = Vec::new();
        for (login, outcome) in outcomes {
            match outcome {
                Ok(mut batch) => events.append(&mut batch),
                Err(e) => {
                    let message = format!("Failed to fetch events for {login}: {e}");
                    warn!("{message}");
                    self.report_error(&message);
                    failed_identities.push((login, e.to_string()));
                }
            }
        }

        if self.cancel.is_cancelled() {
            debug!("Cancelled request returns uncommitted partial data");
            self.phase = FetchPhase::Idle;
            return Ok(self.build_outcome(&request, events, work_items, failed_identities));
        }

        self.phase = FetchPhase::Aggregating;
        // Stable sorts: equal timestamps keep arrival order, so results do
        // not depend on fetch timing
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        work_items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        self.phase = FetchPhase::Committing;
        let outcome = self.build_outcome(&request, events, work_items, failed_identities);

        // Empty collections are not persisted: a total sub-fetch failure
        // must not wipe out previously stored good data
        if !outcome.events.is_empty() {
            let metadata = self.metadata_for(&request, ApiMode::EventsFeed);
            self.sink
                .store_events(EVENTS_KEY, &outcome.events, &metadata)
                .await?;
        }
        if !outcome.work_items.is_empty() {
            let metadata = self.metadata_for(&request, ApiMode::Search);
            self.sink
                .store_work_items(WORK_ITEMS_KEY, &outcome.work_items, &metadata)
                .await?;
        }

        info!(
            "Committed {} events and {} work items ({} users failed)",
            outcome.events.len(),
            outcome.work_items.len(),
            outcome.failed_identities.len()
        );

        self.phase = FetchPhase::Idle;
        Ok(outcome)
    }

    fn build_outcome(
        &self,
        request: &SearchRequest,
        events: Vec<ActivityEvent>,
        work_items: Vec<crate::models::WorkItem>,
        failed_identities: Vec<(String, String)>,
    ) -> FetchOutcome {
        FetchOutcome {
            events,
            work_items,
            fetched_at: Utc::now(),
            identities: request.identities.clone(),
            start: request.start,
            end: request.end,
            failed_identities,
        }
    }

    fn metadata_for(&self, request: &SearchRequest, api_mode: ApiMode) -> FetchMetadata {
        FetchMetadata {
            last_fetch: Utc::now(),
            identities: request.identities.clone(),
            api_mode,
            start: request.start,
            end: request.end,
        }
    }

    fn report_progress(&self, completed: usize, total: usize, message: String) {
        let progress = FetchProgress {
            completed,
            total,
            message,
        };
        debug!(
            "Progress {}/{} ({}%): {}",
            progress.completed,
            progress.total,
            progress.percent(),
            progress.message
        );
        if let Some(ref f) = self.on_progress {
            f(&progress);
        }
    }

    fn report_error(&self, message: &str) {
        if let Some(ref f) = self.on_error {
            f(message);
        }
    }
}
