// Paged search sessions: one query, many pages, one growing list
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::Repository;
use crate::search::{SearchOutcome, SearchProvider};

/// Results requested per page
pub const PAGE_SIZE: u32 = 20;

/// How close (in rows) to the end of the loaded list the user has to scroll
/// before the next page is requested
pub const SCROLL_BUFFER: usize = 5;

/// Where the current session's request stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    /// No session has been started yet
    Idle,
    Loading,
    Succeeded {
        total_count: u64,
        incomplete_results: bool,
    },
    ErrorResponse {
        message: String,
        code: i32,
    },
    TransportError(String),
}

impl RequestStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestStatus::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            RequestStatus::ErrorResponse { .. } | RequestStatus::TransportError(_)
        )
    }
}

/// Snapshot of the active search session, as published to the UI
#[derive(Debug, Clone)]
pub struct SessionState {
    query: String,
    page: u32,
    items: Vec<Repository>,
    total_count: u64,
    status: RequestStatus,
    generation: u64,
    in_flight: bool,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            query: String::new(),
            page: 1,
            items: Vec::new(),
            total_count: 0,
            status: RequestStatus::Idle,
            generation: 0,
            in_flight: false,
        }
    }

    fn fresh(query: String, generation: u64) -> Self {
        Self {
            query,
            status: RequestStatus::Loading,
            generation,
            ..Self::idle()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// 1-based number of the next page to fetch
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Everything fetched so far, in server order
    pub fn items(&self) -> &[Repository] {
        &self.items
    }

    /// Total hits the server advertised. Can run ahead of `items().len()`.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight
    }

    pub fn has_session(&self) -> bool {
        self.generation > 0
    }

    /// Server says there's more than what we've loaded
    pub fn has_more(&self) -> bool {
        (self.items.len() as u64) < self.total_count
    }

    /// Row `index`, or `None` if that page hasn't arrived yet
    pub fn item_at(&self, index: usize) -> Option<&Repository> {
        self.items.get(index)
    }

    pub fn find(&self, id: u64) -> Option<&Repository> {
        self.items.iter().find(|repo| repo.id == id)
    }

    fn apply(&mut self, page: u32, outcome: SearchOutcome) {
        self.in_flight = false;

        match outcome {
            SearchOutcome::Success(result) => {
                let received = result.items.len();
                if received > PAGE_SIZE as usize {
                    warn!(
                        "Page {} of '{}' had {} items, keeping the first {}",
                        page, self.query, received, PAGE_SIZE
                    );
                }

                self.items
                    .extend(result.items.into_iter().take(PAGE_SIZE as usize));
                self.total_count = result.total_count;
                self.page += 1;
                self.status = RequestStatus::Succeeded {
                    total_count: result.total_count,
                    incomplete_results: result.incomplete_results,
                };
                debug!(
                    "Page {} of '{}' done: {}/{} loaded",
                    page,
                    self.query,
                    self.items.len(),
                    self.total_count
                );
            }
            // Failures leave the cursor and the list alone so a retry asks
            // for the same page again
            SearchOutcome::ErrorResponse { message, code } => {
                self.status = RequestStatus::ErrorResponse { message, code };
            }
            SearchOutcome::TransportError(message) => {
                self.status = RequestStatus::TransportError(message);
            }
        }
    }
}

/// Drives a paged search against a [`SearchProvider`].
///
/// State is published through a watch channel; every change happens inside
/// one `send_if_modified` closure, so operations never interleave halfway.
/// Page fetches run as spawned tasks, which means every operation that
/// fetches must be called from inside a tokio runtime.
pub struct PaginationEngine {
    provider: Arc<dyn SearchProvider>,
    state: Arc<watch::Sender<SessionState>>,
    selected: watch::Sender<Option<Repository>>,
}

impl PaginationEngine {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::idle());
        let (selected, _) = watch::channel(None);

        Self {
            provider,
            state: Arc::new(state),
            selected,
        }
    }

    /// Throw away whatever session we had and start fetching `query` from
    /// page 1. A fetch still running for the old session is ignored when
    /// it lands.
    pub fn start_or_reset_session(&self, query: impl Into<String>) -> Option<JoinHandle<()>> {
        let query = query.into();
        self.state.send_modify(|state| {
            let generation = state.generation + 1;
            *state = SessionState::fresh(query.clone(), generation);
        });
        self.selected.send_replace(None);

        info!("Starting search session for '{}'", query);
        self.load_next_page()
    }

    /// Fetch the page under the cursor.
    ///
    /// Does nothing (and returns `None`) while a fetch is already running or
    /// before any session exists. The returned handle resolves once the
    /// result has been folded into the session.
    pub fn load_next_page(&self) -> Option<JoinHandle<()>> {
        let mut request = None;

        self.state.send_if_modified(|state| {
            if !state.has_session() || state.in_flight {
                return false;
            }
            state.in_flight = true;
            state.status = RequestStatus::Loading;
            request = Some((state.query.clone(), state.page, state.generation));
            true
        });

        let Some((query, page, generation)) = request else {
            debug!("load_next_page ignored: no session or fetch already running");
            return None;
        };

        debug!("Requesting page {} of '{}'", page, query);
        let provider = Arc::clone(&self.provider);
        // Built out here so that aborting the task before its first poll
        // still releases the session
        let mut fetch = PendingFetch {
            state: Arc::clone(&self.state),
            page,
            generation,
            finished: false,
        };

        Some(tokio::spawn(async move {
            let outcome = provider.search(&query, page, PAGE_SIZE).await;
            fetch.finish(outcome);
        }))
    }

    /// Flip the status back to `Loading` without fetching, so the error view
    /// goes away before a manual retry lands
    pub fn reset_to_loading(&self) {
        self.state.send_if_modified(|state| {
            if !state.has_session() || state.status.is_loading() {
                return false;
            }
            state.status = RequestStatus::Loading;
            true
        });
    }

    /// Manual retry: `reset_to_loading` followed by `load_next_page`
    pub fn retry(&self) -> Option<JoinHandle<()>> {
        self.reset_to_loading();
        self.load_next_page()
    }

    /// Look a repository up among the loaded rows and make it the selected
    /// one. An unknown id just clears the selection.
    pub fn find_by_id(&self, id: u64) -> Option<Repository> {
        let found = self.state.borrow().find(id).cloned();
        if found.is_none() {
            debug!("Repository {} is not among the loaded results", id);
        }
        self.selected.send_replace(found.clone());
        found
    }

    /// Row `index` of the result list, if it has been fetched already
    pub fn item_at(&self, index: usize) -> Option<Repository> {
        self.state.borrow().item_at(index).cloned()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn selected(&self) -> Option<Repository> {
        self.selected.borrow().clone()
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<Repository>> {
        self.selected.subscribe()
    }
}

/// A page request that owns the session's in-flight flag.
///
/// If the task is aborted or the provider panics, dropping this folds an
/// unexpected-error outcome into the session so `retry` works again.
struct PendingFetch {
    state: Arc<watch::Sender<SessionState>>,
    page: u32,
    generation: u64,
    finished: bool,
}

impl PendingFetch {
    fn finish(&mut self, outcome: SearchOutcome) {
        self.finished = true;
        let (page, generation) = (self.page, self.generation);

        self.state.send_if_modified(|current| {
            if current.generation != generation {
                debug!("Dropping page {} of an abandoned search", page);
                return false;
            }
            current.apply(page, outcome);
            true
        });
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let (page, generation) = (self.page, self.generation);

        self.state.send_if_modified(|current| {
            if current.generation != generation || !current.in_flight {
                return false;
            }
            warn!("Page {} of '{}' never came back", page, current.query);
            current.apply(page, SearchOutcome::unexpected());
            true
        });
    }
}

/// Decides when scrolling should pull in the next page.
///
/// Feed it the index of the last row on screen after every scroll. Only
/// forward movement counts, so scrolling back up never fires a request.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    previous_index: usize,
    buffer: usize,
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::with_buffer(SCROLL_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            previous_index: 0,
            buffer,
        }
    }

    pub fn on_scroll(&mut self, last_visible_index: usize, state: &SessionState) -> bool {
        let scrolling_forward = last_visible_index > self.previous_index;
        self.previous_index = last_visible_index;

        scrolling_forward
            && matches!(state.status(), RequestStatus::Succeeded { .. })
            && !state.is_fetching()
            && state.has_more()
            && last_visible_index.saturating_add(self.buffer) >= state.items().len()
    }

    /// Forget the scroll position, e.g. when a new session starts
    pub fn reset(&mut self) {
        self.previous_index = 0;
    }
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new()
    }
}
