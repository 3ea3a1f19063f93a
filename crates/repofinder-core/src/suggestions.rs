// Autocomplete from recent searches
use std::sync::Arc;
use std::time::Duration;

use repofinder_cache::SearchEntry;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::recent::RecentQueryStore;
use crate::Result;

/// Quiet period after the last keystroke before suggestions are refiltered
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Shortest query (after normalizing) we're willing to search for
pub const MIN_QUERY_LEN: usize = 2;

/// Trim and squash runs of whitespace into single spaces
pub fn normalize_query(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What the suggestion list should show right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionState {
    /// Query text the entries were filtered with (lags the raw input by
    /// the debounce)
    pub query: String,
    /// False after a confirm with a too-short query, until the next keystroke
    pub is_valid: bool,
    /// The history itself is empty. Filtering down to nothing does not set it.
    pub is_list_empty: bool,
    pub entries: Vec<SearchEntry>,
}

impl Default for SuggestionState {
    fn default() -> Self {
        Self {
            query: String::new(),
            is_valid: true,
            is_list_empty: false,
            entries: Vec::new(),
        }
    }
}

impl SuggestionState {
    fn derive(entries: &[SearchEntry], query: &str, is_valid: bool) -> Self {
        let filtered = if query.trim().is_empty() {
            entries.to_vec()
        } else {
            entries.iter().filter(|e| e.matches(query)).cloned().collect()
        };

        Self {
            query: query.to_string(),
            is_valid,
            is_list_empty: entries.is_empty(),
            entries: filtered,
        }
    }
}

/// Turns keystrokes plus search history into a suggestion list.
///
/// A background task recomputes the state whenever the history changes,
/// the validity flag flips, or the text has been quiet for [`DEBOUNCE`].
/// Must be created inside a tokio runtime; the task stops when the engine
/// is dropped.
pub struct SuggestionEngine {
    store: Arc<dyn RecentQueryStore>,
    query: watch::Sender<String>,
    valid: watch::Sender<bool>,
    state: watch::Receiver<SuggestionState>,
    worker: JoinHandle<()>,
}

impl SuggestionEngine {
    pub fn new(store: Arc<dyn RecentQueryStore>) -> Self {
        let (query, query_rx) = watch::channel(String::new());
        let (valid, valid_rx) = watch::channel(true);
        let entries = store.observe_all();
        let initial = SuggestionState::derive(&entries.borrow(), "", true);
        let (state_tx, state) = watch::channel(initial);

        let worker = tokio::spawn(run_suggestions(
            entries,
            query_rx,
            valid_rx,
            state_tx,
        ));

        Self {
            store,
            query,
            valid,
            state,
            worker,
        }
    }

    /// Raw input as typed, no debounce
    pub fn query_text(&self) -> String {
        self.query.borrow().clone()
    }

    pub fn state(&self) -> SuggestionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.state.clone()
    }

    /// Typing always clears a stale validation error
    pub fn on_query_text_changed(&self, text: impl Into<String>) {
        self.valid.send_if_modified(|valid| !std::mem::replace(valid, true));
        self.query.send_replace(text.into());
    }

    /// Validate the current input and remember it.
    ///
    /// Returns the normalized query to search for, or `None` if it was too
    /// short (in which case nothing is stored and the state turns invalid).
    pub async fn confirm_search(&self) -> Result<Option<String>> {
        let normalized = normalize_query(&self.query.borrow());
        let is_valid = normalized.chars().count() >= MIN_QUERY_LEN;
        self.valid
            .send_if_modified(|valid| std::mem::replace(valid, is_valid) != is_valid);

        if !is_valid {
            debug!("Rejected query '{}': shorter than {} chars", normalized, MIN_QUERY_LEN);
            return Ok(None);
        }

        self.store
            .insert_or_replace(SearchEntry::new(normalized.clone()))
            .await?;
        info!("Searching for '{}'", normalized);
        Ok(Some(normalized))
    }

    pub async fn clear_all_recent_entries(&self) -> Result<()> {
        self.store.delete_all().await?;
        info!("Cleared search history");
        Ok(())
    }
}

impl Drop for SuggestionEngine {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_suggestions(
    mut entries: watch::Receiver<Vec<SearchEntry>>,
    mut query: watch::Receiver<String>,
    mut valid: watch::Receiver<bool>,
    out: watch::Sender<SuggestionState>,
) {
    let mut filter_text = query.borrow_and_update().clone();
    let debounce = sleep(DEBOUNCE);
    tokio::pin!(debounce);
    let mut debounce_armed = false;

    loop {
        let state = SuggestionState::derive(
            &entries.borrow_and_update(),
            &filter_text,
            *valid.borrow_and_update(),
        );
        out.send_replace(state);

        // Wait for something that actually changes the output
        loop {
            tokio::select! {
                changed = entries.changed() => {
                    if changed.is_err() { return; }
                    break;
                }
                changed = valid.changed() => {
                    if changed.is_err() { return; }
                    break;
                }
                changed = query.changed() => {
                    if changed.is_err() { return; }
                    debounce.as_mut().reset(Instant::now() + DEBOUNCE);
                    debounce_armed = true;
                }
                () = &mut debounce, if debounce_armed => {
                    debounce_armed = false;
                    filter_text = query.borrow_and_update().clone();
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recent::MemoryRecentStore;

    fn names(state: &SuggestionState) -> Vec<&str> {
        state.entries.iter().map(|e| e.name.as_str()).collect()
    }

    async fn seeded(names: &[&str]) -> Arc<MemoryRecentStore> {
        let store = Arc::new(MemoryRecentStore::new());
        for name in names {
            store.insert_or_replace(SearchEntry::new(*name)).await.unwrap();
        }
        store
    }

    async fn settle(engine: &SuggestionEngine) -> SuggestionState {
        sleep(DEBOUNCE + Duration::from_millis(50)).await;
        engine.state()
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  a "), "a");
        assert_eq!(normalize_query("go   lang"), "go lang");
        assert_eq!(normalize_query("\tgo \n lang  "), "go lang");
        assert_eq!(normalize_query("   "), "");
    }

    #[test]
    fn test_derive_filters_case_insensitively() {
        let entries: Vec<_> = ["alpha", "beta", "gamma"].into_iter().map(SearchEntry::new).collect();

        // Every name contains an "a"
        let state = SuggestionState::derive(&entries, "A", true);
        assert_eq!(names(&state), vec!["alpha", "beta", "gamma"]);
        assert!(!state.is_list_empty);

        let narrowed = SuggestionState::derive(&entries, "M", true);
        assert_eq!(names(&narrowed), vec!["gamma"]);

        let all = SuggestionState::derive(&entries, "   ", true);
        assert_eq!(names(&all), vec!["alpha", "beta", "gamma"]);

        let none = SuggestionState::derive(&entries, "zzz", true);
        assert!(none.entries.is_empty());
        assert!(!none.is_list_empty);

        let empty = SuggestionState::derive(&[], "zzz", true);
        assert!(empty.is_list_empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_waits_for_debounce() {
        let store = seeded(&["alpha", "beta", "gamma"]).await;
        let engine = SuggestionEngine::new(store);

        let initial = settle(&engine).await;
        assert_eq!(names(&initial), vec!["alpha", "beta", "gamma"]);

        engine.on_query_text_changed("a");
        assert_eq!(engine.query_text(), "a");

        sleep(Duration::from_millis(300)).await;
        assert_eq!(names(&engine.state()), vec!["alpha", "beta", "gamma"]);

        // Another keystroke restarts the quiet period
        engine.on_query_text_changed("al");
        sleep(Duration::from_millis(300)).await;
        assert_eq!(engine.state().query, "");

        let state = settle(&engine).await;
        assert_eq!(state.query, "al");
        assert_eq!(names(&state), vec!["alpha"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_alpha_beta_gamma() {
        let store = seeded(&["gamma", "beta", "alpha"]).await;
        let engine = SuggestionEngine::new(store);

        engine.on_query_text_changed("a");
        let state = settle(&engine).await;
        assert_eq!(names(&state), vec!["alpha", "beta", "gamma"]);

        engine.on_query_text_changed("ET");
        let state = settle(&engine).await;
        assert_eq!(names(&state), vec!["beta"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_shows_without_waiting_for_debounce() {
        let store = seeded(&["alpha"]).await;
        let engine = SuggestionEngine::new(store);
        let mut rx = engine.subscribe();

        engine.on_query_text_changed("a");
        let typed_at = Instant::now();
        assert_eq!(engine.confirm_search().await.unwrap(), None);

        let state = rx.wait_for(|s| !s.is_valid).await.unwrap().clone();
        assert!(typed_at.elapsed() < DEBOUNCE);
        // The text itself is still waiting on the debounce
        assert_eq!(state.query, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_rejects_short_query() {
        let store = seeded(&[]).await;
        let engine = SuggestionEngine::new(store.clone());

        engine.on_query_text_changed("  a ");
        assert_eq!(engine.confirm_search().await.unwrap(), None);

        let state = settle(&engine).await;
        assert!(!state.is_valid);
        assert!(state.is_list_empty);
        assert!(store.observe_all().borrow().is_empty());

        // Typing again clears the error
        engine.on_query_text_changed("go lang");
        let state = settle(&engine).await;
        assert!(state.is_valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_persists_normalized_query() {
        let store = seeded(&[]).await;
        let engine = SuggestionEngine::new(store.clone());

        engine.on_query_text_changed("  a ");
        assert_eq!(engine.confirm_search().await.unwrap(), None);

        engine.on_query_text_changed("  go    lang ");
        let confirmed = engine.confirm_search().await.unwrap();
        assert_eq!(confirmed.as_deref(), Some("go lang"));

        let stored: Vec<String> = store.observe_all().borrow().iter().map(|e| e.name.clone()).collect();
        assert_eq!(stored, vec!["go lang"]);

        let state = settle(&engine).await;
        assert!(state.is_valid);
        assert!(!state.is_list_empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_changes_show_up_without_typing() {
        let store = seeded(&["serde"]).await;
        let engine = SuggestionEngine::new(store.clone());
        let mut rx = engine.subscribe();

        rx.wait_for(|s| s.entries.len() == 1).await.unwrap();

        store.insert_or_replace(SearchEntry::new("tokio")).await.unwrap();
        let state = rx.wait_for(|s| s.entries.len() == 2).await.unwrap().clone();
        assert_eq!(names(&state), vec!["serde", "tokio"]);

        engine.clear_all_recent_entries().await.unwrap();
        let state = rx.wait_for(|s| s.is_list_empty).await.unwrap().clone();
        assert!(state.entries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_matches_is_not_empty_history() {
        let store = seeded(&["alpha"]).await;
        let engine = SuggestionEngine::new(store);

        engine.on_query_text_changed("xyz");
        let state = settle(&engine).await;
        assert!(state.entries.is_empty());
        assert!(!state.is_list_empty);
    }
}
