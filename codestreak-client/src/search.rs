use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;
use codestreak_common::non_api_structs::{SearchPhase, SearchUiState};

use crate::config::ClientConfig;
use crate::gateway::RemoteGateway;
use crate::store::Store;

/// Collapses bursts of query edits into one remote search.
///
/// Every edit bumps a generation counter and aborts the previous timer/request.
/// Checking the generation and publishing happen under the same lock, so a
/// superseded task never publishes over a newer edit.
pub struct SearchDebouncer {
    gateway: Arc<dyn RemoteGateway>,
    store: Store<SearchUiState>,
    generation: Arc<Mutex<u64>>,
    task: Mutex<Option<JoinHandle<()>>>,
    quiet_period: Duration,
    min_query_len: usize,
    limit: u32,
}

/// Publishes `update` applied to the current snapshot if `generation` is still the latest edit.
fn publish_if_latest(
    latest: &Mutex<u64>,
    store: &Store<SearchUiState>,
    generation: u64,
    update: impl FnOnce(&mut SearchUiState),
) -> bool {
    let latest = latest.lock();
    if *latest != generation {
        return false;
    }
    let mut next = SearchUiState::clone(&store.current());
    update(&mut next);
    store.replace(next);
    true
}

impl SearchDebouncer {
    pub fn new(gateway: Arc<dyn RemoteGateway>, config: &ClientConfig) -> Self {
        Self {
            gateway,
            store: Store::default(),
            generation: Arc::new(Mutex::new(0)),
            task: Mutex::new(None),
            quiet_period: config.search_debounce,
            min_query_len: config.min_query_len,
            limit: config.search_limit,
        }
    }

    pub fn store(&self) -> &Store<SearchUiState> {
        &self.store
    }

    /// Must be called from within a tokio runtime.
    pub fn on_query_changed(&self, text: &str) {
        let mut latest = self.generation.lock();
        *latest += 1;
        let generation = *latest;
        if let Some(previous) = self.task.lock().take() {
            previous.abort();
        }

        let query = text.trim().to_string();
        if query.chars().count() < self.min_query_len {
            self.store.replace(SearchUiState { query, ..SearchUiState::default() });
            return;
        }

        let mut debouncing = SearchUiState::clone(&self.store.current());
        debouncing.query = query.clone();
        debouncing.phase = SearchPhase::Debouncing;
        debouncing.error = None;
        self.store.replace(debouncing);
        drop(latest);

        let gateway = self.gateway.clone();
        let store = self.store.clone();
        let latest = self.generation.clone();
        let (quiet_period, limit) = (self.quiet_period, self.limit);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            let dispatched = publish_if_latest(&latest, &store, generation, |next| next.phase = SearchPhase::InFlight);
            if !dispatched {
                return;
            }

            debug!(%query, generation, "dispatching search");
            let result = gateway.search_users(&query, limit).await;
            let published = publish_if_latest(&latest, &store, generation, |settled| {
                settled.phase = SearchPhase::Idle;
                match result {
                    Ok(users) => {
                        settled.results = users;
                        settled.error = None;
                    }
                    Err(err) => {
                        debug!(query = %settled.query, %err, "search failed");
                        settled.results.clear();
                        settled.error = Some(err.user_message());
                    }
                }
            });
            if !published {
                debug!(%query, generation, "discarding stale search response");
            }
        });
        *self.task.lock() = Some(handle);
    }

    pub fn clear(&self) {
        self.on_query_changed("");
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
