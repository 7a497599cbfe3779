use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use codestreak_common::non_api_structs::FriendsUiState;

use crate::cache::{CacheKey, ResponseCache, ResponseCacheExt};
use crate::config::ClientConfig;
use crate::error::GatewayError;
use crate::gateway::RemoteGateway;
use crate::mutation::Resync;
use crate::store::Store;

/// Result of one fan-out read after fail-soft handling.
pub(crate) struct Slot<T> {
    pub value: T,
    pub error: Option<GatewayError>,
}

/// Awaits `fetch`; a success is cached, a failure degrades to the cached
/// value or `T::default()` instead of failing the group.
pub(crate) async fn fail_soft<T, F>(cache: Option<&dyn ResponseCache>, key: CacheKey, ttl: Duration, fetch: F) -> Slot<T>
where
    T: Serialize + DeserializeOwned + Default,
    F: Future<Output = Result<T, GatewayError>>,
{
    match fetch.await {
        Ok(value) => {
            if let Some(cache) = cache {
                cache.put(&key, &value, Some(ttl));
            }
            Slot { value, error: None }
        }
        Err(err) => {
            let cached = cache.and_then(|cache| cache.get::<T>(&key));
            warn!(%key, %err, cached = cached.is_some(), "read failed, degrading slot");
            Slot { value: cached.unwrap_or_default(), error: Some(err) }
        }
    }
}

const FRIENDS_SLOTS: usize = 6;

/// Loads every friends-screen collection concurrently and publishes one snapshot.
///
/// Overlapping loads are not serialized: each publishes when it settles, so
/// the last one to finish wins, and the first to finish clears `is_loading`.
pub struct SyncOrchestrator {
    gateway: Arc<dyn RemoteGateway>,
    store: Store<FriendsUiState>,
    cache: Option<Arc<dyn ResponseCache>>,
    owner: String,
    cache_ttl: Duration,
}

impl SyncOrchestrator {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        store: Store<FriendsUiState>,
        cache: Option<Arc<dyn ResponseCache>>,
        config: &ClientConfig,
    ) -> Self {
        Self { gateway, store, cache, owner: config.owner(), cache_ttl: config.cache_ttl }
    }

    pub fn store(&self) -> &Store<FriendsUiState> {
        &self.store
    }

    pub async fn load_all(&self) {
        let mut loading = FriendsUiState::clone(&self.store.current());
        loading.is_loading = true;
        self.store.replace(loading);

        let gateway = self.gateway.as_ref();
        let cache = self.cache.as_deref();
        let owner = self.owner.as_str();
        let ttl = self.cache_ttl;
        let (friends, received, sent, streaks, received_streaks, sent_streaks) = futures::join!(
            fail_soft(cache, CacheKey::friends(owner), ttl, gateway.get_friends()),
            fail_soft(cache, CacheKey::received_requests(owner), ttl, gateway.get_received_friend_requests()),
            fail_soft(cache, CacheKey::sent_requests(owner), ttl, gateway.get_sent_friend_requests()),
            fail_soft(cache, CacheKey::friend_streaks(owner), ttl, gateway.get_friend_streaks()),
            fail_soft(cache, CacheKey::received_streak_requests(owner), ttl, gateway.get_received_streak_requests()),
            fail_soft(cache, CacheKey::sent_streak_requests(owner), ttl, gateway.get_sent_streak_requests()),
        );

        let errors: Vec<GatewayError> = [
            friends.error,
            received.error,
            sent.error,
            streaks.error,
            received_streaks.error,
            sent_streaks.error,
        ].into_iter().flatten().collect();
        info!(failed = errors.len(), of = FRIENDS_SLOTS, "friends load settled");

        let mut next = FriendsUiState::clone(&self.store.current());
        next.is_loading = false;
        next.error = match errors.first() {
            Some(err) if errors.len() == FRIENDS_SLOTS => Some(err.user_message()),
            _ => None,
        };
        next.friends = friends.value;
        next.received_requests = received.value;
        next.sent_requests = sent.value;
        next.friend_streaks = streaks.value;
        next.received_streak_requests = received_streaks.value;
        next.sent_streak_requests = sent_streaks.value;
        self.store.replace(next);
    }

    pub async fn refresh(&self) {
        self.load_all().await
    }
}

#[async_trait]
impl Resync for SyncOrchestrator {
    async fn refresh(&self) {
        self.load_all().await
    }
}
