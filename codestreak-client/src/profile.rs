use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use codestreak_common::non_api_structs::ProfileUiState;
use codestreak_common::{Achievement, FriendProfile, FriendStats, Solve, Username};

use crate::cache::{CacheKey, ResponseCache, ResponseCacheExt};
use crate::config::ClientConfig;
use crate::gateway::RemoteGateway;
use crate::store::Store;
use crate::sync::fail_soft;

const PROFILE_SLOTS: usize = 4;

pub struct ProfileLoader {
    gateway: Arc<dyn RemoteGateway>,
    store: Store<ProfileUiState>,
    cache: Option<Arc<dyn ResponseCache>>,
    cache_ttl: Duration,
    solves_limit: u32,
}

impl ProfileLoader {
    pub fn new(gateway: Arc<dyn RemoteGateway>, cache: Option<Arc<dyn ResponseCache>>, config: &ClientConfig) -> Self {
        Self {
            gateway,
            store: Store::default(),
            cache,
            cache_ttl: config.cache_ttl,
            solves_limit: config.solves_limit,
        }
    }

    pub fn store(&self) -> &Store<ProfileUiState> {
        &self.store
    }

    /// Paints whatever is cached for `username`, then replaces it with fresh data.
    pub async fn load(&self, username: &Username) {
        let name = username.as_str();
        let cache = self.cache.as_deref();
        self.store.replace(ProfileUiState {
            username: Some(username.clone()),
            is_loading: true,
            error: None,
            profile: cache.and_then(|c| c.get::<Option<FriendProfile>>(&CacheKey::profile(name))).flatten(),
            stats: cache.and_then(|c| c.get::<Option<FriendStats>>(&CacheKey::stats(name))).flatten(),
            solves: cache.and_then(|c| c.get::<Vec<Solve>>(&CacheKey::solves(name))).unwrap_or_default(),
            achievements: cache.and_then(|c| c.get::<Vec<Achievement>>(&CacheKey::achievements(name))).unwrap_or_default(),
        });

        let gateway = self.gateway.as_ref();
        let ttl = self.cache_ttl;
        let (profile, stats, solves, achievements) = futures::join!(
            fail_soft(cache, CacheKey::profile(name), ttl, async { gateway.get_friend_profile(username).await.map(Some) }),
            fail_soft(cache, CacheKey::stats(name), ttl, async { gateway.get_friend_stats(username).await.map(Some) }),
            fail_soft(cache, CacheKey::solves(name), ttl, gateway.get_friend_solves(username, self.solves_limit)),
            fail_soft(cache, CacheKey::achievements(name), ttl, gateway.get_friend_achievements(username)),
        );

        let failed = [&profile.error, &stats.error, &solves.error, &achievements.error]
            .into_iter()
            .filter(|err| err.is_some())
            .count();
        info!(%username, failed, of = PROFILE_SLOTS, "profile load settled");
        let error = if failed == PROFILE_SLOTS {
            profile.error.as_ref().map(|err| err.user_message())
        } else {
            None
        };
        self.store.replace(ProfileUiState {
            username: Some(username.clone()),
            is_loading: false,
            error,
            profile: profile.value,
            stats: stats.value,
            solves: solves.value,
            achievements: achievements.value,
        });
    }
}
