use std::sync::Arc;

use tracing::debug;
use codestreak_common::non_api_structs::{FriendsUiState, Relationship};
use codestreak_common::{FriendRequestId, StreakRequestId, Username};

use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::error::GatewayError;
use crate::gateway::RemoteGateway;
use crate::mutation::{Mutation, MutationEngine, PendingMutation, Resync};
use crate::store::Store;
use crate::sync::SyncOrchestrator;

/// Friends screen: one store, the orchestrator that fills it, and every
/// relationship/streak action as an optimistic mutation.
pub struct FriendsController {
    gateway: Arc<dyn RemoteGateway>,
    store: Store<FriendsUiState>,
    sync: Arc<SyncOrchestrator>,
    engine: MutationEngine<FriendsUiState>,
    me: Option<Username>,
}

/// Removes the first matching item. Absent targets leave the collection as is.
fn remove_first<T>(items: &mut Vec<T>, what: &str, matches: impl Fn(&T) -> bool) -> Option<T> {
    match items.iter().position(matches) {
        Some(index) => Some(items.remove(index)),
        None => {
            debug!("{}", GatewayError::NotFoundLocally(what.to_string()));
            None
        }
    }
}

impl FriendsController {
    pub fn new(gateway: Arc<dyn RemoteGateway>, cache: Option<Arc<dyn ResponseCache>>, config: &ClientConfig) -> Self {
        Self::with_store(gateway, cache, config, Store::default())
    }

    /// Shares an existing store, e.g. with the streak screen.
    pub fn with_store(
        gateway: Arc<dyn RemoteGateway>,
        cache: Option<Arc<dyn ResponseCache>>,
        config: &ClientConfig,
        store: Store<FriendsUiState>,
    ) -> Self {
        let sync = Arc::new(SyncOrchestrator::new(gateway.clone(), store.clone(), cache, config));
        let engine = MutationEngine::new(store.clone(), Some(sync.clone() as Arc<dyn Resync>));
        Self { gateway, store, sync, engine, me: config.username.clone() }
    }

    pub fn store(&self) -> &Store<FriendsUiState> {
        &self.store
    }

    pub async fn load_all(&self) {
        self.sync.load_all().await
    }

    pub async fn refresh(&self) {
        self.sync.refresh().await
    }

    fn is_me(&self, username: &Username) -> bool {
        self.me.as_ref().is_some_and(|me| me.matches(username.as_str()))
    }

    fn validate_peer(&self, username: &str) -> Result<Username, GatewayError> {
        let username = Username::from(username)
            .ok_or_else(|| GatewayError::Validation("Enter a username.".to_string()))?;
        if self.is_me(&username) {
            return Err(GatewayError::Validation("You can't add yourself.".to_string()));
        }
        Ok(username)
    }

    pub fn send_friend_request(&self, username: &str) -> PendingMutation {
        let username = match self.validate_peer(username) {
            Ok(username) => username,
            Err(err) => return self.engine.reject("send_friend_request", err),
        };
        let conflict = match self.store.current().relationship_of(&username) {
            Some(Relationship::Friend) => Some(format!("You're already friends with {username}.")),
            Some(Relationship::Sent) => Some(format!("You already sent {username} a request.")),
            Some(Relationship::Received) => Some(format!("{username} already sent you a request.")),
            None => None,
        };
        if let Some(conflict) = conflict {
            return self.engine.reject("send_friend_request", GatewayError::Validation(conflict));
        }
        let gateway = self.gateway.clone();
        let message = format!("Friend request sent to {username}");
        self.engine.dispatch(
            Mutation::new("send_friend_request", async move { gateway.send_friend_request(&username).await })
                .on_success(message)
                .refresh_after(),
        )
    }

    pub fn accept_friend_request(&self, id: FriendRequestId) -> PendingMutation {
        let message = match self.store.current().received_requests.iter().find(|r| r.id == id) {
            Some(request) => format!("You're now friends with {}", request.requester.username),
            None => "Friend request accepted".to_string(),
        };
        let gateway = self.gateway.clone();
        self.engine.dispatch(
            Mutation::new("accept_friend_request", async move { gateway.accept_friend_request(id).await })
                .apply_locally(move |state: &FriendsUiState| {
                    let mut next = state.clone();
                    remove_first(&mut next.received_requests, "friend request", |r| r.id == id);
                    next
                })
                .on_success(message)
                .refresh_after(),
        )
    }

    pub fn reject_friend_request(&self, id: FriendRequestId) -> PendingMutation {
        let gateway = self.gateway.clone();
        self.engine.dispatch(
            Mutation::new("reject_friend_request", async move { gateway.reject_friend_request(id).await })
                .apply_locally(move |state: &FriendsUiState| {
                    let mut next = state.clone();
                    remove_first(&mut next.received_requests, "friend request", |r| r.id == id);
                    next
                })
                .on_success("Friend request declined"),
        )
    }

    pub fn cancel_friend_request(&self, id: FriendRequestId) -> PendingMutation {
        let gateway = self.gateway.clone();
        self.engine.dispatch(
            Mutation::new("cancel_friend_request", async move { gateway.cancel_friend_request(id).await })
                .apply_locally(move |state: &FriendsUiState| {
                    let mut next = state.clone();
                    remove_first(&mut next.sent_requests, "friend request", |r| r.id == id);
                    next
                })
                .on_success("Friend request cancelled"),
        )
    }

    pub fn remove_friend(&self, username: &str) -> PendingMutation {
        let username = match self.validate_peer(username) {
            Ok(username) => username,
            Err(err) => return self.engine.reject("remove_friend", err),
        };
        let gateway = self.gateway.clone();
        let message = format!("Removed {username} from your friends");
        let target = username.clone();
        self.engine.dispatch(
            Mutation::new("remove_friend", async move { gateway.remove_friend(&username).await })
                .apply_locally(move |state: &FriendsUiState| {
                    let mut next = state.clone();
                    remove_first(&mut next.friends, "friend", |f| f.peer.username.matches(target.as_str()));
                    next
                })
                .on_success(message)
                .refresh_after(),
        )
    }

    pub fn send_streak_request(&self, username: &str) -> PendingMutation {
        let username = match self.validate_peer(username) {
            Ok(username) => username,
            Err(err) => return self.engine.reject("send_streak_request", err),
        };
        let state = self.store.current();
        let conflict = if state.relationship_of(&username) != Some(Relationship::Friend) {
            Some("You can only start a streak with a friend.".to_string())
        } else if state.has_streak_with(&username) {
            Some(format!("You already have a streak with {username}."))
        } else if state.has_pending_streak_with(&username) {
            Some(format!("A streak request with {username} is already pending."))
        } else {
            None
        };
        if let Some(conflict) = conflict {
            return self.engine.reject("send_streak_request", GatewayError::Validation(conflict));
        }
        let gateway = self.gateway.clone();
        let message = format!("Streak request sent to {username}");
        self.engine.dispatch(
            Mutation::new("send_streak_request", async move { gateway.send_streak_request(&username).await })
                .on_success(message)
                .refresh_after(),
        )
    }

    pub fn accept_streak_request(&self, id: StreakRequestId) -> PendingMutation {
        let message = match self.store.current().received_streak_requests.iter().find(|r| r.id == id) {
            Some(request) => format!("Streak started with {}", request.requester.username),
            None => "Streak request accepted".to_string(),
        };
        let gateway = self.gateway.clone();
        self.engine.dispatch(
            Mutation::new("accept_streak_request", async move { gateway.accept_streak_request(id).await })
                .apply_locally(move |state: &FriendsUiState| {
                    let mut next = state.clone();
                    remove_first(&mut next.received_streak_requests, "streak request", |r| r.id == id);
                    next
                })
                .on_success(message)
                .refresh_after(),
        )
    }

    pub fn reject_streak_request(&self, id: StreakRequestId) -> PendingMutation {
        let gateway = self.gateway.clone();
        self.engine.dispatch(
            Mutation::new("reject_streak_request", async move { gateway.reject_streak_request(id).await })
                .apply_locally(move |state: &FriendsUiState| {
                    let mut next = state.clone();
                    remove_first(&mut next.received_streak_requests, "streak request", |r| r.id == id);
                    next
                })
                .on_success("Streak request declined"),
        )
    }

    pub fn cancel_streak_request(&self, id: StreakRequestId) -> PendingMutation {
        let gateway = self.gateway.clone();
        self.engine.dispatch(
            Mutation::new("cancel_streak_request", async move { gateway.cancel_streak_request(id).await })
                .apply_locally(move |state: &FriendsUiState| {
                    let mut next = state.clone();
                    remove_first(&mut next.sent_streak_requests, "streak request", |r| r.id == id);
                    next
                })
                .on_success("Streak request cancelled"),
        )
    }

    pub fn delete_friend_streak(&self, username: &str) -> PendingMutation {
        let username = match self.validate_peer(username) {
            Ok(username) => username,
            Err(err) => return self.engine.reject("delete_friend_streak", err),
        };
        let gateway = self.gateway.clone();
        let message = format!("Ended your streak with {username}");
        let target = username.clone();
        self.engine.dispatch(
            Mutation::new("delete_friend_streak", async move { gateway.delete_friend_streak(&username).await })
                .apply_locally(move |state: &FriendsUiState| {
                    let mut next = state.clone();
                    remove_first(&mut next.friend_streaks, "friend streak", |s| s.peer.username.matches(target.as_str()));
                    next
                })
                .on_success(message)
                .refresh_after(),
        )
    }
}
