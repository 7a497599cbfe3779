//! In-memory `RemoteGateway` for tests: scripted data, injected failures, call log.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use codestreak_common::{
    Achievement, FriendEdge, FriendProfile, FriendRequestId, FriendStats, FriendStreak,
    RelationshipRequest, RequestDirection, Solve, StreakRequest, StreakRequestId, User, UserId, Username,
};

use crate::error::GatewayError;
use crate::gateway::{RemoteGateway, Result};

pub(crate) fn user(id: u64, name: &str) -> User {
    User { id: UserId(id), username: Username(name.to_string()), current_streak: 0, total_xp: 0 }
}

pub(crate) fn friend_request(id: u64, direction: RequestDirection, requester: &User, addressee: &User) -> RelationshipRequest {
    RelationshipRequest {
        id: FriendRequestId(id),
        direction,
        requester: requester.clone(),
        addressee: addressee.clone(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    }
}

pub(crate) fn streak_request(id: u64, requester: &User, requested: &User) -> StreakRequest {
    StreakRequest {
        id: StreakRequestId(id),
        requester: requester.clone(),
        requested: requested.clone(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap(),
    }
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub me: User,
    pub friends: Vec<FriendEdge>,
    pub received: Vec<RelationshipRequest>,
    pub sent: Vec<RelationshipRequest>,
    pub streaks: Vec<FriendStreak>,
    pub received_streaks: Vec<StreakRequest>,
    pub sent_streaks: Vec<StreakRequest>,
    pub directory: Vec<User>,
    pub profiles: HashMap<String, FriendProfile>,
    pub stats: HashMap<String, FriendStats>,
    pub solves: HashMap<String, Vec<Solve>>,
    pub achievements: HashMap<String, Vec<Achievement>>,
    pub failures: HashMap<&'static str, GatewayError>,
    pub calls: Vec<String>,
    pub latency: Option<Duration>,
    pub next_id: u64,
}

#[derive(Default)]
pub(crate) struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new(me: User) -> Self {
        Self { state: Mutex::new(FakeState { me, next_id: 100, ..Default::default() }) }
    }

    pub fn with(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock());
    }

    pub fn fail(&self, op: &'static str, err: GatewayError) {
        self.state.lock().failures.insert(op, err);
    }

    pub fn heal(&self, op: &'static str) {
        self.state.lock().failures.remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn calls_to(&self, op: &str) -> Vec<String> {
        self.calls().into_iter().filter(|call| call.split(' ').next() == Some(op)).collect()
    }

    async fn enter(&self, op: &'static str, detail: impl std::fmt::Display) -> Result<()> {
        let latency = {
            let mut state = self.state.lock();
            state.calls.push(format!("{op} {detail}").trim_end().to_string());
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.state.lock().failures.get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn lookup(&self, username: &Username) -> Result<User> {
        let state = self.state.lock();
        state.directory.iter()
            .find(|u| u.username.matches(username.as_str()))
            .cloned()
            .ok_or_else(|| GatewayError::server(404, format!("no user named {username}")))
    }
}

fn not_found(what: &str) -> GatewayError {
    GatewayError::server(404, format!("{what} not found"))
}

#[async_trait]
impl RemoteGateway for FakeGateway {
    async fn get_friends(&self) -> Result<Vec<FriendEdge>> {
        self.enter("get_friends", "").await?;
        Ok(self.state.lock().friends.clone())
    }
    async fn get_received_friend_requests(&self) -> Result<Vec<RelationshipRequest>> {
        self.enter("get_received_friend_requests", "").await?;
        Ok(self.state.lock().received.clone())
    }
    async fn get_sent_friend_requests(&self) -> Result<Vec<RelationshipRequest>> {
        self.enter("get_sent_friend_requests", "").await?;
        Ok(self.state.lock().sent.clone())
    }
    async fn send_friend_request(&self, username: &Username) -> Result<()> {
        self.enter("send_friend_request", username).await?;
        let addressee = self.lookup(username)?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let request = friend_request(state.next_id, RequestDirection::Sent, &state.me.clone(), &addressee);
        state.sent.push(request);
        Ok(())
    }
    async fn accept_friend_request(&self, id: FriendRequestId) -> Result<()> {
        self.enter("accept_friend_request", id).await?;
        let mut state = self.state.lock();
        let index = state.received.iter().position(|r| r.id == id).ok_or_else(|| not_found("request"))?;
        let request = state.received.remove(index);
        state.friends.push(FriendEdge { peer: request.requester });
        Ok(())
    }
    async fn reject_friend_request(&self, id: FriendRequestId) -> Result<()> {
        self.enter("reject_friend_request", id).await?;
        self.state.lock().received.retain(|r| r.id != id);
        Ok(())
    }
    async fn cancel_friend_request(&self, id: FriendRequestId) -> Result<()> {
        self.enter("cancel_friend_request", id).await?;
        self.state.lock().sent.retain(|r| r.id != id);
        Ok(())
    }
    async fn remove_friend(&self, username: &Username) -> Result<()> {
        self.enter("remove_friend", username).await?;
        self.state.lock().friends.retain(|f| !f.peer.username.matches(username.as_str()));
        Ok(())
    }

    async fn get_friend_streaks(&self) -> Result<Vec<FriendStreak>> {
        self.enter("get_friend_streaks", "").await?;
        Ok(self.state.lock().streaks.clone())
    }
    async fn get_received_streak_requests(&self) -> Result<Vec<StreakRequest>> {
        self.enter("get_received_streak_requests", "").await?;
        Ok(self.state.lock().received_streaks.clone())
    }
    async fn get_sent_streak_requests(&self) -> Result<Vec<StreakRequest>> {
        self.enter("get_sent_streak_requests", "").await?;
        Ok(self.state.lock().sent_streaks.clone())
    }
    async fn send_streak_request(&self, username: &Username) -> Result<()> {
        self.enter("send_streak_request", username).await?;
        let requested = self.lookup(username)?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let request = streak_request(state.next_id, &state.me.clone(), &requested);
        state.sent_streaks.push(request);
        Ok(())
    }
    async fn accept_streak_request(&self, id: StreakRequestId) -> Result<()> {
        self.enter("accept_streak_request", id).await?;
        let mut state = self.state.lock();
        let index = state.received_streaks.iter().position(|r| r.id == id).ok_or_else(|| not_found("streak request"))?;
        let request = state.received_streaks.remove(index);
        state.streaks.push(FriendStreak { peer: request.requester, current_streak: 0, longest_streak: 0 });
        Ok(())
    }
    async fn reject_streak_request(&self, id: StreakRequestId) -> Result<()> {
        self.enter("reject_streak_request", id).await?;
        self.state.lock().received_streaks.retain(|r| r.id != id);
        Ok(())
    }
    async fn cancel_streak_request(&self, id: StreakRequestId) -> Result<()> {
        self.enter("cancel_streak_request", id).await?;
        self.state.lock().sent_streaks.retain(|r| r.id != id);
        Ok(())
    }
    async fn delete_friend_streak(&self, username: &Username) -> Result<()> {
        self.enter("delete_friend_streak", username).await?;
        self.state.lock().streaks.retain(|s| !s.peer.username.matches(username.as_str()));
        Ok(())
    }

    async fn search_users(&self, query: &str, limit: u32) -> Result<Vec<User>> {
        self.enter("search_users", query).await?;
        let needle = query.to_lowercase();
        Ok(self.state.lock().directory.iter()
            .filter(|u| u.username.as_str().to_lowercase().contains(&needle))
            .take(limit as usize)
            .cloned()
            .collect())
    }
    async fn get_friend_profile(&self, username: &Username) -> Result<FriendProfile> {
        self.enter("get_friend_profile", username).await?;
        self.state.lock().profiles.get(username.as_str()).cloned().ok_or_else(|| not_found("profile"))
    }
    async fn get_friend_stats(&self, username: &Username) -> Result<FriendStats> {
        self.enter("get_friend_stats", username).await?;
        self.state.lock().stats.get(username.as_str()).cloned().ok_or_else(|| not_found("stats"))
    }
    async fn get_friend_solves(&self, username: &Username, limit: u32) -> Result<Vec<Solve>> {
        self.enter("get_friend_solves", username).await?;
        let state = self.state.lock();
        let solves = state.solves.get(username.as_str()).cloned().unwrap_or_default();
        Ok(solves.into_iter().take(limit as usize).collect())
    }
    async fn get_friend_achievements(&self, username: &Username) -> Result<Vec<Achievement>> {
        self.enter("get_friend_achievements", username).await?;
        Ok(self.state.lock().achievements.get(username.as_str()).cloned().unwrap_or_default())
    }
}
