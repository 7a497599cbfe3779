use serde::{Deserialize, Serialize};
use crate::{
    Achievement, FriendEdge, FriendProfile, FriendStats, FriendStreak, RelationshipRequest,
    Solve, StreakRequest, User, Username,
};

/// Where a peer currently sits in the session user's friend graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Relationship {
    Friend,
    Sent,
    Received,
}

/// Published snapshot of the friends screen.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct FriendsUiState {
    pub is_loading: bool,
    pub error: Option<String>,
    pub action_in_progress: bool,
    pub action_message: Option<String>,
    pub friends: Vec<FriendEdge>,
    pub received_requests: Vec<RelationshipRequest>,
    pub sent_requests: Vec<RelationshipRequest>,
    pub friend_streaks: Vec<FriendStreak>,
    pub received_streak_requests: Vec<StreakRequest>,
    pub sent_streak_requests: Vec<StreakRequest>,
}

impl FriendsUiState {
    pub fn relationship_of(&self, username: &Username) -> Option<Relationship> {
        let name = username.as_str();
        if self.friends.iter().any(|f| f.peer.username.matches(name)) {
            Some(Relationship::Friend)
        } else if self.sent_requests.iter().any(|r| r.peer().username.matches(name)) {
            Some(Relationship::Sent)
        } else if self.received_requests.iter().any(|r| r.peer().username.matches(name)) {
            Some(Relationship::Received)
        } else {
            None
        }
    }
    pub fn has_streak_with(&self, username: &Username) -> bool {
        self.friend_streaks.iter().any(|s| s.peer.username.matches(username.as_str()))
    }
    pub fn has_pending_streak_with(&self, username: &Username) -> bool {
        self.sent_streak_requests.iter().any(|r| r.requested.username.matches(username.as_str()))
            || self.received_streak_requests.iter().any(|r| r.requester.username.matches(username.as_str()))
    }
    /// Usernames that show up in more than one of friends/sent/received.
    pub fn duplicate_relationships(&self) -> Vec<Username> {
        let mut seen: Vec<&Username> = Vec::new();
        let mut duplicates = Vec::new();
        let peers = self.friends.iter().map(|f| &f.peer.username)
            .chain(self.sent_requests.iter().map(|r| &r.peer().username))
            .chain(self.received_requests.iter().map(|r| &r.peer().username));
        for peer in peers {
            if seen.iter().any(|s| s.matches(peer.as_str())) {
                duplicates.push(peer.clone());
            } else {
                seen.push(peer);
            }
        }
        duplicates
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub enum SearchPhase {
    #[default]
    Idle,
    Debouncing,
    InFlight,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchUiState {
    pub query: String,
    pub phase: SearchPhase,
    pub results: Vec<User>,
    pub error: Option<String>,
}
impl SearchUiState {
    pub fn is_searching(&self) -> bool {
        self.phase == SearchPhase::InFlight
    }
}

/// Published snapshot of a friend's profile screen.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileUiState {
    pub username: Option<Username>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub profile: Option<FriendProfile>,
    pub stats: Option<FriendStats>,
    pub solves: Vec<Solve>,
    pub achievements: Vec<Achievement>,
}
