pub mod non_api_structs;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Username(pub String);
impl AsRef<Username> for Username {
    fn as_ref(&self) -> &Username {
        &self
    }
}
impl Username {
    /// Trims surrounding whitespace; `None` for an empty name.
    pub fn from(string: impl AsRef<str>) -> Option<Self> {
        let string = string.as_ref().trim();
        if string.is_empty() {
            return None;
        }
        Some(Self(string.to_string()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// Usernames are matched case-insensitively by the backend.
    pub fn matches(&self, other: impl AsRef<str>) -> bool {
        self.0.eq_ignore_ascii_case(other.as_ref())
    }
}
impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UserId(pub u64);
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct FriendRequestId(pub u64);
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StreakRequestId(pub u64);

impl fmt::Display for FriendRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for StreakRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub total_xp: u64,
}

/// A confirmed, bidirectional friendship.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct FriendEdge {
    pub peer: User,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestDirection {
    Sent,
    Received,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct RelationshipRequest {
    pub id: FriendRequestId,
    pub direction: RequestDirection,
    pub requester: User,
    pub addressee: User,
    pub created_at: DateTime<Utc>,
}
impl RelationshipRequest {
    /// The other side of the request from the session user's point of view.
    pub fn peer(&self) -> &User {
        match self.direction {
            RequestDirection::Sent => &self.addressee,
            RequestDirection::Received => &self.requester,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct StreakRequest {
    pub id: StreakRequestId,
    pub requester: User,
    pub requested: User,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct FriendStreak {
    pub peer: User,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Body of every "by username" mutation.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct UsernamePayload {
    pub username: Username,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct FriendProfile {
    pub user: User,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct FriendStats {
    pub total_solved: u32,
    pub easy_solved: u32,
    pub medium_solved: u32,
    pub hard_solved: u32,
    pub longest_streak: u32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Solve {
    pub problem_slug: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub solved_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
}
