//! Friend relation and pending requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::{UserId, UserPair};

/// Established, symmetric friendship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub pair: UserPair,
    pub created_at: DateTime<Utc>,
}

/// Pending, directed friend request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Result of sending a friend request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendRequestOutcome {
    /// Request recorded, waiting for the recipient
    Pending,
    /// A reciprocal request existed; both parties are now friends
    NowFriends,
}

impl FriendRequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestOutcome::Pending => "pending",
            FriendRequestOutcome::NowFriends => "now_friends",
        }
    }
}

/// Relationship between two users as seen from the first one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    None,
    RequestSent,
    RequestReceived,
    Friends,
}

/// Pending requests touching one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequests {
    pub received: Vec<FriendRequest>,
    pub sent: Vec<FriendRequest>,
}
