//! Friendship repository interface

use async_trait::async_trait;

use super::entity::{FriendRequest, FriendRequestOutcome, FriendshipStatus};
use crate::domain::shared::{Result, UserId};

/// Friendship store
///
/// Every mutation is a single atomic unit: implementations must serialise
/// concurrent mutations of the same pair so that a reciprocal request is
/// never stored as two pending requests and friend sets stay symmetric.
#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    /// Record a request, or resolve a reciprocal one into a friendship
    async fn request(&self, from: &UserId, to: &UserId) -> Result<FriendRequestOutcome>;

    /// Turn the pending `requester -> user` request into a friendship
    async fn accept(&self, user: &UserId, requester: &UserId) -> Result<()>;

    /// Drop the pending `requester -> user` request
    async fn reject(&self, user: &UserId, requester: &UserId) -> Result<()>;

    /// Withdraw the pending `from -> to` request
    async fn cancel(&self, from: &UserId, to: &UserId) -> Result<()>;

    /// Remove the friendship; returns whether one existed
    async fn remove(&self, user: &UserId, other: &UserId) -> Result<bool>;

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool>;

    async fn friends_of(&self, user: &UserId) -> Result<Vec<UserId>>;

    async fn pending_received(&self, user: &UserId) -> Result<Vec<FriendRequest>>;

    async fn pending_sent(&self, user: &UserId) -> Result<Vec<FriendRequest>>;

    async fn status(&self, user: &UserId, other: &UserId) -> Result<FriendshipStatus>;
}
