//! User repository interface

use super::entity::User;
use crate::domain::shared::{Result, UserId};
use async_trait::async_trait;

/// User repository trait
///
/// Uniqueness of email, handle and phone is enforced by the store itself;
/// `insert` fails with `Conflict` naming the offending field.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a fully built user
    async fn insert(&self, user: User) -> Result<User>;

    /// Find user by ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Find user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find user by handle
    async fn find_by_handle(&self, handle: &str) -> Result<Option<User>>;

    /// Check that a user exists
    async fn exists(&self, id: &UserId) -> Result<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Fetch several users, skipping unknown ids
    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>>;
}
