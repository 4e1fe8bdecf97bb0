//! Signup, login and profile lookup

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::entity::{normalize_email, CreateUser, User};
use super::repository::UserRepository;
use crate::domain::shared::{DomainError, Result, UserId};

pub struct UserService {
    users: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    /// Register a new user
    pub async fn signup(&self, data: CreateUser) -> Result<User> {
        let data = data.normalized()?;
        let password_hash = hash_password(data.password, self.bcrypt_cost).await?;

        let user = User {
            id: UserId::generate(),
            name: data.name,
            handle: data.handle,
            email: data.email,
            phone: data.phone,
            password_hash,
            created_at: Utc::now(),
        };

        let user = self.users.insert(user).await?;
        info!("Registered user {} (@{})", user.id, user.handle);
        Ok(user)
    }

    /// Verify email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                debug!("Login for unknown email {}", email);
                return Err(invalid_credentials());
            }
        };

        let hash = user.password_hash.clone();
        let password = password.trim().to_string();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| DomainError::Internal(format!("password check task failed: {}", e)))?
            .map_err(|e| DomainError::Internal(format!("stored password hash unreadable: {}", e)))?;

        if !valid {
            warn!("Failed login for user {}", user.id);
            return Err(invalid_credentials());
        }

        info!("User {} logged in", user.id);
        Ok(user)
    }

    pub async fn get(&self, id: &UserId) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("user {}", id)))
    }

    pub async fn handle_available(&self, handle: &str) -> Result<bool> {
        let handle = handle.trim().trim_start_matches('@');
        Ok(self.users.find_by_handle(handle).await?.is_none())
    }
}

fn invalid_credentials() -> DomainError {
    DomainError::Unauthorized("invalid email or password".to_string())
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| DomainError::Internal(format!("password hash task failed: {}", e)))?
        .map_err(|e| DomainError::Internal(format!("password hashing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::MemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()), 4)
    }

    fn signup(handle: &str, email: &str) -> CreateUser {
        CreateUser {
            name: handle.to_string(),
            handle: handle.to_string(),
            email: email.to_string(),
            phone: None,
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_and_login() {
        let service = service();
        let user = service
            .signup(signup("alice", "Alice@Example.com"))
            .await
            .unwrap();
        assert_ne!(user.password_hash, "password123");

        let logged_in = service.login("ALICE@example.com", "password123").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let service = service();
        service.signup(signup("alice", "alice@example.com")).await.unwrap();

        let err = service.login("alice@example.com", "nope-nope").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        let err = service.login("bob@example.com", "password123").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let service = service();
        service.signup(signup("alice", "alice@example.com")).await.unwrap();

        let err = service
            .signup(signup("alice2", "ALICE@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_handle_availability() {
        let service = service();
        assert!(service.handle_available("alice").await.unwrap());
        service.signup(signup("alice", "alice@example.com")).await.unwrap();
        assert!(!service.handle_available("@alice").await.unwrap());
    }
}
