//! User entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::{DomainError, Result, UserId};

const MIN_PASSWORD_LEN: usize = 6;
const MAX_HANDLE_LEN: usize = 30;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub handle: String,
    /// Always stored lowercased
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Signup data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub handle: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String, // Plain text password (will be hashed)
}

impl CreateUser {
    /// Trim, lowercase and validate the signup fields
    pub fn normalized(self) -> Result<Self> {
        let handle = self.handle.trim().trim_start_matches('@').to_string();
        let email = normalize_email(&self.email);
        let password = self.password.trim().to_string();
        let name = self.name.trim().to_string();
        let phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        if handle.is_empty() || handle.len() > MAX_HANDLE_LEN {
            return Err(DomainError::ValidationError(format!(
                "handle must be 1 to {} characters",
                MAX_HANDLE_LEN
            )));
        }
        if !handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(DomainError::ValidationError(
                "handle may only contain letters, digits, '_' and '.'".to_string(),
            ));
        }
        if !is_valid_email(&email) {
            return Err(DomainError::ValidationError(format!(
                "invalid email address: {}",
                email
            )));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(DomainError::ValidationError(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        Ok(Self {
            name: if name.is_empty() { handle.clone() } else { name },
            handle,
            email,
            phone,
            password,
        })
    }
}

/// Emails are unique and looked up case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(handle: &str, email: &str, password: &str) -> CreateUser {
        CreateUser {
            name: "Alice".to_string(),
            handle: handle.to_string(),
            email: email.to_string(),
            phone: Some("  ".to_string()),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let data = signup("  alice ", " Alice@Example.COM ", " secret123 ")
            .normalized()
            .unwrap();
        assert_eq!(data.handle, "alice");
        assert_eq!(data.email, "alice@example.com");
        assert_eq!(data.password, "secret123");
        assert_eq!(data.phone, None);
    }

    #[test]
    fn test_invalid_email_rejected() {
        for email in ["alice", "alice@", "@example.com", "alice@example", "a@b@c.com"] {
            let err = signup("alice", email, "secret123").normalized().unwrap_err();
            assert!(matches!(err, DomainError::ValidationError(_)), "{}", email);
        }
    }

    #[test]
    fn test_short_password_rejected() {
        let err = signup("alice", "alice@example.com", "abc").normalized().unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }

    #[test]
    fn test_bad_handle_rejected() {
        assert!(signup("", "a@example.com", "secret123").normalized().is_err());
        assert!(signup("al ice", "a@example.com", "secret123").normalized().is_err());
    }
}
