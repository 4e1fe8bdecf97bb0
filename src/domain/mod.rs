//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Entities and value objects for users, friendships, calls and DM threads
//! - Domain services enforcing the social rules
//! - Repository interfaces: ports for persistence
//! - Notifications emitted after successful operations

pub mod call;
pub mod friendship;
pub mod messaging;
pub mod shared;
pub mod user;

// Re-export commonly used types
pub use shared::{DomainError, Result};
