//! Shared kernel - Common types used across all bounded contexts

pub mod error;
pub mod events;
pub mod value_objects;

pub use error::{DomainError, Result};
pub use events::{NoopNotifier, Notification, Notifier};
pub use value_objects::*;
