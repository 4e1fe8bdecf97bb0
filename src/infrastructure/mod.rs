//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Repository implementations (in-memory and PostgreSQL)
//! - The media provider credential signer
//! - Realtime connection registry

pub mod media_provider;
pub mod persistence;
pub mod realtime;
