//! Loopync - social backend core
//!
//! Users, a symmetric friend graph, one-to-one direct messages and call
//! session issuance for an external real-time media provider, organised as
//! domain, infrastructure and interface layers.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::error::Result;
