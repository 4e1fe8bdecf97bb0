//! Interface layer - External interfaces
//!
//! This layer handles:
//! - REST API endpoints
//! - WebSocket notification stream
//! - Request/response formatting

pub mod api;
