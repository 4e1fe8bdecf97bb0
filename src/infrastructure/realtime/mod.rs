//! Realtime push to connected clients

pub mod registry;

pub use registry::{Connection, SessionRegistry};
