//! Credential signing port for the external media provider

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::routing::RoutingHandle;
use super::session::MediaRole;

/// What a credential allows: one uid, one channel, one role, until expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialGrant {
    pub channel: String,
    pub uid: RoutingHandle,
    pub role: MediaRole,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("media provider credentials are not configured")]
    NotConfigured,

    #[error("credential request rejected: {0}")]
    Rejected(String),

    #[error("media provider unreachable: {0}")]
    Transport(String),
}

/// Signs channel credentials on behalf of the media provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialSigner: Send + Sync {
    /// Provider application identifier handed to clients
    fn app_id(&self) -> String;

    async fn sign(&self, grant: &CredentialGrant) -> Result<String, SignerError>;
}
