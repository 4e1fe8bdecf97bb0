//! Call session value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::{CallId, DomainError, UserId};

/// Kind of one-to-one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Audio,
    #[default]
    Video,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Audio => "audio",
            CallType::Video => "video",
        }
    }
}

impl FromStr for CallType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "audio" | "voice" => Ok(CallType::Audio),
            "video" => Ok(CallType::Video),
            other => Err(DomainError::ValidationError(format!(
                "unknown call type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Privilege a credential grants on its channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaRole {
    /// May publish and subscribe
    #[default]
    Publisher,
    /// May only subscribe
    Subscriber,
}

/// One party's access to a call channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyCredential {
    pub user_id: UserId,
    pub uid: u32,
    pub token: String,
}

/// Issued call session
///
/// A capability bundle rather than a stored record: nothing about it is
/// mutated after issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub call_id: CallId,
    pub channel_name: String,
    pub call_type: CallType,
    pub app_id: String,
    pub caller: PartyCredential,
    pub recipient: PartyCredential,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CallSession {
    /// Channel names are derived from the call id so they are unique per call
    pub fn channel_name_for(call_id: &CallId) -> String {
        format!("call-{}", call_id.as_uuid().simple())
    }

    pub fn expires_in(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

/// Single credential for an arbitrary channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCredential {
    pub app_id: String,
    pub channel_name: String,
    pub role: MediaRole,
    pub uid: u32,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
