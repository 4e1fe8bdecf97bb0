//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::call::{CallSession, MediaRole};
use crate::domain::friendship::{FriendRequestOutcome, FriendshipStatus};
use crate::domain::messaging::entity::DEFAULT_PAGE_LIMIT;
use crate::domain::messaging::DmThread;
use crate::domain::shared::{CallId, MessageId, ThreadId, UserId};
use crate::domain::user::{CreateUser, User};

/// Generic API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(message: String, code: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            code: Some(code.to_string()),
        }
    }
}

/// User response DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub handle: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            handle: user.handle,
            email: user.email,
            phone: user.phone,
            created_at: user.created_at,
        }
    }
}

/// Signup request
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    pub handle: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

impl From<SignupRequest> for CreateUser {
    fn from(req: SignupRequest) -> Self {
        Self {
            name: req.name,
            handle: req.handle,
            email: req.email,
            phone: req.phone,
            password: req.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HandleAvailability {
    pub handle: String,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestBody {
    pub to_user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendRequestResponse {
    pub outcome: FriendRequestOutcome,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendStatusResponse {
    pub user_id: UserId,
    pub status: FriendshipStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCallRequest {
    pub recipient_id: UserId,
    /// `audio` or `video`; video when absent
    pub call_type: Option<String>,
}

/// Issued call, as seen by the caller
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSessionResponse {
    pub call_id: CallId,
    pub channel_name: String,
    pub call_type: String,
    pub app_id: String,
    pub caller_id: UserId,
    pub recipient_id: UserId,
    pub caller_uid: u32,
    pub recipient_uid: u32,
    pub caller_token: String,
    pub recipient_token: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

impl From<CallSession> for CallSessionResponse {
    fn from(session: CallSession) -> Self {
        Self {
            expires_in: session.expires_in(),
            call_id: session.call_id,
            channel_name: session.channel_name,
            call_type: session.call_type.to_string(),
            app_id: session.app_id,
            caller_id: session.caller.user_id,
            recipient_id: session.recipient.user_id,
            caller_uid: session.caller.uid,
            recipient_uid: session.recipient.uid,
            caller_token: session.caller.token,
            recipient_token: session.recipient.token,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTokenRequest {
    pub channel_name: String,
    #[serde(default)]
    pub role: MediaRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenThreadRequest {
    pub peer_user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResponse {
    pub id: ThreadId,
    pub participants: [UserId; 2],
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_seq: u64,
}

impl From<DmThread> for ThreadResponse {
    fn from(thread: DmThread) -> Self {
        Self {
            id: thread.id,
            participants: [
                thread.participants.low().clone(),
                thread.participants.high().clone(),
            ],
            created_at: thread.created_at,
            last_message_at: thread.last_message_at,
            last_seq: thread.last_seq,
        }
    }
}

/// Query parameters for listing threads
#[derive(Debug, Deserialize)]
pub struct ListThreadsQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub last_read_message_id: MessageId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub thread_id: ThreadId,
    pub up_to_seq: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_threads_query_defaults() {
        let query: ListThreadsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, DEFAULT_PAGE_LIMIT);
    }
}
