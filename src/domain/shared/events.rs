//! Realtime notifications emitted after a domain operation commits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::{CallId, MessageId, ThreadId, UserId};
use crate::domain::call::CallType;

/// Event pushed to a user's live connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    FriendRequest { from_user_id: UserId },
    #[serde(rename_all = "camelCase")]
    FriendAccepted { peer_id: UserId },
    #[serde(rename_all = "camelCase")]
    FriendRemoved { peer_id: UserId },
    #[serde(rename_all = "camelCase")]
    IncomingCall {
        call_id: CallId,
        caller_id: UserId,
        call_type: CallType,
        channel_name: String,
        app_id: String,
        token: String,
        uid: u32,
        expires_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    NewMessage {
        thread_id: ThreadId,
        message_id: MessageId,
        sender_id: UserId,
        seq: u64,
        text: Option<String>,
        media_url: Option<String>,
        sent_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        thread_id: ThreadId,
        reader_id: UserId,
        up_to_seq: u64,
    },
}

impl Notification {
    /// Returns the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::FriendRequest { .. } => "friend_request",
            Notification::FriendAccepted { .. } => "friend_accepted",
            Notification::FriendRemoved { .. } => "friend_removed",
            Notification::IncomingCall { .. } => "incoming_call",
            Notification::NewMessage { .. } => "new_message",
            Notification::MessagesRead { .. } => "messages_read",
        }
    }
}

/// Fire-and-forget delivery of notifications
///
/// Implementations must not block and must not fail the calling operation;
/// an offline recipient simply misses the push.
pub trait Notifier: Send + Sync {
    fn notify(&self, user: &UserId, notification: Notification);
}

/// Notifier that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _user: &UserId, _notification: Notification) {}
}
