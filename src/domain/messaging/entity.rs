//! DM threads and their message log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::{DomainError, MessageId, Result, ThreadId, UserId, UserPair};

pub const MAX_TEXT_CHARS: usize = 4000;
pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 100;

/// One-to-one conversation, unique per unordered pair of users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmThread {
    pub id: ThreadId,
    pub participants: UserPair,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_seq: u64,
}

impl DmThread {
    pub fn new(participants: UserPair) -> Self {
        Self {
            id: ThreadId::new(),
            participants,
            created_at: Utc::now(),
            last_message_at: None,
            last_seq: 0,
        }
    }

    pub fn is_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// Timestamp used to order a user's inbox
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

/// Message payload: text, media, or both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub mime_type: Option<String>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Trim fields, drop blanks and check the payload is sendable
    pub fn validated(self) -> Result<Self> {
        let text = non_blank(self.text);
        let media_url = non_blank(self.media_url);
        let mime_type = non_blank(self.mime_type);

        if text.is_none() && media_url.is_none() {
            return Err(DomainError::ValidationError(
                "message needs text or media".to_string(),
            ));
        }
        if let Some(text) = &text {
            if text.chars().count() > MAX_TEXT_CHARS {
                return Err(DomainError::ValidationError(format!(
                    "message text exceeds {} characters",
                    MAX_TEXT_CHARS
                )));
            }
        }
        if mime_type.is_some() && media_url.is_none() {
            return Err(DomainError::ValidationError(
                "mimeType given without mediaUrl".to_string(),
            ));
        }

        Ok(Self {
            text,
            media_url,
            mime_type,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmMessage {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub seq: u64,
    pub sender_id: UserId,
    #[serde(flatten)]
    pub content: MessageContent,
    pub sent_at: DateTime<Utc>,
    pub read_by: Vec<UserId>,
}

/// Page request for a message log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl PageRequest {
    /// Sequence number after which the page starts
    pub fn after_seq(&self) -> Result<u64> {
        match self.cursor.as_deref().map(str::trim) {
            None | Some("") => Ok(0),
            Some(cursor) => cursor
                .parse::<u64>()
                .map_err(|_| DomainError::ValidationError(format!("invalid cursor: {}", cursor))),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub items: Vec<DmMessage>,
    /// Opaque; absent when the log is exhausted
    pub next_cursor: Option<String>,
}

/// Inbox entry for one thread as seen by one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: ThreadId,
    pub peer_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_seq: u64,
    pub unread: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_requires_text_or_media() {
        let empty = MessageContent {
            text: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            empty.validated(),
            Err(DomainError::ValidationError(_))
        ));

        let media = MessageContent {
            media_url: Some("https://cdn.example.com/a.png".to_string()),
            mime_type: Some("image/png".to_string()),
            ..Default::default()
        };
        assert!(media.validated().is_ok());
    }

    #[test]
    fn test_text_length_limit() {
        let ok = MessageContent::text("é".repeat(MAX_TEXT_CHARS));
        assert!(ok.validated().is_ok());
        let long = MessageContent::text("a".repeat(MAX_TEXT_CHARS + 1));
        assert!(long.validated().is_err());
    }

    #[test]
    fn test_page_request_defaults_and_clamps() {
        let page = PageRequest::default();
        assert_eq!(page.after_seq().unwrap(), 0);
        assert_eq!(page.limit(), DEFAULT_PAGE_LIMIT);

        let page = PageRequest {
            cursor: Some("12".to_string()),
            limit: Some(1000),
        };
        assert_eq!(page.after_seq().unwrap(), 12);
        assert_eq!(page.limit(), MAX_PAGE_LIMIT);

        let page = PageRequest {
            cursor: Some("abc".to_string()),
            limit: Some(0),
        };
        assert!(page.after_seq().is_err());
        assert_eq!(page.limit(), 1);
    }
}
