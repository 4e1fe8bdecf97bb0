//! DM thread repository interface

use async_trait::async_trait;

use super::entity::{DmMessage, DmThread, MessageContent};
use crate::domain::shared::{MessageId, Result, ThreadId, UserId, UserPair};

/// Thread and message store
///
/// `get_or_create_thread` is a create-if-absent keyed on the sorted pair and
/// `append_message` allocates the next sequence number; both must be atomic
/// with respect to concurrent callers.
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Returns the pair's thread and whether this call created it
    async fn get_or_create_thread(&self, pair: &UserPair) -> Result<(DmThread, bool)>;

    async fn find_thread(&self, id: &ThreadId) -> Result<Option<DmThread>>;

    /// Threads of a user, most recently active first
    async fn threads_for_user(
        &self,
        user: &UserId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DmThread>>;

    /// Append to the log with the next seq and a non-decreasing timestamp
    async fn append_message(
        &self,
        thread_id: &ThreadId,
        sender: &UserId,
        content: MessageContent,
    ) -> Result<DmMessage>;

    /// Messages with `seq > after_seq`, ascending, at most `limit`
    async fn messages_after(
        &self,
        thread_id: &ThreadId,
        after_seq: u64,
        limit: usize,
    ) -> Result<Vec<DmMessage>>;

    /// Move the user's read cursor up to the given message; returns the cursor seq
    async fn mark_read(
        &self,
        thread_id: &ThreadId,
        user: &UserId,
        message_id: &MessageId,
    ) -> Result<u64>;

    /// Messages from the peer past the user's read cursor
    async fn unread_count(&self, thread_id: &ThreadId, user: &UserId) -> Result<u64>;
}
