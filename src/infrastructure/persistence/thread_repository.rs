//! PostgreSQL implementation of ThreadRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::database::db_error;
use crate::domain::messaging::{DmMessage, DmThread, MessageContent, ThreadRepository};
use crate::domain::shared::{DomainError, MessageId, Result, ThreadId, UserId, UserPair};

const THREAD_COLUMNS: &str = "id, user_low, user_high, created_at, last_message_at, last_seq";

#[derive(FromRow)]
struct ThreadRow {
    id: Uuid,
    user_low: String,
    user_high: String,
    created_at: DateTime<Utc>,
    last_message_at: Option<DateTime<Utc>>,
    last_seq: i64,
}

impl TryFrom<ThreadRow> for DmThread {
    type Error = DomainError;

    fn try_from(r: ThreadRow) -> Result<Self> {
        let participants = UserPair::new(UserId::new(r.user_low), UserId::new(r.user_high))
            .ok_or_else(|| DomainError::Internal(format!("thread {} has one participant", r.id)))?;
        Ok(DmThread {
            id: ThreadId::from_uuid(r.id),
            participants,
            created_at: r.created_at,
            last_message_at: r.last_message_at,
            last_seq: r.last_seq as u64,
        })
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    thread_id: Uuid,
    seq: i64,
    sender_id: String,
    text: Option<String>,
    media_url: Option<String>,
    mime_type: Option<String>,
    sent_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self, cursors: &HashMap<String, i64>) -> DmMessage {
        let mut read_by: Vec<UserId> = cursors
            .iter()
            .filter(|(_, cursor)| **cursor >= self.seq)
            .map(|(user, _)| UserId::new(user.clone()))
            .collect();
        read_by.sort();
        DmMessage {
            id: MessageId::from_uuid(self.id),
            thread_id: ThreadId::from_uuid(self.thread_id),
            seq: self.seq as u64,
            sender_id: UserId::new(self.sender_id),
            content: MessageContent {
                text: self.text,
                media_url: self.media_url,
                mime_type: self.mime_type,
            },
            sent_at: self.sent_at,
            read_by,
        }
    }
}

pub struct PgThreadRepository {
    pool: PgPool,
}

impl PgThreadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn cursors(&self, thread_id: &ThreadId) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT user_id, last_read_seq FROM dm_read_cursors WHERE thread_id = $1",
        )
        .bind(thread_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl ThreadRepository for PgThreadRepository {
    async fn get_or_create_thread(&self, pair: &UserPair) -> Result<(DmThread, bool)> {
        let sql = format!(
            r#"
            INSERT INTO dm_threads (id, user_low, user_high, created_at, last_seq)
            VALUES ($1, $2, $3, NOW(), 0)
            ON CONFLICT (user_low, user_high) DO NOTHING
            RETURNING {}
            "#,
            THREAD_COLUMNS
        );
        let inserted = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(pair.low().as_str())
            .bind(pair.high().as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        if let Some(row) = inserted {
            debug!("Created thread {} for {}", row.id, pair.lock_key());
            return Ok((DmThread::try_from(row)?, true));
        }

        let sql = format!(
            "SELECT {} FROM dm_threads WHERE user_low = $1 AND user_high = $2",
            THREAD_COLUMNS
        );
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(pair.low().as_str())
            .bind(pair.high().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok((DmThread::try_from(row)?, false))
    }

    async fn find_thread(&self, id: &ThreadId) -> Result<Option<DmThread>> {
        let sql = format!("SELECT {} FROM dm_threads WHERE id = $1", THREAD_COLUMNS);
        sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(DmThread::try_from)
            .transpose()
    }

    async fn threads_for_user(
        &self,
        user: &UserId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DmThread>> {
        let sql = format!(
            r#"
            SELECT {} FROM dm_threads
            WHERE user_low = $1 OR user_high = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC, id
            OFFSET $2 LIMIT $3
            "#,
            THREAD_COLUMNS
        );
        let rows = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(user.as_str())
            .bind(offset as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(DmThread::try_from).collect()
    }

    async fn append_message(
        &self,
        thread_id: &ThreadId,
        sender: &UserId,
        content: MessageContent,
    ) -> Result<DmMessage> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Row lock on the thread serialises seq allocation
        let allocated: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            UPDATE dm_threads
            SET last_seq = last_seq + 1,
                last_message_at = GREATEST(COALESCE(last_message_at, NOW()), NOW())
            WHERE id = $1 AND (user_low = $2 OR user_high = $2)
            RETURNING last_seq, last_message_at
            "#,
        )
        .bind(thread_id.as_uuid())
        .bind(sender.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let Some((seq, sent_at)) = allocated else {
            return Err(match self.find_thread(thread_id).await? {
                Some(_) => DomainError::Forbidden("not a participant of this thread".to_string()),
                None => DomainError::NotFound(format!("thread {}", thread_id)),
            });
        };

        let id = MessageId::new();
        sqlx::query(
            r#"
            INSERT INTO dm_messages (id, thread_id, seq, sender_id, text, media_url, mime_type, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id.as_uuid())
        .bind(thread_id.as_uuid())
        .bind(seq)
        .bind(sender.as_str())
        .bind(content.text.as_ref())
        .bind(content.media_url.as_ref())
        .bind(content.mime_type.as_ref())
        .bind(sent_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        // The sender has read everything up to their own message
        sqlx::query(
            r#"
            INSERT INTO dm_read_cursors (thread_id, user_id, last_read_seq)
            VALUES ($1, $2, $3)
            ON CONFLICT (thread_id, user_id)
            DO UPDATE SET last_read_seq = GREATEST(dm_read_cursors.last_read_seq, EXCLUDED.last_read_seq)
            "#,
        )
        .bind(thread_id.as_uuid())
        .bind(sender.as_str())
        .bind(seq)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(DmMessage {
            id,
            thread_id: *thread_id,
            seq: seq as u64,
            sender_id: sender.clone(),
            content,
            sent_at,
            read_by: vec![sender.clone()],
        })
    }

    async fn messages_after(
        &self,
        thread_id: &ThreadId,
        after_seq: u64,
        limit: usize,
    ) -> Result<Vec<DmMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, thread_id, seq, sender_id, text, media_url, mime_type, sent_at
            FROM dm_messages
            WHERE thread_id = $1 AND seq > $2
            ORDER BY seq ASC
            LIMIT $3
            "#,
        )
        .bind(thread_id.as_uuid())
        .bind(after_seq as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let cursors = self.cursors(thread_id).await?;
        Ok(rows.into_iter().map(|r| r.into_message(&cursors)).collect())
    }

    async fn mark_read(
        &self,
        thread_id: &ThreadId,
        user: &UserId,
        message_id: &MessageId,
    ) -> Result<u64> {
        let seq: Option<i64> = sqlx::query_scalar(
            "SELECT seq FROM dm_messages WHERE id = $1 AND thread_id = $2",
        )
        .bind(message_id.as_uuid())
        .bind(thread_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        let seq = seq.ok_or_else(|| DomainError::NotFound(format!("message {}", message_id)))?;

        let cursor: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO dm_read_cursors (thread_id, user_id, last_read_seq)
            VALUES ($1, $2, $3)
            ON CONFLICT (thread_id, user_id)
            DO UPDATE SET last_read_seq = GREATEST(dm_read_cursors.last_read_seq, EXCLUDED.last_read_seq)
            RETURNING last_read_seq
            "#,
        )
        .bind(thread_id.as_uuid())
        .bind(user.as_str())
        .bind(seq)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(cursor as u64)
    }

    async fn unread_count(&self, thread_id: &ThreadId, user: &UserId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM dm_messages m
            WHERE m.thread_id = $1
              AND m.sender_id <> $2
              AND m.seq > COALESCE(
                  (SELECT last_read_seq FROM dm_read_cursors WHERE thread_id = $1 AND user_id = $2),
                  0)
            "#,
        )
        .bind(thread_id.as_uuid())
        .bind(user.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(count as u64)
    }
}
