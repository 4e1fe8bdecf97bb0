//! PostgreSQL implementation of FriendshipRepository
//!
//! Mutations run in a transaction holding an advisory lock on the canonical
//! pair, so concurrent requests between the same two users are serialised.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;

use super::database::db_error;
use crate::domain::friendship::{
    FriendRequest, FriendRequestOutcome, FriendshipRepository, FriendshipStatus,
};
use crate::domain::shared::{DomainError, Result, UserId, UserPair};

#[derive(FromRow)]
struct FriendRequestRow {
    from_user_id: String,
    to_user_id: String,
    created_at: DateTime<Utc>,
}

impl From<FriendRequestRow> for FriendRequest {
    fn from(r: FriendRequestRow) -> Self {
        FriendRequest {
            from_user_id: UserId::new(r.from_user_id),
            to_user_id: UserId::new(r.to_user_id),
            created_at: r.created_at,
        }
    }
}

pub struct PgFriendshipRepository {
    pool: PgPool,
}

impl PgFriendshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a transaction serialised on the pair
    async fn lock_pair(&self, pair: &UserPair) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(pair.lock_key())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        Ok(tx)
    }
}

fn pair_of(a: &UserId, b: &UserId) -> Result<UserPair> {
    UserPair::new(a.clone(), b.clone())
        .ok_or_else(|| DomainError::ValidationError("users must differ".to_string()))
}

async fn friendship_exists(tx: &mut Transaction<'static, Postgres>, pair: &UserPair) -> Result<bool> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM friendships WHERE user_low = $1 AND user_high = $2)",
    )
    .bind(pair.low().as_str())
    .bind(pair.high().as_str())
    .fetch_one(&mut **tx)
    .await
    .map_err(db_error)
}

async fn delete_request(
    tx: &mut Transaction<'static, Postgres>,
    from: &UserId,
    to: &UserId,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM friend_requests WHERE from_user_id = $1 AND to_user_id = $2")
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected() > 0)
}

async fn insert_friendship(tx: &mut Transaction<'static, Postgres>, pair: &UserPair) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO friendships (user_low, user_high, created_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(pair.low().as_str())
    .bind(pair.high().as_str())
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl FriendshipRepository for PgFriendshipRepository {
    async fn request(&self, from: &UserId, to: &UserId) -> Result<FriendRequestOutcome> {
        let pair = pair_of(from, to)?;
        let mut tx = self.lock_pair(&pair).await?;

        if friendship_exists(&mut tx, &pair).await? {
            return Err(DomainError::Conflict("already friends".to_string()));
        }

        let pending: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT from_user_id, to_user_id FROM friend_requests
            WHERE (from_user_id = $1 AND to_user_id = $2)
               OR (from_user_id = $2 AND to_user_id = $1)
            "#,
        )
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error)?;

        if pending.iter().any(|(f, _)| f == from.as_str()) {
            return Err(DomainError::Conflict("friend request already sent".to_string()));
        }

        let outcome = if pending.is_empty() {
            sqlx::query(
                "INSERT INTO friend_requests (from_user_id, to_user_id, created_at) VALUES ($1, $2, NOW())",
            )
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            FriendRequestOutcome::Pending
        } else {
            delete_request(&mut tx, to, from).await?;
            insert_friendship(&mut tx, &pair).await?;
            FriendRequestOutcome::NowFriends
        };

        tx.commit().await.map_err(db_error)?;
        debug!("Friend request {} -> {}: {}", from, to, outcome.as_str());
        Ok(outcome)
    }

    async fn accept(&self, user: &UserId, requester: &UserId) -> Result<()> {
        let pair = pair_of(user, requester)?;
        let mut tx = self.lock_pair(&pair).await?;

        if !delete_request(&mut tx, requester, user).await? {
            return Err(DomainError::NotFound(format!(
                "friend request from {}",
                requester
            )));
        }
        insert_friendship(&mut tx, &pair).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn reject(&self, user: &UserId, requester: &UserId) -> Result<()> {
        let pair = pair_of(user, requester)?;
        let mut tx = self.lock_pair(&pair).await?;
        if !delete_request(&mut tx, requester, user).await? {
            return Err(DomainError::NotFound(format!(
                "friend request from {}",
                requester
            )));
        }
        tx.commit().await.map_err(db_error)
    }

    async fn cancel(&self, from: &UserId, to: &UserId) -> Result<()> {
        let pair = pair_of(from, to)?;
        let mut tx = self.lock_pair(&pair).await?;
        if !delete_request(&mut tx, from, to).await? {
            return Err(DomainError::NotFound(format!("friend request to {}", to)));
        }
        tx.commit().await.map_err(db_error)
    }

    async fn remove(&self, user: &UserId, other: &UserId) -> Result<bool> {
        let Some(pair) = UserPair::new(user.clone(), other.clone()) else {
            return Ok(false);
        };
        let mut tx = self.lock_pair(&pair).await?;
        let result = sqlx::query("DELETE FROM friendships WHERE user_low = $1 AND user_high = $2")
            .bind(pair.low().as_str())
            .bind(pair.high().as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool> {
        let Some(pair) = UserPair::new(a.clone(), b.clone()) else {
            return Ok(false);
        };
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM friendships WHERE user_low = $1 AND user_high = $2)",
        )
        .bind(pair.low().as_str())
        .bind(pair.high().as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn friends_of(&self, user: &UserId) -> Result<Vec<UserId>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT user_high FROM friendships WHERE user_low = $1
            UNION ALL
            SELECT user_low FROM friendships WHERE user_high = $1
            ORDER BY 1
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn pending_received(&self, user: &UserId) -> Result<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT from_user_id, to_user_id, created_at FROM friend_requests
            WHERE to_user_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(FriendRequest::from).collect())
    }

    async fn pending_sent(&self, user: &UserId) -> Result<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT from_user_id, to_user_id, created_at FROM friend_requests
            WHERE from_user_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(FriendRequest::from).collect())
    }

    async fn status(&self, user: &UserId, other: &UserId) -> Result<FriendshipStatus> {
        if self.are_friends(user, other).await? {
            return Ok(FriendshipStatus::Friends);
        }
        let from: Option<String> = sqlx::query_scalar(
            r#"
            SELECT from_user_id FROM friend_requests
            WHERE (from_user_id = $1 AND to_user_id = $2)
               OR (from_user_id = $2 AND to_user_id = $1)
            LIMIT 1
            "#,
        )
        .bind(user.as_str())
        .bind(other.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(match from {
            Some(from) if from == user.as_str() => FriendshipStatus::RequestSent,
            Some(_) => FriendshipStatus::RequestReceived,
            None => FriendshipStatus::None,
        })
    }
}
