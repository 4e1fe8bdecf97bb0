//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use super::database::db_error;
use crate::domain::shared::{Result, UserId};
use crate::domain::user::{User, UserRepository};

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    handle: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: UserId::new(r.id),
            name: r.name,
            handle: r.handle,
            email: r.email,
            phone: r.phone,
            password_hash: r.password_hash,
            created_at: r.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, name, handle, email, phone, password_hash, created_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, predicate: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: User) -> Result<User> {
        // Unique indexes on email, handle and phone report the clashing field
        sqlx::query(
            r#"
            INSERT INTO users (id, name, handle, email, phone, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(&user.handle)
        .bind(&user.email)
        .bind(user.phone.as_ref())
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        debug!("Created user: {}", user.id);
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        self.find_one("id = $1", id.as_str()).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("LOWER(email) = LOWER($1)", email).await
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<User>> {
        self.find_one("LOWER(handle) = LOWER($1)", handle).await
    }

    async fn exists(&self, id: &UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(exists)
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let sql = format!(
            "SELECT {} FROM users WHERE id = ANY($1) ORDER BY handle",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
