use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Comment, EngagementStats, User};

use super::{EngagementStore, UserStore};

/// How many times to retry the initial database connection
const CONNECT_ATTEMPTS: u32 = 5;

/// Base delay between connection attempts; doubles each retry
const CONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// Per-user tracking history caps, matching the offline model's input window
const VIEW_HISTORY_LIMIT: i64 = 100;
const SEARCH_HISTORY_LIMIT: i64 = 50;

/// Creates a PostgreSQL connection pool.
///
/// The initial connection is retried a bounded number of times with doubling
/// backoff so the service survives a database that is still coming up.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let mut delay = CONNECT_BACKOFF;

    for attempt in 1..=CONNECT_ATTEMPTS {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                tracing::warn!(attempt, error = %e, "Database connection failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e.into()),
        }
    }

    unreachable!("connect loop either returns a pool or the final error")
}

/// Applies pending migrations from the embedded `migrations/` directory
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// `UserStore` backed by PostgreSQL
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, username: &str, email: &str, password_hash: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

/// Maps unique-constraint violations to client-facing conflicts
fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        match db.constraint() {
            Some("users_username_key") => {
                return AppError::Conflict("username already taken".to_string())
            }
            Some("users_email_key") => {
                return AppError::Conflict("email already registered".to_string())
            }
            _ => {}
        }
    }
    AppError::Database(e)
}

/// `EngagementStore` backed by PostgreSQL
#[derive(Clone)]
pub struct PgEngagementStore {
    pool: PgPool,
}

impl PgEngagementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementStore for PgEngagementStore {
    async fn toggle_like(&self, user_id: Uuid, movie_id: i64) -> AppResult<bool> {
        // Delete-else-insert in one statement so concurrent toggles serialize
        // at the row level instead of racing a read-modify-write.
        let is_liked: bool = sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM likes
                WHERE user_id = $1 AND movie_id = $2
                RETURNING movie_id
            ), added AS (
                INSERT INTO likes (user_id, movie_id)
                SELECT $1, $2
                WHERE NOT EXISTS (SELECT 1 FROM removed)
                ON CONFLICT (user_id, movie_id) DO NOTHING
                RETURNING movie_id
            )
            SELECT EXISTS (SELECT 1 FROM added)
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(is_liked)
    }

    async fn liked_movie_ids(&self, user_id: Uuid) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT movie_id FROM likes WHERE user_id = $1 ORDER BY created_at DESC, movie_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn add_comment(&self, user_id: Uuid, movie_id: i64, text: &str) -> AppResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (id, user_id, movie_id, text)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, movie_id, text, created_at
            )
            SELECT i.id, i.movie_id, u.username, i.text, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(movie_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn list_comments(&self, movie_id: i64) -> AppResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.movie_id, u.username, c.text, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.movie_id = $1
            ORDER BY c.created_at DESC, c.id
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn record_view(&self, user_id: Uuid, movie_id: i64) -> AppResult<()> {
        sqlx::query("INSERT INTO movie_views (user_id, movie_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;

        // History is capped per user; older rows only feed the offline model.
        sqlx::query(
            r#"
            DELETE FROM movie_views
            WHERE user_id = $1 AND viewed_at < (
                SELECT viewed_at FROM movie_views
                WHERE user_id = $1
                ORDER BY viewed_at DESC
                OFFSET $2 LIMIT 1
            )
            "#,
        )
        .bind(user_id)
        .bind(VIEW_HISTORY_LIMIT)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_search(&self, user_id: Uuid, query: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO search_events (user_id, query) VALUES ($1, $2)")
            .bind(user_id)
            .bind(query)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM search_events
            WHERE user_id = $1 AND searched_at < (
                SELECT searched_at FROM search_events
                WHERE user_id = $1
                ORDER BY searched_at DESC
                OFFSET $2 LIMIT 1
            )
            "#,
        )
        .bind(user_id)
        .bind(SEARCH_HISTORY_LIMIT)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn stats(&self, user_id: Uuid) -> AppResult<EngagementStats> {
        let (liked_count, viewed_count, search_count): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM likes WHERE user_id = $1),
                (SELECT COUNT(*) FROM movie_views WHERE user_id = $1),
                (SELECT COUNT(*) FROM search_events WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(EngagementStats {
            liked_count,
            viewed_count,
            search_count,
        })
    }
}
