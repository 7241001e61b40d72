use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Comment, EngagementStats, User};

pub mod postgres;

pub use postgres::{create_pool, run_migrations, PgEngagementStore, PgUserStore};

/// Maximum accepted comment length in characters
pub const MAX_COMMENT_LEN: usize = 500;

/// Storage for registered user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates an account; duplicate username/email surfaces as `Conflict`
    async fn create(&self, username: &str, email: &str, password_hash: &str) -> AppResult<User>;

    async fn by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn by_id(&self, id: Uuid) -> AppResult<Option<User>>;
}

/// Storage for user-generated engagement (likes, comments, tracking).
///
/// Every mutation is a single atomic statement at the storage layer; there is
/// no read-then-write spanning round trips, so concurrent requests cannot
/// lose updates.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Atomically flips the like for (user, movie); returns the new state
    async fn toggle_like(&self, user_id: Uuid, movie_id: i64) -> AppResult<bool>;

    /// Ids of all movies the user has liked, most recent first
    async fn liked_movie_ids(&self, user_id: Uuid) -> AppResult<Vec<i64>>;

    /// Appends a comment; the text must already be validated
    async fn add_comment(&self, user_id: Uuid, movie_id: i64, text: &str) -> AppResult<Comment>;

    /// All comments for a movie, newest first
    async fn list_comments(&self, movie_id: i64) -> AppResult<Vec<Comment>>;

    /// Records that a user viewed a movie detail page
    async fn record_view(&self, user_id: Uuid, movie_id: i64) -> AppResult<()>;

    /// Records a search query a user submitted
    async fn record_search(&self, user_id: Uuid, query: &str) -> AppResult<()>;

    async fn stats(&self, user_id: Uuid) -> AppResult<EngagementStats>;
}

/// Validates comment text ahead of the insert
pub fn validate_comment(text: &str) -> AppResult<&str> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::Validation(format!(
            "text must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(text)
}
