//! Persistence for users and posts.
//!
//! Handlers only ever see the [`PostStore`] and [`UserStore`] traits; the
//! SQLite implementations live in the submodules.

pub mod posts;
pub mod users;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::{NewPost, NewUser, Post, PostChanges, User};

pub use posts::SqlitePostStore;
pub use users::SqliteUserStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("{0}")]
    Conflict(String),
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post with zeroed counters and return the stored row.
    async fn create(&self, post: NewPost) -> Result<Post, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, StoreError>;

    /// Newest first. `None` means no limit.
    async fn list(&self, limit: Option<u32>) -> Result<Vec<Post>, StoreError>;

    async fn list_by_user(&self, user_id: i64, limit: Option<u32>)
        -> Result<Vec<Post>, StoreError>;

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Option<Post>, StoreError>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Move the like counter by exactly one. The counter is not clamped at zero.
    async fn adjust_likes(&self, id: i64, increment: bool) -> Result<Option<Post>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] if the username or email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}
