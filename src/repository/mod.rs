//! Repository layer: every store access the handlers and services make goes
//! through these traits, so the same code runs against Postgres or in memory.

pub mod comment;
pub mod memory;
pub mod post;
pub mod user;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    comment::{Comment, CommentRow, NewComment},
    post::{Post, PostContent, PostRow},
    user::{NewUser, ProfileUpdate, User},
};

pub use comment::PgCommentRepository;
pub use memory::MemoryStore;
pub use post::PgPostRepository;
pub use user::PgUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_or_database(err: sqlx::Error, message: impl FnOnce() -> String) -> RepositoryError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => RepositoryError::Conflict(message()),
        _ => RepositoryError::Database(err),
    }
}

/// Comment storage. Ids are assigned by the store and grow with insertion order.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Top-level comments of a post, newest first, optionally strictly older than `before_id`.
    async fn find_top_level(
        &self,
        post_id: i64,
        before_id: Option<i64>,
        limit: i64,
    ) -> RepositoryResult<Vec<CommentRow>>;

    /// Direct replies to a comment, oldest first, optionally strictly newer than `after_id`.
    async fn find_replies(
        &self,
        parent_comment_id: i64,
        after_id: Option<i64>,
        limit: i64,
    ) -> RepositoryResult<Vec<CommentRow>>;

    /// Number of comments whose parent is `parent_comment_id`.
    async fn count_replies(&self, parent_comment_id: i64) -> RepositoryResult<i64>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Comment>>;

    async fn find_row_by_id(&self, id: i64) -> RepositoryResult<Option<CommentRow>>;

    async fn insert(&self, comment: NewComment) -> RepositoryResult<Comment>;

    /// Replaces the text and bumps `updated_at`. Returns `None` if the comment is gone.
    async fn update_text(&self, id: i64, text: &str) -> RepositoryResult<Option<Comment>>;

    /// Returns whether a row was deleted.
    async fn delete_by_id(&self, id: i64) -> RepositoryResult<bool>;

    /// Deletes every comment whose parent is one of `parent_ids` and returns their ids.
    async fn delete_children_of(&self, parent_ids: &[i64]) -> RepositoryResult<Vec<i64>>;

    /// Deletes every comment of a post. Returns the number of rows removed.
    async fn delete_for_post(&self, post_id: i64) -> RepositoryResult<u64>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Newest first.
    async fn list(
        &self,
        author_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<PostRow>>;

    async fn count(&self, author_id: Option<i64>) -> RepositoryResult<i64>;

    async fn slugs(&self) -> RepositoryResult<Vec<String>>;

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<PostRow>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Post>>;

    async fn find_row_by_id(&self, id: i64) -> RepositoryResult<Option<PostRow>>;

    /// Fails with `Conflict` if the slug is taken.
    async fn insert(&self, author_id: i64, content: PostContent) -> RepositoryResult<Post>;

    /// Fails with `Conflict` if the slug is taken by another post.
    async fn update(&self, id: i64, content: PostContent) -> RepositoryResult<Option<Post>>;

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` if the username or email is taken.
    async fn insert(&self, user: NewUser) -> RepositoryResult<User>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Fails with `Conflict` if the new username is taken.
    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> RepositoryResult<Option<User>>;
}
