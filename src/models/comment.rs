use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::user::Author;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    /// `None` for a top-level comment.
    pub parent_comment_id: Option<i64>,
    pub author_id: i64,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A comment joined with its author's public fields.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub author_id: i64,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Fields needed to insert a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub parent_comment_id: Option<i64>,
}

/// DTO for displaying a comment with its author expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub author: Author,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CommentRow> for CommentResponse {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            parent_comment_id: row.parent_comment_id,
            author: Author {
                id: row.author_id,
                username: row.author_username,
                display_name: row.author_display_name,
            },
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A top-level comment together with the number of its direct replies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadComment {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub reply_count: i64,
}

/// One page of a keyset-paginated comment listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage<T> {
    pub comments: Vec<T>,
    pub end_of_pagination_reached: bool,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 600,
        message = "Comment must be between 1 and 600 characters"
    ))]
    pub text: String,

    /// Optional: the ID of the comment being replied to.
    pub parent_comment_id: Option<i64>,
}

/// DTO for editing a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    #[validate(length(
        min = 1,
        max = 600,
        message = "Comment must be between 1 and 600 characters"
    ))]
    pub new_text: String,
}

/// Query parameters shared by both comment listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListParams {
    /// Id of the last comment seen on the previous page.
    pub continue_after_id: Option<i64>,
}
