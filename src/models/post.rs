use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::user::Author;

pub static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid slug pattern"));

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub featured_image_url: Option<String>,
    pub author_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A post joined with its author's public fields.
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub featured_image_url: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for displaying a post with its author expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub featured_image_url: Option<String>,
    pub author: Author,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PostRow> for PostResponse {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            summary: row.summary,
            body: row.body,
            featured_image_url: row.featured_image_url,
            author: Author {
                id: row.author_id,
                username: row.author_username,
                display_name: row.author_display_name,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Editable fields of a post. Used for both insert and full replacement.
#[derive(Debug, Clone)]
pub struct PostContent {
    pub slug: String,
    pub title: String,
    pub summary: String,
    /// Already sanitized.
    pub body: String,
    pub featured_image_url: Option<String>,
}

/// DTO for creating or replacing a post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    #[validate(
        length(min = 1, max = 100, message = "Slug length must be between 1 and 100 chars"),
        regex(path = *SLUG_REGEX, message = "Slug may only contain letters, digits, '-' and '_'")
    )]
    pub slug: String,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Title length must be between 1 and 100 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 300,
        message = "Summary length must be between 1 and 300 chars"
    ))]
    pub summary: String,

    #[validate(length(min = 1, message = "Body must not be empty"))]
    pub body: String,

    #[validate(url(message = "Featured image must be a valid URL"))]
    pub featured_image_url: Option<String>,
}

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListParams {
    /// Only list posts by this author.
    pub author_id: Option<i64>,

    /// 1-based page number (default: 1).
    pub page: Option<i64>,
}

/// Response body of `GET /api/posts`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<PostResponse>,
    pub page: i64,
    pub total_pages: i64,
}
