use async_trait::async_trait;
use sqlx::PgPool;

use super::{PostRepository, RepositoryResult, conflict_or_database};
use crate::models::post::{Post, PostContent, PostRow};

/// Columns of `PostRow`; expects `posts p JOIN users u`.
const POST_ROW_COLUMNS: &str = r#"
    p.id, p.slug, p.title, p.summary, p.body, p.featured_image_url, p.author_id,
    u.username AS author_username, u.display_name AS author_display_name,
    p.created_at, p.updated_at
"#;

const POST_COLUMNS: &str =
    "id, slug, title, summary, body, featured_image_url, author_id, created_at, updated_at";

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn slug_taken(slug: &str) -> impl FnOnce() -> String + '_ {
    move || format!("Slug '{}' is already taken. Please choose a different one.", slug)
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn list(
        &self,
        author_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<PostRow>> {
        let sql = format!(
            r#"
            SELECT {POST_ROW_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE ($1::BIGINT IS NULL OR p.author_id = $1)
            ORDER BY p.id DESC
            OFFSET $2
            LIMIT $3
            "#
        );

        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(author_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn count(&self, author_id: Option<i64>) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE ($1::BIGINT IS NULL OR author_id = $1)",
        )
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn slugs(&self) -> RepositoryResult<Vec<String>> {
        let slugs = sqlx::query_scalar::<_, String>("SELECT slug FROM posts ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(slugs)
    }

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<PostRow>> {
        let sql = format!(
            r#"
            SELECT {POST_ROW_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.slug = $1
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");

        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn find_row_by_id(&self, id: i64) -> RepositoryResult<Option<PostRow>> {
        let sql = format!(
            r#"
            SELECT {POST_ROW_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.id = $1
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn insert(&self, author_id: i64, content: PostContent) -> RepositoryResult<Post> {
        let sql = format!(
            r#"
            INSERT INTO posts (slug, title, summary, body, featured_image_url, author_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {POST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Post>(&sql)
            .bind(&content.slug)
            .bind(&content.title)
            .bind(&content.summary)
            .bind(&content.body)
            .bind(&content.featured_image_url)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_database(e, slug_taken(&content.slug)))
    }

    async fn update(&self, id: i64, content: PostContent) -> RepositoryResult<Option<Post>> {
        let sql = format!(
            r#"
            UPDATE posts
            SET slug = $2, title = $3, summary = $4, body = $5,
                featured_image_url = COALESCE($6, featured_image_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(&content.slug)
            .bind(&content.title)
            .bind(&content.summary)
            .bind(&content.body)
            .bind(&content.featured_image_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_or_database(e, slug_taken(&content.slug)))
    }

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
