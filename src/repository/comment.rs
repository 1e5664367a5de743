use async_trait::async_trait;
use sqlx::PgPool;

use super::{CommentRepository, RepositoryResult};
use crate::models::comment::{Comment, CommentRow, NewComment};

/// Columns of `CommentRow`; expects `comments c JOIN users u`.
const COMMENT_ROW_COLUMNS: &str = r#"
    c.id, c.post_id, c.parent_comment_id, c.author_id,
    u.username AS author_username, u.display_name AS author_display_name,
    c.text, c.created_at, c.updated_at
"#;

const COMMENT_COLUMNS: &str =
    "id, post_id, parent_comment_id, author_id, text, created_at, updated_at";

/// Postgres implementation
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn find_top_level(
        &self,
        post_id: i64,
        before_id: Option<i64>,
        limit: i64,
    ) -> RepositoryResult<Vec<CommentRow>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_ROW_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
              AND c.parent_comment_id IS NULL
              AND ($2::BIGINT IS NULL OR c.id < $2)
            ORDER BY c.id DESC
            LIMIT $3
            "#
        );

        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .bind(before_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn find_replies(
        &self,
        parent_comment_id: i64,
        after_id: Option<i64>,
        limit: i64,
    ) -> RepositoryResult<Vec<CommentRow>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_ROW_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.parent_comment_id = $1
              AND ($2::BIGINT IS NULL OR c.id > $2)
            ORDER BY c.id ASC
            LIMIT $3
            "#
        );

        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(parent_comment_id)
            .bind(after_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn count_replies(&self, parent_comment_id: i64) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments WHERE parent_comment_id = $1",
        )
        .bind(parent_comment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");

        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    async fn find_row_by_id(&self, id: i64) -> RepositoryResult<Option<CommentRow>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_ROW_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.id = $1
            "#
        );

        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn insert(&self, comment: NewComment) -> RepositoryResult<Comment> {
        let sql = format!(
            r#"
            INSERT INTO comments (post_id, author_id, text, parent_comment_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Comment>(&sql)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(&comment.text)
            .bind(comment.parent_comment_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(inserted)
    }

    async fn update_text(&self, id: i64, text: &str) -> RepositoryResult<Option<Comment>> {
        let sql = format!(
            r#"
            UPDATE comments
            SET text = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(text)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_children_of(&self, parent_ids: &[i64]) -> RepositoryResult<Vec<i64>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let deleted = sqlx::query_scalar::<_, i64>(
            "DELETE FROM comments WHERE parent_comment_id = ANY($1) RETURNING id",
        )
        .bind(parent_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(deleted)
    }

    async fn delete_for_post(&self, post_id: i64) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
