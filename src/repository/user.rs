use async_trait::async_trait;
use sqlx::PgPool;

use super::{RepositoryResult, UserRepository, conflict_or_database};
use crate::models::user::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str =
    "id, username, email, display_name, about, password, created_at, updated_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUser) -> RepositoryResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                conflict_or_database(e, || "Username or email already taken".to_string())
            })
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> RepositoryResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                display_name = COALESCE($3, display_name),
                about = COALESCE($4, about),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let username = update.username.clone();
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&update.username)
            .bind(&update.display_name)
            .bind(&update.about)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                conflict_or_database(e, || {
                    format!("Username '{}' already taken", username.unwrap_or_default())
                })
            })
    }
}
