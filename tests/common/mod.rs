// tests/common/mod.rs
#![allow(dead_code)]

use std::net::SocketAddr;

use blog_backend::{
    config::{Config, RateLimits, StoreKind},
    routes,
    state::AppState,
};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

fn test_config(store: StoreKind, database_url: Option<String>) -> Config {
    Config {
        store,
        database_url,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        website_url: "http://localhost:3000".to_string(),
        rate_limits: RateLimits::default(),
    }
}

impl TestApp {
    /// Spawns the app on a random port, backed by a fresh in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Like `spawn`, after letting the caller adjust the configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = test_config(StoreKind::Memory, None);
        configure(&mut config);

        Self::serve(AppState::in_memory(config)).await
    }

    /// Spawns the app against the Postgres database in `DATABASE_URL`,
    /// with migrations applied. `None` when `DATABASE_URL` is not set.
    pub async fn spawn_postgres() -> Option<Self> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres test");
            return None;
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to Postgres for testing");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to migrate database");

        let config = test_config(StoreKind::Postgres, Some(database_url));

        Some(Self::serve(AppState::postgres(pool, config)).await)
    }

    async fn serve(state: AppState) -> Self {
        let app = routes::create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Signs up a fresh user and logs in.
    pub async fn user(&self) -> TestUser {
        let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let password = "password123";

        let signup = self
            .client
            .post(self.url("/api/users/signup"))
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": password,
            }))
            .send()
            .await
            .expect("Sign-up failed");
        assert_eq!(signup.status().as_u16(), 201);

        let login: Value = self
            .client
            .post(self.url("/api/users/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");

        TestUser {
            id: login["user"]["id"].as_i64().expect("user id"),
            username,
            token: login["token"].as_str().expect("Token not found").to_string(),
        }
    }

    pub async fn create_post(&self, user: &TestUser, slug: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/posts"))
            .bearer_auth(&user.token)
            .json(&json!({
                "slug": slug,
                "title": format!("Post {}", slug),
                "summary": "A summary",
                "body": "<p>Hello</p>",
            }))
            .send()
            .await
            .expect("Create post failed");
        assert_eq!(response.status().as_u16(), 201);

        response.json().await.unwrap()
    }

    pub async fn create_comment(
        &self,
        user: &TestUser,
        post_id: i64,
        text: &str,
        parent_comment_id: Option<i64>,
    ) -> i64 {
        let response = self
            .client
            .post(self.url(&format!("/api/posts/{}/comments", post_id)))
            .bearer_auth(&user.token)
            .json(&json!({ "text": text, "parentCommentId": parent_comment_id }))
            .send()
            .await
            .expect("Create comment failed");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().expect("comment id")
    }

    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

/// `prefix` plus a random suffix, for slugs that must not clash across runs
/// against a shared database.
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Ids of the `comments` array of a listing response.
pub fn comment_ids(page: &Value) -> Vec<i64> {
    page["comments"]
        .as_array()
        .expect("comments array")
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect()
}
