use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::repository::{
    CommentRepository, MemoryStore, PgCommentRepository, PgPostRepository, PgUserRepository,
    PostRepository, UserRepository,
};

pub type DynCommentRepository = Arc<dyn CommentRepository>;
pub type DynPostRepository = Arc<dyn PostRepository>;
pub type DynUserRepository = Arc<dyn UserRepository>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: DynUserRepository,
    pub posts: DynPostRepository,
    pub comments: DynCommentRepository,
}

impl AppState {
    /// All repositories backed by one Postgres pool.
    pub fn postgres(pool: PgPool, config: Config) -> Self {
        Self {
            config,
            users: Arc::new(PgUserRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool)),
        }
    }

    /// All repositories backed by one fresh in-memory store.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            config,
            users: store.clone(),
            posts: store.clone(),
            comments: store,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for DynUserRepository {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for DynPostRepository {
    fn from_ref(state: &AppState) -> Self {
        state.posts.clone()
    }
}

impl FromRef<AppState> for DynCommentRepository {
    fn from_ref(state: &AppState) -> Self {
        state.comments.clone()
    }
}
