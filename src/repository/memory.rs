//! In-process store backing all three repositories.
//!
//! Used by the integration tests and for running the server without Postgres
//! (`STORE=memory`). Each call takes the lock once, so single-row operations are
//! atomic the same way they are in the database; multi-step sequences built on
//! top of the traits are not.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    CommentRepository, PostRepository, RepositoryError, RepositoryResult, UserRepository,
};
use crate::models::{
    comment::{Comment, CommentRow, NewComment},
    post::{Post, PostContent, PostRow},
    user::{NewUser, ProfileUpdate, User},
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    last_user_id: i64,
    last_post_id: i64,
    last_comment_id: i64,
}

impl Tables {
    fn comment_row(&self, comment: &Comment) -> Option<CommentRow> {
        // Inner join: comments whose author vanished are skipped.
        let author = self.users.get(&comment.author_id)?;
        Some(CommentRow {
            id: comment.id,
            post_id: comment.post_id,
            parent_comment_id: comment.parent_comment_id,
            author_id: comment.author_id,
            author_username: author.username.clone(),
            author_display_name: author.display_name.clone(),
            text: comment.text.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }

    fn post_row(&self, post: &Post) -> Option<PostRow> {
        let author = self.users.get(&post.author_id)?;
        Some(PostRow {
            id: post.id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            summary: post.summary.clone(),
            body: post.body.clone(),
            featured_image_url: post.featured_image_url.clone(),
            author_id: post.author_id,
            author_username: author.username.clone(),
            author_display_name: author.display_name.clone(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }

    fn slug_in_use(&self, slug: &str, except: Option<i64>) -> bool {
        self.posts
            .values()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

fn take_count(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn find_top_level(
        &self,
        post_id: i64,
        before_id: Option<i64>,
        limit: i64,
    ) -> RepositoryResult<Vec<CommentRow>> {
        let tables = self.tables.read().await;
        let upper = before_id.unwrap_or(i64::MAX);

        Ok(tables
            .comments
            .range(..upper)
            .rev()
            .map(|(_, c)| c)
            .filter(|c| c.post_id == post_id && c.parent_comment_id.is_none())
            .filter_map(|c| tables.comment_row(c))
            .take(take_count(limit))
            .collect())
    }

    async fn find_replies(
        &self,
        parent_comment_id: i64,
        after_id: Option<i64>,
        limit: i64,
    ) -> RepositoryResult<Vec<CommentRow>> {
        let tables = self.tables.read().await;

        let rows = match after_id {
            Some(after) if after == i64::MAX => Vec::new(),
            _ => {
                let lower = after_id.map_or(i64::MIN, |after| after + 1);
                tables
                    .comments
                    .range(lower..)
                    .map(|(_, c)| c)
                    .filter(|c| c.parent_comment_id == Some(parent_comment_id))
                    .filter_map(|c| tables.comment_row(c))
                    .take(take_count(limit))
                    .collect()
            }
        };

        Ok(rows)
    }

    async fn count_replies(&self, parent_comment_id: i64) -> RepositoryResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .comments
            .values()
            .filter(|c| c.parent_comment_id == Some(parent_comment_id))
            .count();

        Ok(count as i64)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn find_row_by_id(&self, id: i64) -> RepositoryResult<Option<CommentRow>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.get(&id).and_then(|c| tables.comment_row(c)))
    }

    async fn insert(&self, comment: NewComment) -> RepositoryResult<Comment> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let inserted = Comment {
            id: next_id(&mut tables.last_comment_id),
            post_id: comment.post_id,
            parent_comment_id: comment.parent_comment_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(inserted.id, inserted.clone());

        Ok(inserted)
    }

    async fn update_text(&self, id: i64, text: &str) -> RepositoryResult<Option<Comment>> {
        let mut tables = self.tables.write().await;

        Ok(tables.comments.get_mut(&id).map(|c| {
            c.text = text.to_string();
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<bool> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }

    async fn delete_children_of(&self, parent_ids: &[i64]) -> RepositoryResult<Vec<i64>> {
        let mut tables = self.tables.write().await;
        let doomed: Vec<i64> = tables
            .comments
            .values()
            .filter(|c| {
                c.parent_comment_id
                    .is_some_and(|parent| parent_ids.contains(&parent))
            })
            .map(|c| c.id)
            .collect();

        for id in &doomed {
            tables.comments.remove(id);
        }

        Ok(doomed)
    }

    async fn delete_for_post(&self, post_id: i64) -> RepositoryResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|_, c| c.post_id != post_id);

        Ok((before - tables.comments.len()) as u64)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn list(
        &self,
        author_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<PostRow>> {
        let tables = self.tables.read().await;

        Ok(tables
            .posts
            .values()
            .rev()
            .filter(|p| author_id.is_none_or(|author| p.author_id == author))
            .filter_map(|p| tables.post_row(p))
            .skip(take_count(offset))
            .take(take_count(limit))
            .collect())
    }

    async fn count(&self, author_id: Option<i64>) -> RepositoryResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .posts
            .values()
            .filter(|p| author_id.is_none_or(|author| p.author_id == author))
            .count();

        Ok(count as i64)
    }

    async fn slugs(&self) -> RepositoryResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.values().rev().map(|p| p.slug.clone()).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<PostRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .find(|p| p.slug == slug)
            .and_then(|p| tables.post_row(p)))
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn find_row_by_id(&self, id: i64) -> RepositoryResult<Option<PostRow>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).and_then(|p| tables.post_row(p)))
    }

    async fn insert(&self, author_id: i64, content: PostContent) -> RepositoryResult<Post> {
        let mut tables = self.tables.write().await;
        if tables.slug_in_use(&content.slug, None) {
            return Err(RepositoryError::Conflict(format!(
                "Slug '{}' is already taken. Please choose a different one.",
                content.slug
            )));
        }

        let now = Utc::now();
        let post = Post {
            id: next_id(&mut tables.last_post_id),
            slug: content.slug,
            title: content.title,
            summary: content.summary,
            body: content.body,
            featured_image_url: content.featured_image_url,
            author_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());

        Ok(post)
    }

    async fn update(&self, id: i64, content: PostContent) -> RepositoryResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&id) {
            return Ok(None);
        }
        if tables.slug_in_use(&content.slug, Some(id)) {
            return Err(RepositoryError::Conflict(format!(
                "Slug '{}' is already taken. Please choose a different one.",
                content.slug
            )));
        }

        Ok(tables.posts.get_mut(&id).map(|post| {
            post.slug = content.slug;
            post.title = content.title;
            post.summary = content.summary;
            post.body = content.body;
            if content.featured_image_url.is_some() {
                post.featured_image_url = content.featured_image_url;
            }
            post.updated_at = Utc::now();
            post.clone()
        }))
    }

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<bool> {
        Ok(self.tables.write().await.posts.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: NewUser) -> RepositoryResult<User> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(RepositoryError::Conflict(
                "Username or email already taken".to_string(),
            ));
        }

        let now = Utc::now();
        let inserted = User {
            id: next_id(&mut tables.last_user_id),
            username: user.username,
            email: user.email,
            display_name: None,
            about: None,
            password: user.password,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(inserted.id, inserted.clone());

        Ok(inserted)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> RepositoryResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if let Some(username) = &update.username {
            let taken = tables
                .users
                .values()
                .any(|u| &u.username == username && u.id != id);
            if taken {
                return Err(RepositoryError::Conflict(format!(
                    "Username '{}' already taken",
                    username
                )));
            }
        }

        Ok(tables.users.get_mut(&id).map(|user| {
            if let Some(username) = update.username {
                user.username = username;
            }
            if let Some(display_name) = update.display_name {
                user.display_name = Some(display_name);
            }
            if let Some(about) = update.about {
                user.about = Some(about);
            }
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}
