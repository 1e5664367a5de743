use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::post::{Post, PostContent, PostListParams, PostPage, PostRequest, PostResponse},
    repository::PostRepository,
    state::{DynCommentRepository, DynPostRepository},
    utils::{html::sanitize_post_body, jwt::Claims},
};

pub const POSTS_PAGE_SIZE: i64 = 6;

fn post_not_found() -> AppError {
    AppError::NotFound("Blog post not found".to_string())
}

impl From<PostRequest> for PostContent {
    fn from(req: PostRequest) -> Self {
        Self {
            slug: req.slug,
            title: req.title,
            summary: req.summary,
            body: sanitize_post_body(&req.body),
            featured_image_url: req.featured_image_url,
        }
    }
}

async fn expanded(posts: &dyn PostRepository, id: i64) -> Result<PostResponse, AppError> {
    posts
        .find_row_by_id(id)
        .await?
        .map(PostResponse::from)
        .ok_or_else(post_not_found)
}

/// Loads a post and checks that `claims` belong to its author.
async fn owned_post(posts: &dyn PostRepository, id: i64, claims: &Claims) -> Result<Post, AppError> {
    let post = posts.find_by_id(id).await?.ok_or_else(post_not_found)?;

    if post.author_id != claims.user_id()? {
        return Err(AppError::Unauthorized(
            "You are not the author of this post".to_string(),
        ));
    }

    Ok(post)
}

/// List posts, newest first, optionally filtered by author.
/// The page query and the total count run concurrently.
pub async fn list_posts(
    State(posts): State<DynPostRepository>,
    params: Result<Query<PostListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let page = params.page.unwrap_or(1);
    let offset = Some(page)
        .filter(|page| *page >= 1)
        .and_then(|page| (page - 1).checked_mul(POSTS_PAGE_SIZE))
        .ok_or_else(|| AppError::BadRequest("The page number is not valid".to_string()))?;

    let (rows, total) = tokio::try_join!(
        posts.list(params.author_id, offset, POSTS_PAGE_SIZE),
        posts.count(params.author_id),
    )?;

    Ok(Json(PostPage {
        posts: rows.into_iter().map(PostResponse::from).collect(),
        page,
        total_pages: (total + POSTS_PAGE_SIZE - 1) / POSTS_PAGE_SIZE,
    }))
}

pub async fn list_slugs(
    State(posts): State<DynPostRepository>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(posts.slugs().await?))
}

pub async fn get_post_by_slug(
    State(posts): State<DynPostRepository>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post = posts
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog post not found for this slug".to_string()))?;

    Ok(Json(PostResponse::from(post)))
}

/// Create a new post. The body is sanitized before it is stored.
pub async fn create_post(
    State(posts): State<DynPostRepository>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let post = posts.insert(claims.user_id()?, payload.into()).await?;
    tracing::info!(post_id = post.id, "Post created: {}", post.slug);

    Ok((StatusCode::CREATED, Json(expanded(posts.as_ref(), post.id).await?)))
}

/// Replace a post's content. Requires: Login + Author.
/// A missing `featuredImageUrl` keeps the current image.
pub async fn update_post(
    State(posts): State<DynPostRepository>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<PostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    owned_post(posts.as_ref(), id, &claims).await?;

    posts
        .update(id, payload.into())
        .await?
        .ok_or_else(post_not_found)?;

    Ok(Json(expanded(posts.as_ref(), id).await?))
}

/// Delete a post and its comments. Requires: Login + Author.
pub async fn delete_post(
    State(posts): State<DynPostRepository>,
    State(comments): State<DynCommentRepository>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = owned_post(posts.as_ref(), id, &claims).await?;

    if !posts.delete_by_id(id).await? {
        return Err(post_not_found());
    }
    let removed = comments.delete_for_post(id).await?;

    tracing::info!(post_id = id, comments = removed, "Post deleted: {}", post.slug);

    Ok(StatusCode::NO_CONTENT)
}
