use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{CommentListParams, CreateCommentRequest, UpdateCommentRequest},
    services::comments,
    state::DynCommentRepository,
    utils::jwt::Claims,
};

/// A page of top-level comments for a post, newest first, each with its reply count.
pub async fn list_comments(
    State(repo): State<DynCommentRepository>,
    Path(post_id): Path<i64>,
    params: Result<Query<CommentListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let page =
        comments::list_top_level_comments(repo.as_ref(), post_id, params.continue_after_id).await?;

    Ok(Json(page))
}

/// A page of replies to a comment, oldest first.
pub async fn list_replies(
    State(repo): State<DynCommentRepository>,
    Path(comment_id): Path<i64>,
    params: Result<Query<CommentListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let page = comments::list_replies(repo.as_ref(), comment_id, params.continue_after_id).await?;

    Ok(Json(page))
}

pub async fn create_comment(
    State(repo): State<DynCommentRepository>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment = comments::create_comment(
        repo.as_ref(),
        post_id,
        claims.user_id()?,
        payload.text,
        payload.parent_comment_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    State(repo): State<DynCommentRepository>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment =
        comments::update_comment(repo.as_ref(), comment_id, &payload.new_text, claims.user_id()?)
            .await?;

    Ok(Json(comment))
}

/// Deletes the comment and all of its replies. Empty 200 on success.
pub async fn delete_comment(
    State(repo): State<DynCommentRepository>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    comments::delete_comment(repo.as_ref(), comment_id, claims.user_id()?).await?;

    Ok(StatusCode::OK)
}
