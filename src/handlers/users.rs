use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError, models::user::UpdateUserRequest, state::DynUserRepository,
    utils::jwt::Claims,
};

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// The currently authenticated user.
pub async fn get_me(
    State(users): State<DynUserRepository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users
        .find_by_id(claims.user_id()?)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

pub async fn get_by_username(
    State(users): State<DynUserRepository>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = users
        .find_by_username(&username)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// Updates username, display name and/or about text of the current user.
pub async fn update_me(
    State(users): State<DynUserRepository>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = users
        .update_profile(claims.user_id()?, payload.into())
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}
