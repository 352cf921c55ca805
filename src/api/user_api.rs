use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::info;

use crate::api::{ApiResult, no_content};
use crate::error::LeafError;
use crate::middleware::auth::{ApiCaller, ValidJson, password_matches};
use crate::middleware::jwt::create_token;
use crate::router::LeafState;
use crate::types::{NewUser, User, UserCredentials};
use crate::validation::{FieldError, Validate};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub name: String,
    pub token: String,
    #[serde(rename = "_id")]
    pub id: String,
}

pub async fn create(State(state): State<LeafState>, ValidJson(new_user): ValidJson<NewUser>) -> ApiResult {
    let mut errors = new_user.validate();
    if errors.is_empty() && state.db.users.get_by_email(&new_user.email).await?.is_some() {
        errors.push(FieldError::new("email", "\"email\" is already registered"));
    }
    if !errors.is_empty() {
        return Err(LeafError::Validation(errors));
    }
    let user = state.db.users.create(new_user).await?;
    info!(user_id = %user.id, "user created via api");
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub async fn authenticate(
    State(state): State<LeafState>,
    ValidJson(credentials): ValidJson<UserCredentials>,
) -> ApiResult {
    credentials.check().map_err(LeafError::Validation)?;
    let user = state
        .db
        .users
        .get_by_email(&credentials.email)
        .await?
        .ok_or(LeafError::Unauthorized("user not found"))?;
    if !password_matches(&user.password, &credentials.password) {
        return Err(LeafError::Unauthorized("invalid password"));
    }
    let token = create_token(&user, &state.auth.jwt_secret)?;
    let body = AuthResponse {
        success: true,
        name: user.full_name(),
        token,
        id: user.id,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn get_all(State(state): State<LeafState>, _caller: ApiCaller) -> ApiResult {
    Ok(Json(state.db.users.get_all().await?).into_response())
}

pub async fn get_by_id(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(user_id): Path<String>,
) -> ApiResult {
    let user = state
        .db
        .users
        .get_by_id(&user_id)
        .await?
        .ok_or(LeafError::NotFound("no user with this id"))?;
    Ok(Json(user).into_response())
}

pub async fn get_by_email(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(email): Path<String>,
) -> ApiResult {
    let user = state
        .db
        .users
        .get_by_email(&email)
        .await?
        .ok_or(LeafError::NotFound("no user with this email"))?;
    Ok(Json(user).into_response())
}

pub async fn update(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    ValidJson(user): ValidJson<User>,
) -> ApiResult {
    let mut errors = user.validate();
    if errors.is_empty()
        && let Some(other) = state.db.users.get_by_email(&user.email).await?
        && other.id != user.id
    {
        errors.push(FieldError::new("email", "\"email\" is already registered"));
    }
    if !errors.is_empty() {
        return Err(LeafError::Validation(errors));
    }
    let user = state
        .db
        .users
        .update(user)
        .await?
        .ok_or(LeafError::NotFound("no user with this id"))?;
    Ok(Json(user).into_response())
}

pub async fn delete_one(
    State(state): State<LeafState>,
    ApiCaller(caller): ApiCaller,
    Path(user_id): Path<String>,
) -> ApiResult {
    state
        .db
        .users
        .delete_by_id(&user_id)
        .await?
        .ok_or(LeafError::NotFound("no user with this id"))?;
    info!(%user_id, caller = %caller.id, "user deleted via api");
    Ok(no_content())
}

pub async fn delete_all(State(state): State<LeafState>, ApiCaller(caller): ApiCaller) -> ApiResult {
    let users = state.db.users.delete_all().await?;
    info!(count = users.len(), caller = %caller.id, "all users deleted via api");
    Ok(no_content())
}
