use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::{ApiResult, no_content};
use crate::error::LeafError;
use crate::middleware::auth::{ApiCaller, ValidJson};
use crate::router::LeafState;
use crate::types::NewCollection;
use crate::validation::{FieldError, Validate};

/// Update payload; owner and plant list are managed by the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionUpdate {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
}

pub async fn get_all(State(state): State<LeafState>, _caller: ApiCaller) -> ApiResult {
    Ok(Json(state.db.collections.get_all().await?).into_response())
}

pub async fn get_by_id(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(collection_id): Path<String>,
) -> ApiResult {
    let collection = state
        .db
        .collections
        .get_by_id(&collection_id)
        .await?
        .ok_or(LeafError::NotFound("no collection with this id"))?;
    Ok(Json(collection).into_response())
}

pub async fn get_all_for_user(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(user_id): Path<String>,
) -> ApiResult {
    Ok(Json(state.db.collections.get_all_for_user(&user_id).await?).into_response())
}

pub async fn create_for_user(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(user_id): Path<String>,
    ValidJson(new_collection): ValidJson<NewCollection>,
) -> ApiResult {
    new_collection.check().map_err(LeafError::Validation)?;
    let collection = state
        .db
        .collections
        .create_for_user(&user_id, new_collection)
        .await?
        .ok_or(LeafError::NotFound("no user with this id"))?;
    Ok((StatusCode::CREATED, Json(collection)).into_response())
}

pub async fn update(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    ValidJson(payload): ValidJson<CollectionUpdate>,
) -> ApiResult {
    let mut errors = NewCollection {
        name: payload.name.clone(),
        description: payload.description.clone(),
    }
    .validate();
    if payload.id.trim().is_empty() {
        errors.insert(0, FieldError::new("_id", "\"_id\" is not allowed to be empty"));
    }
    if !errors.is_empty() {
        return Err(LeafError::Validation(errors));
    }

    let mut collection = state
        .db
        .collections
        .get_by_id(&payload.id)
        .await?
        .ok_or(LeafError::NotFound("no collection with this id"))?;
    collection.name = payload.name;
    collection.description = payload.description;
    if payload.image_url.is_some() {
        collection.image_url = payload.image_url;
    }
    let collection = state
        .db
        .collections
        .update(collection)
        .await?
        .ok_or(LeafError::NotFound("no collection with this id"))?;
    Ok(Json(collection).into_response())
}

pub async fn delete_one(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(collection_id): Path<String>,
) -> ApiResult {
    state
        .db
        .collections
        .delete_by_id(&collection_id)
        .await?
        .ok_or(LeafError::NotFound("no collection with this id"))?;
    Ok(no_content())
}

pub async fn delete_all(State(state): State<LeafState>, _caller: ApiCaller) -> ApiResult {
    state.db.collections.delete_all().await?;
    Ok(no_content())
}

pub async fn add_plant(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path((collection_id, plant_id)): Path<(String, String)>,
) -> ApiResult {
    let collection = state
        .db
        .collections
        .add_plant_to_collection(&collection_id, &plant_id)
        .await?
        .ok_or(LeafError::NotFound("no collection or plant with this id"))?;
    Ok((StatusCode::CREATED, Json(collection)).into_response())
}

pub async fn delete_plant(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path((collection_id, plant_id)): Path<(String, String)>,
) -> ApiResult {
    state
        .db
        .collections
        .delete_plant_from_collection(&collection_id, &plant_id)
        .await?
        .ok_or(LeafError::NotFound("no collection or plant with this id"))?;
    Ok(no_content())
}

pub async fn plants(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(collection_id): Path<String>,
) -> ApiResult {
    let plants = state
        .db
        .collections
        .get_all_plants_for_collection(&collection_id)
        .await?
        .ok_or(LeafError::NotFound("no collection with this id"))?;
    Ok(Json(plants).into_response())
}
