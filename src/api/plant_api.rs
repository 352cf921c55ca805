use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::{ApiResult, no_content};
use crate::error::LeafError;
use crate::middleware::auth::{ApiCaller, ValidJson};
use crate::router::LeafState;
use crate::types::{Biome, NewPlant, PlantType};
use crate::validation::{FieldError, Validate};

/// Update payload. Owner and date are never taken from the client;
/// omitted `imageUrls` keep the stored list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantUpdate {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    pub common_name: String,
    pub scientific_name: String,
    #[serde(rename = "type")]
    pub plant_type: PlantType,
    pub biome: Biome,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub note: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl PlantUpdate {
    fn split(self) -> (String, Option<Vec<String>>, NewPlant) {
        let fields = NewPlant {
            common_name: self.common_name,
            scientific_name: self.scientific_name,
            plant_type: self.plant_type,
            biome: self.biome,
            image_urls: Vec::new(),
            note: self.note,
            latitude: self.latitude,
            longitude: self.longitude,
        };
        (self.id, self.image_urls, fields)
    }
}

pub async fn get_all(State(state): State<LeafState>, _caller: ApiCaller) -> ApiResult {
    Ok(Json(state.db.plants.get_all().await?).into_response())
}

pub async fn get_by_id(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(plant_id): Path<String>,
) -> ApiResult {
    let plant = state
        .db
        .plants
        .get_by_id(&plant_id)
        .await?
        .ok_or(LeafError::NotFound("no plant with this id"))?;
    Ok(Json(plant).into_response())
}

pub async fn get_all_for_user(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(user_id): Path<String>,
) -> ApiResult {
    Ok(Json(state.db.plants.get_all_for_user(&user_id).await?).into_response())
}

pub async fn create_for_user(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(user_id): Path<String>,
    ValidJson(new_plant): ValidJson<NewPlant>,
) -> ApiResult {
    new_plant.check().map_err(LeafError::Validation)?;
    let plant = state
        .db
        .plants
        .create_for_user(&user_id, new_plant)
        .await?
        .ok_or(LeafError::NotFound("no user with this id"))?;
    Ok((StatusCode::CREATED, Json(plant)).into_response())
}

pub async fn update(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    ValidJson(payload): ValidJson<PlantUpdate>,
) -> ApiResult {
    let (plant_id, image_urls, fields) = payload.split();
    let mut errors = fields.validate();
    if plant_id.trim().is_empty() {
        errors.insert(0, FieldError::new("_id", "\"_id\" is not allowed to be empty"));
    }
    if !errors.is_empty() {
        return Err(LeafError::Validation(errors));
    }

    let mut plant = state
        .db
        .plants
        .get_by_id(&plant_id)
        .await?
        .ok_or(LeafError::NotFound("no plant with this id"))?;
    plant.apply(fields);
    if let Some(image_urls) = image_urls {
        plant.image_urls = image_urls;
    }
    let plant = state
        .db
        .plants
        .update(plant)
        .await?
        .ok_or(LeafError::NotFound("no plant with this id"))?;
    Ok(Json(plant).into_response())
}

pub async fn delete_one(
    State(state): State<LeafState>,
    _caller: ApiCaller,
    Path(plant_id): Path<String>,
) -> ApiResult {
    state
        .db
        .plants
        .delete_by_id(&plant_id)
        .await?
        .ok_or(LeafError::NotFound("no plant with this id"))?;
    Ok(no_content())
}

pub async fn delete_all(State(state): State<LeafState>, _caller: ApiCaller) -> ApiResult {
    state.db.plants.delete_all().await?;
    Ok(no_content())
}
