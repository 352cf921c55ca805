use axum::Router;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{delete, get, post, put};
use axum_extra::extract::cookie::Key;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::{collection_api, plant_api, user_api};
use crate::config::Config;
use crate::db::Database;
use crate::error::LeafError;
use crate::handlers::views::Views;
use crate::handlers::{account, admin, collection, garden, plant, profile};
use crate::middleware::auth::{AuthSettings, cookie_key};
use crate::service::image_store::ImageStore;

/// Largest accepted image upload.
pub const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct LeafState {
    pub db: Database,
    pub images: Arc<dyn ImageStore>,
    pub views: Arc<Views>,
    pub auth: Arc<AuthSettings>,
    pub cookie_key: Key,
    pub public_dir: PathBuf,
    pub upload_dir: PathBuf,
}

impl LeafState {
    pub fn new(db: Database, images: Arc<dyn ImageStore>, cfg: &Config) -> Result<Self, LeafError> {
        Ok(Self {
            db,
            images,
            views: Arc::new(Views::new()?),
            auth: Arc::new(AuthSettings {
                cookie_name: cfg.cookie_name.clone(),
                secure_cookie: !cfg.insecure_cookie,
                jwt_secret: cfg.cookie_password.clone(),
            }),
            cookie_key: cookie_key(&cfg.cookie_password),
            public_dir: cfg.public_dir.clone(),
            upload_dir: cfg.upload_dir.clone(),
        })
    }
}

impl FromRef<LeafState> for Key {
    fn from_ref(state: &LeafState) -> Self {
        state.cookie_key.clone()
    }
}

fn web_routes() -> Router<LeafState> {
    let upload_limit = DefaultBodyLimit::max(UPLOAD_LIMIT);
    Router::new()
        .route("/", get(account::index))
        .route("/signup", get(account::signup_form).post(account::signup))
        .route("/login", get(account::login_form).post(account::login))
        .route("/logout", get(account::logout))
        .route("/garden", get(garden::index))
        .route("/garden/addPlant", post(garden::add_plant))
        .route("/plant/{id}", get(plant::index))
        .route("/plant/{id}/delete", get(plant::delete))
        .route("/plant/{id}/update", post(plant::update))
        .route(
            "/plant/{id}/uploadImage",
            post(plant::upload_image).layer(upload_limit.clone()),
        )
        .route("/plant/{id}/deleteImage/{url}", get(plant::delete_image))
        .route("/collections", get(collection::index))
        .route("/collections/addCollection", post(collection::add_collection))
        .route("/collection/{id}", get(collection::show))
        .route("/collection/{id}/delete", get(collection::delete))
        .route("/collection/{id}/update", post(collection::update))
        .route("/collection/{id}/addPlant/{plant_id}", get(collection::add_plant))
        .route(
            "/collection/{id}/deletePlant/{plant_id}",
            get(collection::delete_plant),
        )
        .route(
            "/collection/{id}/uploadImage",
            post(collection::upload_image).layer(upload_limit.clone()),
        )
        .route("/collection/{id}/deleteImage", get(collection::delete_image))
        .route("/admin", get(admin::index))
        .route("/admin/deleteUser/{user_id}", get(admin::delete_user))
        .route("/profile", get(profile::index))
        .route("/profile/update", post(profile::update))
        .route(
            "/profile/uploadImage",
            post(profile::upload_image).layer(upload_limit),
        )
        .route("/profile/deleteImage", get(profile::delete_image))
}

fn api_routes() -> Router<LeafState> {
    Router::new()
        .route("/api/user/create", post(user_api::create))
        .route("/api/user/authenticate", post(user_api::authenticate))
        .route("/api/user/all", get(user_api::get_all))
        .route("/api/user/byId/{user_id}", get(user_api::get_by_id))
        .route("/api/user/byEmail/{email}", get(user_api::get_by_email))
        .route("/api/user/update", put(user_api::update))
        .route("/api/user/delete/all", delete(user_api::delete_all))
        .route("/api/user/delete/{user_id}", delete(user_api::delete_one))
        .route("/api/plant/all", get(plant_api::get_all))
        .route("/api/plant/byId/{plant_id}", get(plant_api::get_by_id))
        .route("/api/plant/forUser/{user_id}", get(plant_api::get_all_for_user))
        .route("/api/plant/create/{user_id}", post(plant_api::create_for_user))
        .route("/api/plant/update", put(plant_api::update))
        .route("/api/plant/delete/all", delete(plant_api::delete_all))
        .route("/api/plant/delete/{plant_id}", delete(plant_api::delete_one))
        .route("/api/collection/all", get(collection_api::get_all))
        .route("/api/collection/byId/{id}", get(collection_api::get_by_id))
        .route(
            "/api/collection/forUser/{user_id}",
            get(collection_api::get_all_for_user),
        )
        .route(
            "/api/collection/create/{user_id}",
            post(collection_api::create_for_user),
        )
        .route("/api/collection/update", put(collection_api::update))
        .route("/api/collection/delete/all", delete(collection_api::delete_all))
        .route("/api/collection/delete/{id}", delete(collection_api::delete_one))
        .route(
            "/api/collection/{id}/addPlant/{plant_id}",
            post(collection_api::add_plant),
        )
        .route(
            "/api/collection/{id}/deletePlant/{plant_id}",
            delete(collection_api::delete_plant),
        )
        .route("/api/collection/{id}/plants", get(collection_api::plants))
}

pub fn leaf_router(state: LeafState) -> Router {
    let public = ServeDir::new(&state.public_dir);
    let uploads = ServeDir::new(&state.upload_dir);
    Router::new()
        .merge(web_routes())
        .merge(api_routes())
        .nest_service("/public", public)
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
