//! JSON API handlers, authenticated with bearer tokens.

pub mod collection_api;
pub mod plant_api;
pub mod user_api;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::LeafError;

pub type ApiResult = Result<Response, LeafError>;

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
