use axum::extract::multipart::MultipartError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::{error, warn};

use crate::validation::FieldError;

#[derive(Debug, ThisError)]
pub enum LeafError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Image host error: {0}")]
    ImageHost(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),
}

fn summarize(details: &[FieldError]) -> String {
    details
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl LeafError {
    /// Store-side failures; everything a caller surfaces as "store unavailable".
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            LeafError::DatabaseError(_)
                | LeafError::Io(_)
                | LeafError::Json(_)
                | LeafError::RactorError(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LeafError::NotFound(_) => StatusCode::NOT_FOUND,
            LeafError::Validation(_) | LeafError::Multipart(_) => StatusCode::BAD_REQUEST,
            LeafError::Unauthorized(_) | LeafError::Jwt(_) => StatusCode::UNAUTHORIZED,
            LeafError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeafError::Reqwest(_) | LeafError::ImageHost(_) => StatusCode::BAD_GATEWAY,
            LeafError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LeafError::DatabaseError(_)
            | LeafError::Io(_)
            | LeafError::Json(_)
            | LeafError::RactorError(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for LeafError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let (code, message, details) = match self {
            LeafError::NotFound(msg) => ("NOT_FOUND", msg.to_string(), Vec::new()),
            LeafError::Validation(details) => (
                "BAD_REQUEST",
                format!("validation failed: {}", summarize(&details)),
                details,
            ),
            LeafError::Multipart(e) => ("BAD_REQUEST", e.body_text(), Vec::new()),
            LeafError::Unauthorized(msg) => ("UNAUTHORIZED", msg.to_string(), Vec::new()),
            LeafError::Jwt(e) => {
                warn!(error = %e, "rejected bearer token");
                ("UNAUTHORIZED", "invalid token".to_string(), Vec::new())
            }
            LeafError::Forbidden(msg) => ("FORBIDDEN", msg.to_string(), Vec::new()),
            e @ (LeafError::Reqwest(_) | LeafError::ImageHost(_)) => {
                warn!(error = %e, "image host failure");
                (
                    "BAD_GATEWAY",
                    "Image host is unavailable.".to_string(),
                    Vec::new(),
                )
            }
            LeafError::Template(e) => {
                error!(error = %e, "template rendering failed");
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred.".to_string(),
                    Vec::new(),
                )
            }
            e @ (LeafError::DatabaseError(_)
            | LeafError::Io(_)
            | LeafError::Json(_)
            | LeafError::RactorError(_)) => {
                error!(error = %e, "store failure");
                ("STORE_UNAVAILABLE", "database error".to_string(), Vec::new())
            }
        };

        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
            details,
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: LeafError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn store_failure_is_503_with_generic_message() {
        let (status, body) = body_json(LeafError::RactorError("mailbox closed".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["message"], "database error");
    }

    #[tokio::test]
    async fn validation_lists_details() {
        let err = LeafError::Validation(vec![FieldError::new("email", "email is required")]);
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let (status, body) = body_json(LeafError::NotFound("no plant with this id")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "no plant with this id");
    }
}
