//! HTML controllers for the website.

pub mod account;
pub mod admin;
pub mod collection;
pub mod garden;
pub mod plant;
pub mod profile;
pub mod views;

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::{error, warn};

use crate::error::LeafError;

/// Field name the upload forms use for the file input.
pub const IMAGE_FIELD: &str = "imageFile";

pub type WebResult = Result<Response, WebError>;

/// `LeafError` rendered as a small HTML page instead of JSON.
#[derive(Debug)]
pub struct WebError(pub LeafError);

impl From<LeafError> for WebError {
    fn from(err: LeafError) -> Self {
        WebError(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let message = match &self.0 {
            LeafError::NotFound(msg) | LeafError::Unauthorized(msg) => msg.to_string(),
            LeafError::Forbidden(msg) => format!("access denied: {msg}"),
            LeafError::Validation(_) | LeafError::Multipart(_) => self.0.to_string(),
            e if e.is_store_failure() => {
                error!(error = %e, "store failure");
                "database error".to_string()
            }
            e => {
                warn!(error = %e, "request failed");
                "something went wrong".to_string()
            }
        };
        let body = format!(
            "<!DOCTYPE html><html><head><title>Leaf Library</title>\
             <link rel=\"stylesheet\" href=\"/public/style.css\"></head>\
             <body><main><h1>{}</h1><p>{}</p><p><a href=\"/\">Leaf Library</a></p></main></body></html>",
            status,
            tera::escape_html(&message)
        );
        (status, Html(body)).into_response()
    }
}

/// Form re-rendered after a validation failure.
pub fn bad_request(html: Html<String>) -> Response {
    (StatusCode::BAD_REQUEST, html).into_response()
}

/// Pull the uploaded image out of a multipart body.
/// Returns `None` when the form was sent without a file.
pub async fn read_image(mut multipart: Multipart) -> Result<Option<(Vec<u8>, String)>, LeafError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("image").to_string();
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some((bytes.to_vec(), filename)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldError;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn error_page_escapes_the_message() {
        let err = LeafError::Validation(vec![FieldError::new("name", "<b>bold</b> & \"quoted\"")]);
        let resp = WebError(err).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("&lt;b&gt;bold&lt;&#x2F;b&gt; &amp; &quot;quoted&quot;"));
        assert!(!html.contains("<b>"));
    }
}
