//! Request authentication: the session cookie for the website and bearer
//! tokens for the JSON API.

use axum::extract::{
    FromRequest, FromRequestParts, OptionalFromRequestParts, Request, rejection::JsonRejection,
};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::TypedHeader;
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use headers::{Authorization, authorization::Bearer};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::LeafError;
use crate::handlers::WebError;
use crate::middleware::jwt::decode_token;
use crate::router::LeafState;
use crate::types::{Credential, User};
use crate::validation::FieldError;

/// Cookie and token settings shared by the extractors.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub cookie_name: String,
    pub secure_cookie: bool,
    pub jwt_secret: String,
}

/// Derive the private cookie key from the configured password.
///
/// The key needs 64 bytes of material; the password is repeated to fill it.
pub fn cookie_key(password: &str) -> Key {
    if password.is_empty() {
        warn!("COOKIE_PASSWORD is empty, sessions will not survive a restart");
        return Key::generate();
    }
    if password.len() < 32 {
        warn!(len = password.len(), "COOKIE_PASSWORD is shorter than 32 bytes");
    }
    let material: Vec<u8> = password.bytes().cycle().take(64).collect();
    Key::from(material.as_slice())
}

/// Plaintext comparison in constant time.
pub fn password_matches(stored: &str, given: &str) -> bool {
    stored.as_bytes().ct_eq(given.as_bytes()).into()
}

pub fn session_cookie(settings: &AuthSettings, user_id: String) -> Cookie<'static> {
    Cookie::build((settings.cookie_name.clone(), user_id))
        .path("/")
        .http_only(true)
        .secure(settings.secure_cookie)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(1))
        .build()
}

pub fn clear_session(jar: PrivateCookieJar, settings: &AuthSettings) -> PrivateCookieJar {
    jar.remove(Cookie::build((settings.cookie_name.clone(), "")).path("/"))
}

/// Logged-in website user. Without a valid session the request is sent to `/`.
#[derive(Debug, Clone)]
pub struct Session(pub User);

impl Session {
    pub fn credential(&self) -> Credential {
        Credential::from(&self.0)
    }
}

impl FromRequestParts<LeafState> for Session {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &LeafState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let Some(cookie) = jar.get(&state.auth.cookie_name) else {
            return Err(Redirect::to("/").into_response());
        };
        match state.db.users.get_by_id(cookie.value()).await {
            Ok(Some(user)) => Ok(Session(user)),
            Ok(None) => {
                debug!(user_id = %cookie.value(), "session for a deleted user");
                Err(Redirect::to("/").into_response())
            }
            Err(e) => Err(WebError::from(e).into_response()),
        }
    }
}

/// Pages open to everyone still show who is logged in.
impl OptionalFromRequestParts<LeafState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &LeafState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(<Session as FromRequestParts<LeafState>>::from_request_parts(parts, state)
            .await
            .ok())
    }
}

/// Website user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminSession(pub User);

impl FromRequestParts<LeafState> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &LeafState,
    ) -> Result<Self, Self::Rejection> {
        let Session(user) =
            <Session as FromRequestParts<LeafState>>::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(user_id = %user.id, "non-admin tried an admin page");
            return Err(WebError::from(LeafError::Forbidden("admin only")).into_response());
        }
        Ok(AdminSession(user))
    }
}

/// Caller of the JSON API, resolved from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct ApiCaller(pub Credential);

impl FromRequestParts<LeafState> for ApiCaller {
    type Rejection = LeafError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &LeafState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            <TypedHeader<Authorization<Bearer>> as FromRequestParts<LeafState>>::from_request_parts(
                parts, state,
            )
            .await
            .map_err(|_| LeafError::Unauthorized("missing bearer token"))?;
        let claims = decode_token(bearer.token(), &state.auth.jwt_secret)?;
        let user = state
            .db
            .users
            .get_by_id(&claims.id)
            .await?
            .ok_or(LeafError::Unauthorized("token user no longer exists"))?;
        Ok(ApiCaller(Credential::from(&user)))
    }
}

/// `Json<T>` whose rejections become 400 validation errors.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = LeafError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(LeafError::Validation(vec![FieldError::new(
                "body",
                json_rejection_message(&rejection),
            )])),
        }
    }
}

fn json_rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "expected a JSON body".to_string(),
        other => other.body_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_still_yield_a_key() {
        let a = cookie_key("short");
        let b = cookie_key("short");
        assert_eq!(a.master(), b.master());
    }

    #[test]
    fn password_compare() {
        assert!(password_matches("Bazinga!", "Bazinga!"));
        assert!(!password_matches("Bazinga!", "bazinga!"));
        assert!(!password_matches("Bazinga!", "Bazinga"));
    }
}
