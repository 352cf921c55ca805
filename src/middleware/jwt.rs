//! HS256 bearer tokens for the JSON API.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::LeafError;
use crate::types::User;

pub const TOKEN_LIFETIME_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub scope: Vec<String>,
    pub exp: i64,
}

pub fn create_token(user: &User, secret: &str) -> Result<String, LeafError> {
    let claims = Claims {
        id: user.id.clone(),
        email: user.email.clone(),
        scope: Vec::new(),
        exp: (Utc::now() + Duration::seconds(TOKEN_LIFETIME_SECS)).timestamp(),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, LeafError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}
