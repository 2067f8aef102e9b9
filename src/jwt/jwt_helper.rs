// src/jwt/jwt_helper.rs
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::Result as JwtResult, DecodingKey, EncodingKey, Header, Validation,
};

use crate::errors::ApiError;
use crate::jwt::claims::Claims;

/// Tokens stay valid for a year; the cookie is the only thing that can
/// end a session earlier.
pub const TOKEN_VALIDITY_DAYS: i64 = 365;

pub fn create_token(email: &str, secret: &[u8]) -> JwtResult<String> {
    let claims = Claims {
        email: email.to_string(),
        exp: (Utc::now() + Duration::days(TOKEN_VALIDITY_DAYS)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Checks signature and expiry. Absent, malformed, tampered and expired
/// tokens all collapse into `Unauthorized`.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}
