// src/services/auth_guard.rs
use rocket::http::{Cookie, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::jwt::jwt_helper;

pub const TOKEN_COOKIE: &str = "token";

/// Request guard for routes that require a valid session. A route taking
/// `AuthUser` never runs without a verified token; the decoded email is the
/// caller's identity for any further ownership checks.
pub struct AuthUser {
    pub email: String,
}

impl AuthUser {
    /// Owner-scoped routes carry the target email in the path. Authentication
    /// alone is not enough there: the caller must *be* that user.
    pub fn require_owner(&self, email: &str) -> Result<(), ApiError> {
        if self.email != email {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match request.rocket().state::<AppConfig>() {
            Some(config) => config,
            None => {
                return Outcome::Error((
                    Status::InternalServerError,
                    ApiError::InvalidParameter("missing app config".to_string()),
                ))
            }
        };

        let token = match request.cookies().get(TOKEN_COOKIE) {
            Some(cookie) => cookie.value(),
            None => return Outcome::Error((Status::Unauthorized, ApiError::Unauthorized)),
        };

        match jwt_helper::verify_token(token, config.access_token_secret.as_bytes()) {
            Ok(claims) => Outcome::Success(AuthUser {
                email: claims.email,
            }),
            Err(_) => Outcome::Error((Status::Unauthorized, ApiError::Unauthorized)),
        }
    }
}

/// Session cookie for a freshly issued token. In production the frontend is
/// served from a different origin, so the cookie must be Secure and allowed
/// cross-site; locally it stays same-site and plain HTTP.
pub fn session_cookie(token: String, production: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .secure(production)
        .same_site(if production {
            SameSite::None
        } else {
            SameSite::Strict
        })
        .path("/")
        .build()
}

/// Matching removal cookie for logout.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE).path("/").build()
}
