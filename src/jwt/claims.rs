// src/jwt/claims.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub email: String, // authenticated user's identity
    pub exp: usize,    // expiry, seconds since the epoch
}
