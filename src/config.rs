// src/config.rs
use std::env;

/// Process-wide configuration, read once at startup and handed to Rocket as
/// managed state. The signing secret has no default: a missing secret is a
/// misconfiguration and must abort the launch.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongo_uri: String,
    pub database: String,
    pub access_token_secret: String,
    pub production: bool,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mongo_uri = env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let database = env::var("DB_NAME").unwrap_or_else(|_| "marketplace".to_string());
        let access_token_secret =
            env::var("ACCESS_TOKEN_SECRET").expect("ACCESS_TOKEN_SECRET must be set");
        let production = env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:5173".to_string(),
                    "http://localhost:5174".to_string(),
                ]
            });

        AppConfig {
            mongo_uri,
            database,
            access_token_secret,
            production,
            allowed_origins,
        }
    }
}
