use std::env;
use std::str::FromStr;

use crate::error::AppError;

const PRODUCTION: &str = "production";

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub access_token_secret: String,
    pub access_token_expiry_secs: i64,
    pub refresh_token_secret: String,
    pub refresh_token_expiry_secs: i64,
    pub cors_origin: String,
    pub app_env: String,
    pub max_page_limit: i64,
    pub bcrypt_cost: u32,
}

fn parse<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| {
            AppError::InternalServerError(format!("{} must be a number, got '{}'", key, value))
        }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        Ok(Self {
            database_url: get("DATABASE_URL"),
            server_port: parse("SERVER_PORT", get("SERVER_PORT"), defaults.server_port)?,
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            access_token_secret: get("ACCESS_TOKEN_SECRET")
                .unwrap_or(defaults.access_token_secret),
            access_token_expiry_secs: parse(
                "ACCESS_TOKEN_EXPIRY_SECS",
                get("ACCESS_TOKEN_EXPIRY_SECS"),
                defaults.access_token_expiry_secs,
            )?,
            refresh_token_secret: get("REFRESH_TOKEN_SECRET")
                .unwrap_or(defaults.refresh_token_secret),
            refresh_token_expiry_secs: parse(
                "REFRESH_TOKEN_EXPIRY_SECS",
                get("REFRESH_TOKEN_EXPIRY_SECS"),
                defaults.refresh_token_expiry_secs,
            )?,
            cors_origin: get("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            app_env: get("APP_ENV").unwrap_or(defaults.app_env),
            max_page_limit: parse(
                "MAX_PAGE_LIMIT",
                get("MAX_PAGE_LIMIT"),
                defaults.max_page_limit,
            )?,
            bcrypt_cost: parse("BCRYPT_COST", get("BCRYPT_COST"), defaults.bcrypt_cost)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case(PRODUCTION)
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            server_port: 8080,
            server_host: "127.0.0.1".to_string(),
            access_token_secret: "access-token-secret".to_string(),
            access_token_expiry_secs: 24 * 60 * 60,
            refresh_token_secret: "refresh-token-secret".to_string(),
            refresh_token_expiry_secs: 7 * 24 * 60 * 60,
            cors_origin: "*".to_string(),
            app_env: "development".to_string(),
            max_page_limit: 100,
            bcrypt_cost: 10,
        }
    }
}
