use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Public id (`uuid`) of the user the token was issued to.
    pub sub: Uuid,
    pub email: String,
    /// Expiration timestamp (seconds since epoch) for the token.
    pub exp: usize,
    pub iat: usize,
    /// Makes every issued token distinct, even two issued in the same second.
    pub jti: Uuid,
}

fn sign(user: &User, secret: &str, expiry_secs: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::seconds(expiry_secs))
        .ok_or_else(|| AppError::InternalServerError("Token expiry overflow".into()))?;

    let claims = Claims {
        sub: user.uuid,
        email: user.email.clone(),
        exp: expiration.timestamp() as usize,
        iat: now.timestamp() as usize,
        jti: Uuid::new_v4(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

fn verify(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Short-lived token sent on every authenticated request.
pub fn generate_access_token(user: &User, config: &Config) -> Result<String, AppError> {
    sign(
        user,
        &config.access_token_secret,
        config.access_token_expiry_secs,
    )
}

/// Long-lived token exchanged at `/users/refresh-token` for a new pair.
pub fn generate_refresh_token(user: &User, config: &Config) -> Result<String, AppError> {
    sign(
        user,
        &config.refresh_token_secret,
        config.refresh_token_expiry_secs,
    )
}

pub fn verify_access_token(token: &str, config: &Config) -> Result<Claims, AppError> {
    verify(token, &config.access_token_secret)
}

pub fn verify_refresh_token(token: &str, config: &Config) -> Result<Claims, AppError> {
    verify(token, &config.refresh_token_secret)
}
