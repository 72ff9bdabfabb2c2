pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

pub use extractors::{AuthenticatedUser, MaybeUser};
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{
    generate_access_token, generate_refresh_token, verify_access_token, verify_refresh_token,
    Claims,
};

use crate::models::UserDto;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Lifetime of an email-verification token, in minutes.
pub const VERIFY_EMAIL_TOKEN_TTL_MINUTES: i64 = 20;

lazy_static! {
    // Letters, spaces, apostrophes, dots and hyphens.
    static ref NAME_REGEX: regex::Regex = regex::Regex::new(r"^[\p{L} .'-]+$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 100),
        regex(path = "NAME_REGEX", message = "Name contains invalid characters")
    )]
    pub name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Body of `POST /users/refresh-token` when the cookie is not sent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response data of a successful login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserDto,
    pub access_token: String,
    pub refresh_token: String,
}

/// Hex sha256 digest under which one-time tokens are stored.
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// A fresh random token: the raw value to hand out and the digest to store.
pub fn generate_temporary_token() -> (String, String) {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    let hashed = hash_token(&raw);
    (raw, hashed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_login_request_validation() {
        let valid_login = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid_login.validate().is_ok());

        let invalid_email_login = LoginRequest {
            email: "testexample.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(invalid_email_login.validate().is_err());

        let empty_password_login = LoginRequest {
            email: "test@example.com".to_string(),
            password: String::new(),
        };
        assert!(empty_password_login.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let valid_register = RegisterRequest {
            name: Some("Mary-Jane O'Neil".to_string()),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid_register.validate().is_ok());

        let nameless = RegisterRequest {
            name: None,
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(nameless.validate().is_ok());

        let invalid_name = RegisterRequest {
            name: Some("drop table;".to_string()),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(invalid_name.validate().is_err());
    }

    #[test]
    fn test_temporary_token_digest() {
        let (raw, hashed) = generate_temporary_token();
        assert_eq!(raw.len(), 40);
        assert_eq!(hashed.len(), 64);
        assert_eq!(hash_token(&raw), hashed);
        assert_ne!(raw, hashed);
    }
}
