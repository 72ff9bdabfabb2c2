use crate::error::AppError;
use bcrypt::{hash, verify};

/// Hashes with the configured work factor (`Config::bcrypt_cost`).
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_password_hashing_and_verification() {
        let hashed = hash_password("test_password123", 4).unwrap();

        assert!(verify_password("test_password123", &hashed).unwrap());
        assert!(!verify_password("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn test_hash_carries_configured_cost() {
        let config = Config {
            bcrypt_cost: 5,
            ..Config::default()
        };
        let hashed = hash_password("s3cret-pass", config.bcrypt_cost).unwrap();
        assert!(hashed.starts_with("$2b$05$"), "unexpected hash {}", hashed);

        // Hashes made under another cost still verify.
        let older = hash_password("s3cret-pass", 4).unwrap();
        assert!(verify_password("s3cret-pass", &older).unwrap());
    }

    #[test]
    fn test_out_of_range_cost_is_an_internal_error() {
        let err = hash_password("whatever", 3).unwrap_err();
        assert!(matches!(err, AppError::InternalServerError(msg) if msg.contains("Failed to hash")));
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        match verify_password("test_password123", "invalidhashformat") {
            Err(AppError::InternalServerError(msg)) => {
                assert!(msg.contains("Failed to verify password"));
            }
            Ok(false) => {}
            Ok(true) => panic!("Password verification should fail for invalid hash format"),
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }
}
