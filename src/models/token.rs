use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Entity, Model, Value};

/// Purpose of a stored token.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    VerifyEmailToken,
    RefreshToken,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::VerifyEmailToken => "VERIFY_EMAIL_TOKEN",
            TokenKind::RefreshToken => "REFRESH_TOKEN",
        }
    }
}

impl From<TokenKind> for Value {
    fn from(kind: TokenKind) -> Self {
        Value::Text(kind.as_str().to_string())
    }
}

/// A row of the `tokens` table. `token` holds a sha256 hex digest, never the raw secret.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub kind: TokenKind,
    pub expiry_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Model for Token {
    const ENTITY: Entity = Entity::Tokens;
}
