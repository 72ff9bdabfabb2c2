use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Entity, Model, Value};

/// Application-wide role of a user.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::User => "USER",
        }
    }
}

impl From<UserRole> for Value {
    fn from(role: UserRole) -> Self {
        Value::Text(role.as_str().to_string())
    }
}

/// A row of the `users` table.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub uuid: Uuid,
    pub name: Option<String>,
    pub email: String,
    /// bcrypt hash.
    pub password: String,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Model for User {
    const ENTITY: Entity = Entity::Users;
}

impl User {
    pub fn public(&self) -> UserDto {
        UserDto {
            id: self.uuid,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            is_email_verified: self.is_email_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.uuid,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A user as returned by the API. Never carries the password hash or internal id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The `createdByUser` shape embedded in other resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> User {
        User {
            id: 41,
            uuid: Uuid::new_v4(),
            name: Some("Ada".into()),
            email: "ada@example.com".into(),
            password: "$2b$04$hash".into(),
            role: UserRole::User,
            is_email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_public_view_hides_secrets() {
        let user = sample();
        let json = serde_json::to_value(user.public()).unwrap();

        assert_eq!(json["_id"], json!(user.uuid));
        assert_eq!(json["role"], "USER");
        assert_eq!(json["isEmailVerified"], false);
        assert!(json.get("password").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_user_decodes_from_record() {
        let record = json!({
            "id": 3,
            "uuid": "6f1c1c2e-8a4b-4c55-9c8e-2a1f4f1d7b10",
            "name": null,
            "email": "x@example.com",
            "password": "hash",
            "role": "ADMIN",
            "is_email_verified": true,
            "created_at": "2024-05-01T10:00:00.123456+00:00",
            "updated_at": "2024-05-01T10:00:00+00:00",
            "deleted_at": null
        });
        let user: User = serde_json::from_value(record).unwrap();
        assert!(user.is_admin());
        assert_eq!(user.id, 3);
    }
}
