use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::{Entity, Model, Value};
use crate::models::user::UserSummary;

/// Role of a member inside one chat channel.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Admin => "ADMIN",
            MemberRole::Member => "MEMBER",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(MemberRole::Admin),
            "MEMBER" => Some(MemberRole::Member),
            _ => None,
        }
    }
}

impl From<MemberRole> for Value {
    fn from(role: MemberRole) -> Self {
        Value::Text(role.as_str().to_string())
    }
}

/// A row of the `chat_channels` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChannel {
    pub id: i64,
    pub uuid: Uuid,
    pub name: Option<String>,
    pub is_group_chat: bool,
    pub created_by_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Model for ChatChannel {
    const ENTITY: Entity = Entity::ChatChannels;
}

/// A row of the `chat_channel_members` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChannelMember {
    pub id: i64,
    pub chat_channel_id: i64,
    pub user_id: i64,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

impl Model for ChatChannelMember {
    const ENTITY: Entity = Entity::ChatChannelMembers;
}

/// A row of the `chat_messages` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub uuid: Uuid,
    pub content: String,
    pub chat_channel_id: i64,
    pub created_by_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Model for ChatMessage {
    const ENTITY: Entity = Entity::ChatMessages;
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct GroupChatInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Public ids of the users to add besides the creator.
    pub participants: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct GroupRenameInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberRoleInput {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct MessageInput {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub created_by_user: UserSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatChannelDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Option<String>,
    pub is_group_chat: bool,
    pub created_at: DateTime<Utc>,
    pub members: Vec<MemberDto>,
    pub last_message: Option<MessageDto>,
    pub created_by_user: UserSummary,
}
