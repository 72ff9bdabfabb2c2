use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::{Entity, Model};
use crate::models::user::UserSummary;
use crate::models::vote::VoteSummary;

/// Body for creating or editing an answer.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AnswerInput {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// A row of the `answers` table.
#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub uuid: Uuid,
    pub content: String,
    pub question_id: i64,
    pub created_by_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Model for Answer {
    const ENTITY: Entity = Entity::Answers;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub created_by_user: UserSummary,
    #[serde(flatten)]
    pub votes: VoteSummary,
}
