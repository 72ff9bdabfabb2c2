use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::{Entity, Model};
use crate::models::user::UserSummary;
use crate::models::vote::VoteSummary;

/// Body of `POST /qna/questions/create`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// Body of `PUT /qna/questions/{questionId}`.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct QuestionUpdate {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// A row of the `questions` table.
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: i64,
    pub uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Model for Question {
    const ENTITY: Entity = Entity::Questions;
}

/// A question as returned by the API, with its author and vote tallies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by_user: UserSummary,
    #[serde(flatten)]
    pub votes: VoteSummary,
}
