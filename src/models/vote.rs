use serde::{Deserialize, Serialize};

use crate::db::Value;

/// Polarity of a vote.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteType::Upvote => "UPVOTE",
            VoteType::Downvote => "DOWNVOTE",
        }
    }

    /// Capitalized name used in response messages.
    pub fn label(self) -> &'static str {
        match self {
            VoteType::Upvote => "Upvote",
            VoteType::Downvote => "Downvote",
        }
    }
}

impl From<VoteType> for Value {
    fn from(vote_type: VoteType) -> Self {
        Value::Text(vote_type.as_str().to_string())
    }
}

/// The columns shared by `question_votes` and `answer_votes`.
#[derive(Debug, Clone, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub user_id: i64,
    pub vote_type: VoteType,
}

/// Vote tallies attached to a question or answer, relative to the viewing user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSummary {
    pub is_upvote: bool,
    pub is_downvote: bool,
    pub upvote_count: i64,
    pub downvote_count: i64,
}
