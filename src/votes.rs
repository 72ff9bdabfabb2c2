//! Toggle semantics shared by question and answer votes.
//!
//! A user holds at most one vote per target. Toggling the polarity they already
//! hold removes it; toggling the other polarity (or voting for the first time)
//! replaces whatever was there with the requested one.
//!
//! The lookup, delete and create run as separate store calls. The unique key on
//! `(target, user_id)` is what keeps concurrent toggles from producing two rows;
//! the losing insert comes back as [`AppError::Conflict`].

use crate::db::{decode, Entity, Filter, Store, Value};
use crate::error::AppError;
use crate::models::{Vote, VoteSummary, VoteType};

const USER_ID: &str = "user_id";
const VOTE_TYPE: &str = "vote_type";

/// Which vote table to toggle in, and the column naming the voted-on row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTarget {
    pub entity: Entity,
    pub target_column: &'static str,
}

impl VoteTarget {
    pub const QUESTION: VoteTarget = VoteTarget {
        entity: Entity::QuestionVotes,
        target_column: "question_id",
    };

    pub const ANSWER: VoteTarget = VoteTarget {
        entity: Entity::AnswerVotes,
        target_column: "answer_id",
    };

    fn key(&self, target_id: i64, user_id: i64) -> Filter {
        Filter::new()
            .eq(self.target_column, target_id)
            .eq(USER_ID, user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added(VoteType),
    Removed(VoteType),
}

impl ToggleOutcome {
    pub fn message(&self) -> String {
        match self {
            ToggleOutcome::Added(kind) => format!("{} added successfully", kind.label()),
            ToggleOutcome::Removed(kind) => format!("{} removed successfully", kind.label()),
        }
    }
}

pub async fn toggle_vote<S: Store + ?Sized>(
    db: &S,
    target: VoteTarget,
    target_id: i64,
    user_id: i64,
    requested: VoteType,
) -> Result<ToggleOutcome, AppError> {
    let existing = match db
        .find_one(target.entity, &target.key(target_id, user_id))
        .await?
    {
        Some(record) => Some(decode::<Vote>(record)?),
        None => None,
    };

    if let Some(vote) = &existing {
        db.delete(target.entity, vote.id).await?;
        if vote.vote_type == requested {
            return Ok(ToggleOutcome::Removed(requested));
        }
    }

    db.create(
        target.entity,
        vec![
            (target.target_column, Value::Int(target_id)),
            (USER_ID, Value::Int(user_id)),
            (VOTE_TYPE, requested.into()),
        ],
    )
    .await?;

    log::debug!(
        "{} {} set on {} {}",
        user_id,
        requested.as_str(),
        target.target_column,
        target_id
    );
    Ok(ToggleOutcome::Added(requested))
}

/// Vote tallies for one target; `viewer` fills in `isUpvote`/`isDownvote`.
pub async fn vote_summary<S: Store + ?Sized>(
    db: &S,
    target: VoteTarget,
    target_id: i64,
    viewer: Option<i64>,
) -> Result<VoteSummary, AppError> {
    let on_target = Filter::new().eq(target.target_column, target_id);

    let upvote_count = db
        .count(
            target.entity,
            &on_target.clone().eq(VOTE_TYPE, VoteType::Upvote),
        )
        .await?;
    let downvote_count = db
        .count(target.entity, &on_target.eq(VOTE_TYPE, VoteType::Downvote))
        .await?;

    let mine = match viewer {
        Some(user_id) => db
            .find_one(target.entity, &target.key(target_id, user_id))
            .await?
            .map(decode::<Vote>)
            .transpose()?
            .map(|vote| vote.vote_type),
        None => None,
    };

    Ok(VoteSummary {
        is_upvote: mine == Some(VoteType::Upvote),
        is_downvote: mine == Some(VoteType::Downvote),
        upvote_count,
        downvote_count,
    })
}
