use std::collections::HashMap;

use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUser, MaybeUser};
use crate::config::Config;
use crate::db::{Filter, Model, Order, Query, SoftDeleteStore, Value, CREATED_AT};
use crate::error::AppError;
use crate::models::{Answer, AnswerDto, AnswerInput, Question, VoteType};
use crate::pagination::{compute_meta, Paginated};
use crate::response;
use crate::routes::{author_summary, find_by_uuid, list_query};
use crate::votes::{toggle_vote, vote_summary, VoteTarget};

const CREATED_BY: &str = "created_by_user_id";
const QUESTION_ID: &str = "question_id";
const DEFAULT_LIMIT: i64 = 100;
const NOT_FOUND: &str = "Answer does not exist";

async fn answer_dto(
    db: &SoftDeleteStore,
    answer: Answer,
    viewer: Option<i64>,
) -> Result<AnswerDto, AppError> {
    Ok(AnswerDto {
        id: answer.uuid,
        created_by_user: author_summary(db, answer.created_by_user_id).await?,
        votes: vote_summary(db, VoteTarget::ANSWER, answer.id, viewer).await?,
        content: answer.content,
        created_at: answer.created_at,
    })
}

async fn authored_answer(
    db: &SoftDeleteStore,
    answer_id: Uuid,
    user_id: i64,
    action: &str,
) -> Result<Answer, AppError> {
    let answer = find_by_uuid::<Answer>(db, answer_id, NOT_FOUND).await?;
    if answer.created_by_user_id != user_id {
        return Err(AppError::Forbidden(format!(
            "You are not authorized to {} this answer",
            action
        )));
    }
    Ok(answer)
}

/// Answers of one question, newest first. Defaults to 100 per page.
#[get("/q/{question_id}")]
pub async fn get_answers(
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    viewer: MaybeUser,
    question_id: web::Path<Uuid>,
    raw: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let question =
        find_by_uuid::<Question>(&db, question_id.into_inner(), "Question does not exist").await?;
    let query = list_query(&raw, DEFAULT_LIMIT, &config)?;
    let page = query.page_request();
    let filter = Filter::new().eq(QUESTION_ID, question.id);

    let meta = compute_meta(db.get_ref(), Answer::ENTITY, &filter, page).await?;
    let rows = db
        .list::<Answer>(
            &Query::new(filter)
                .order_by(CREATED_AT, Order::Desc)
                .window(page.offset(), page.limit),
        )
        .await?;

    let mut list = Vec::with_capacity(rows.len());
    for answer in rows {
        list.push(answer_dto(&db, answer, viewer.id()).await?);
    }

    Ok(response::ok(
        "Answers fetched successfully",
        Paginated { list, meta },
    ))
}

#[post("/q/{question_id}")]
pub async fn create_answer(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    question_id: web::Path<Uuid>,
    body: web::Json<AnswerInput>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let question =
        find_by_uuid::<Question>(&db, question_id.into_inner(), "Question does not exist").await?;

    let answer = db
        .insert::<Answer>(vec![
            ("content", body.into_inner().content.into()),
            (QUESTION_ID, Value::Int(question.id)),
            (CREATED_BY, Value::Int(user.0.id)),
        ])
        .await?;

    let dto = answer_dto(&db, answer, Some(user.0.id)).await?;
    Ok(response::created("Answer created successfully", dto))
}

#[get("/{answer_id}")]
pub async fn get_answer(
    db: web::Data<SoftDeleteStore>,
    viewer: MaybeUser,
    answer_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let answer = find_by_uuid::<Answer>(&db, answer_id.into_inner(), NOT_FOUND).await?;
    let dto = answer_dto(&db, answer, viewer.id()).await?;
    Ok(response::ok("Answer fetched successfully", dto))
}

#[put("/{answer_id}")]
pub async fn update_answer(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    answer_id: web::Path<Uuid>,
    body: web::Json<AnswerInput>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let answer = authored_answer(&db, answer_id.into_inner(), user.0.id, "update").await?;

    let answer = db
        .modify::<Answer>(
            answer.id,
            vec![("content", body.into_inner().content.into())],
        )
        .await?;

    let dto = answer_dto(&db, answer, Some(user.0.id)).await?;
    Ok(response::ok("Answer updated successfully", dto))
}

#[delete("/{answer_id}")]
pub async fn delete_answer(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    answer_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let answer = authored_answer(&db, answer_id.into_inner(), user.0.id, "delete").await?;
    let deleted = db.remove::<Answer>(answer.id).await?;

    let dto = answer_dto(&db, deleted, Some(user.0.id)).await?;
    Ok(response::ok("Answer deleted successfully", dto))
}

async fn toggle(
    db: &SoftDeleteStore,
    user: &AuthenticatedUser,
    answer_id: Uuid,
    vote_type: VoteType,
) -> Result<HttpResponse, AppError> {
    let answer = find_by_uuid::<Answer>(db, answer_id, NOT_FOUND).await?;
    let outcome = toggle_vote(db, VoteTarget::ANSWER, answer.id, user.0.id, vote_type).await?;
    let dto = answer_dto(db, answer, Some(user.0.id)).await?;
    Ok(response::ok(outcome.message(), dto))
}

#[patch("/toggle-upvote/{answer_id}")]
pub async fn toggle_upvote(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    answer_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    toggle(&db, &user, answer_id.into_inner(), VoteType::Upvote).await
}

#[patch("/toggle-downvote/{answer_id}")]
pub async fn toggle_downvote(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    answer_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    toggle(&db, &user, answer_id.into_inner(), VoteType::Downvote).await
}
