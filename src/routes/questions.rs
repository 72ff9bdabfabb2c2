use std::collections::HashMap;

use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUser, MaybeUser};
use crate::config::Config;
use crate::db::{Fields, Filter, Model, Order, Query, SoftDeleteStore, Value, CREATED_AT};
use crate::error::AppError;
use crate::models::{Question, QuestionDto, QuestionInput, QuestionUpdate, VoteType};
use crate::pagination::{compute_meta, Paginated};
use crate::response;
use crate::routes::{author_summary, find_by_uuid, list_query};
use crate::votes::{toggle_vote, vote_summary, VoteTarget};

const CREATED_BY: &str = "created_by_user_id";
const SEARCH_COLUMNS: &[&str] = &["title", "description"];
const DEFAULT_LIMIT: i64 = 10;
const NOT_FOUND: &str = "Question does not exist";

async fn question_dto(
    db: &SoftDeleteStore,
    question: Question,
    viewer: Option<i64>,
) -> Result<QuestionDto, AppError> {
    Ok(QuestionDto {
        id: question.uuid,
        created_by_user: author_summary(db, question.created_by_user_id).await?,
        votes: vote_summary(db, VoteTarget::QUESTION, question.id, viewer).await?,
        title: question.title,
        description: question.description,
        created_at: question.created_at,
    })
}

async fn question_page(
    db: &SoftDeleteStore,
    config: &Config,
    raw: &HashMap<String, String>,
    filter: Filter,
    viewer: Option<i64>,
) -> Result<Paginated<QuestionDto>, AppError> {
    let query = list_query(raw, DEFAULT_LIMIT, config)?;
    let filter = filter.search(SEARCH_COLUMNS, query.q.as_deref());
    let page = query.page_request();

    let meta = compute_meta(db, Question::ENTITY, &filter, page).await?;
    let rows = db
        .list::<Question>(
            &Query::new(filter)
                .order_by(CREATED_AT, Order::Desc)
                .window(page.offset(), page.limit),
        )
        .await?;

    let mut list = Vec::with_capacity(rows.len());
    for question in rows {
        list.push(question_dto(db, question, viewer).await?);
    }
    Ok(Paginated { list, meta })
}

/// The caller's own question, or 403 when it belongs to someone else.
async fn authored_question(
    db: &SoftDeleteStore,
    question_id: Uuid,
    user_id: i64,
    action: &str,
) -> Result<Question, AppError> {
    let question = find_by_uuid::<Question>(db, question_id, NOT_FOUND).await?;
    if question.created_by_user_id != user_id {
        return Err(AppError::Forbidden(format!(
            "You are not authorized to {} this question",
            action
        )));
    }
    Ok(question)
}

/// Lists all questions, newest first.
///
/// Works anonymously; a signed-in caller also gets `isUpvote`/`isDownvote`.
#[get("")]
pub async fn get_questions(
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    viewer: MaybeUser,
    raw: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let page = question_page(&db, &config, &raw, Filter::new(), viewer.id()).await?;
    Ok(response::ok("Questions fetched successfully", page))
}

#[get("/get/my")]
pub async fn get_my_questions(
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    raw: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let filter = Filter::new().eq(CREATED_BY, user.0.id);
    let page = question_page(&db, &config, &raw, filter, Some(user.0.id)).await?;
    Ok(response::ok("Questions fetched successfully", page))
}

#[get("/{question_id}")]
pub async fn get_question(
    db: web::Data<SoftDeleteStore>,
    viewer: MaybeUser,
    question_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let question = find_by_uuid::<Question>(&db, question_id.into_inner(), NOT_FOUND).await?;
    let dto = question_dto(&db, question, viewer.id()).await?;
    Ok(response::ok("Question fetched successfully", dto))
}

#[post("/create")]
pub async fn create_question(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    body: web::Json<QuestionInput>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let question = db
        .insert::<Question>(vec![
            ("title", body.title.into()),
            ("description", body.description.into()),
            (CREATED_BY, Value::Int(user.0.id)),
        ])
        .await?;

    let dto = question_dto(&db, question, Some(user.0.id)).await?;
    Ok(response::created("Question created successfully", dto))
}

#[put("/{question_id}")]
pub async fn update_question(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    question_id: web::Path<Uuid>,
    body: web::Json<QuestionUpdate>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let question = authored_question(&db, question_id.into_inner(), user.0.id, "update").await?;

    let mut fields: Fields = Vec::new();
    if let Some(title) = body.title {
        fields.push(("title", title.into()));
    }
    if let Some(description) = body.description {
        fields.push(("description", description.into()));
    }
    let question = if fields.is_empty() {
        question
    } else {
        db.modify::<Question>(question.id, fields).await?
    };

    let dto = question_dto(&db, question, Some(user.0.id)).await?;
    Ok(response::ok("Question updated successfully", dto))
}

#[delete("/{question_id}")]
pub async fn delete_question(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    question_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let question = authored_question(&db, question_id.into_inner(), user.0.id, "delete").await?;
    db.remove::<Question>(question.id).await?;
    Ok(response::ok(
        "Question deleted successfully",
        serde_json::json!({}),
    ))
}

async fn toggle(
    db: &SoftDeleteStore,
    user: &AuthenticatedUser,
    question_id: Uuid,
    vote_type: VoteType,
) -> Result<HttpResponse, AppError> {
    let question = find_by_uuid::<Question>(db, question_id, NOT_FOUND).await?;
    let outcome = toggle_vote(db, VoteTarget::QUESTION, question.id, user.0.id, vote_type).await?;
    let dto = question_dto(db, question, Some(user.0.id)).await?;
    Ok(response::ok(outcome.message(), dto))
}

#[patch("/toggle-upvote/{question_id}")]
pub async fn toggle_upvote(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    question_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    toggle(&db, &user, question_id.into_inner(), VoteType::Upvote).await
}

#[patch("/toggle-downvote/{question_id}")]
pub async fn toggle_downvote(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    question_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    toggle(&db, &user, question_id.into_inner(), VoteType::Downvote).await
}
