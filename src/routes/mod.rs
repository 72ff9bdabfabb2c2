pub mod answers;
pub mod chats;
pub mod health;
pub mod messages;
pub mod questions;
pub mod todos;
pub mod users;

use std::collections::HashMap;

use actix_web::web;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{decode, Entity, Filter, Model, SoftDeleteStore, ID, UUID};
use crate::error::AppError;
use crate::models::{User, UserSummary};
use crate::pagination::{normalize, ApiQuery};

/// Largest accepted JSON request body.
pub const JSON_LIMIT: usize = 16 * 1024;

/// Registers every resource under the caller's scope (mounted at `/api/v1`).
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(health::health_check)
    .service(
        web::scope("/users")
            .service(users::register)
            .service(users::login)
            .service(users::verify_email)
            .service(users::refresh_token)
            .service(users::logout)
            .service(users::current_user),
    )
    .service(
        web::scope("/todos")
            .service(todos::get_todos)
            .service(todos::create_todo)
            .service(todos::get_todo)
            .service(todos::update_todo)
            .service(todos::delete_todo),
    )
    .service(
        web::scope("/qna/questions")
            .service(questions::get_my_questions)
            .service(questions::create_question)
            .service(questions::get_questions)
            .service(questions::get_question)
            .service(questions::update_question)
            .service(questions::delete_question)
            .service(questions::toggle_upvote)
            .service(questions::toggle_downvote),
    )
    .service(
        web::scope("/qna/answers")
            .service(answers::get_answers)
            .service(answers::create_answer)
            .service(answers::get_answer)
            .service(answers::update_answer)
            .service(answers::delete_answer)
            .service(answers::toggle_upvote)
            .service(answers::toggle_downvote),
    )
    .service(
        web::scope("/chat-app/chats")
            .service(chats::get_chats)
            .service(chats::get_available_users)
            .service(chats::one_on_one_chat)
            .service(chats::create_group)
            .service(chats::get_group)
            .service(chats::rename_group)
            .service(chats::delete_group)
            .service(chats::add_member)
            .service(chats::change_member_role)
            .service(chats::remove_member)
            .service(chats::leave_group),
    )
    .service(
        web::scope("/chat-app/messages")
            .service(messages::get_messages)
            .service(messages::send_message)
            .service(messages::update_message)
            .service(messages::delete_message),
    );
}

/// Normalizes the raw query string of a list endpoint.
pub(crate) fn list_query(
    raw: &HashMap<String, String>,
    default_limit: i64,
    config: &Config,
) -> Result<ApiQuery, AppError> {
    normalize(raw, default_limit, config.max_page_limit)
}

/// Looks a live row up by its public id, failing with `NotFound(message)`.
pub(crate) async fn find_by_uuid<M: Model>(
    db: &SoftDeleteStore,
    uuid: Uuid,
    message: &str,
) -> Result<M, AppError> {
    db.first::<M>(&Filter::new().eq(UUID, uuid))
        .await?
        .ok_or_else(|| AppError::NotFound(message.to_string()))
}

/// Author block for a DTO.
///
/// Read through the undecorated store so content written by a since-deleted
/// account still renders with its author.
pub(crate) async fn author_summary(
    db: &SoftDeleteStore,
    user_id: i64,
) -> Result<UserSummary, AppError> {
    let record = db
        .raw()
        .find_one(Entity::Users, &Filter::new().eq(ID, user_id))
        .await?
        .ok_or_else(|| AppError::InternalServerError(format!("Author {} is missing", user_id)))?;
    Ok(decode::<User>(record)?.summary())
}
