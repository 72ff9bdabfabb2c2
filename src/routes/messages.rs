use std::collections::HashMap;

use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::config::Config;
use crate::db::{Filter, Model, Order, Query, SoftDeleteStore, Value, CREATED_AT, UUID};
use crate::error::AppError;
use crate::models::chat::MessageInput;
use crate::models::{ChatChannel, ChatMessage};
use crate::pagination::{compute_meta, Paginated};
use crate::response;
use crate::routes::chats::{membership, message_dto};
use crate::routes::list_query;

const CHANNEL_ID: &str = "chat_channel_id";
const DEFAULT_LIMIT: i64 = 10;

/// A chat the caller is a member of.
async fn member_chat(
    db: &SoftDeleteStore,
    chat_id: Uuid,
    user_id: i64,
) -> Result<ChatChannel, AppError> {
    let missing = || AppError::NotFound("Chat does not exist".into());
    let channel = db
        .first::<ChatChannel>(&Filter::new().eq(UUID, chat_id))
        .await?
        .ok_or_else(missing)?;
    membership(db, channel.id, user_id)
        .await?
        .ok_or_else(missing)?;
    Ok(channel)
}

async fn chat_message(
    db: &SoftDeleteStore,
    channel: &ChatChannel,
    message_id: Uuid,
) -> Result<ChatMessage, AppError> {
    db.first::<ChatMessage>(
        &Filter::new()
            .eq(UUID, message_id)
            .eq(CHANNEL_ID, channel.id),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Message does not exist".into()))
}

/// Messages of a chat, newest first.
#[get("/{chat_id}")]
pub async fn get_messages(
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
    raw: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let channel = member_chat(&db, chat_id.into_inner(), user.0.id).await?;
    let query = list_query(&raw, DEFAULT_LIMIT, &config)?;
    let page = query.page_request();
    let filter = Filter::new().eq(CHANNEL_ID, channel.id);

    let meta = compute_meta(db.get_ref(), ChatMessage::ENTITY, &filter, page).await?;
    let rows = db
        .list::<ChatMessage>(
            &Query::new(filter)
                .order_by(CREATED_AT, Order::Desc)
                .window(page.offset(), page.limit),
        )
        .await?;

    let mut list = Vec::with_capacity(rows.len());
    for message in rows {
        list.push(message_dto(&db, message).await?);
    }
    Ok(response::ok(
        "Successfully fetched messages",
        Paginated { list, meta },
    ))
}

#[post("/{chat_id}")]
pub async fn send_message(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
    body: web::Json<MessageInput>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let channel = member_chat(&db, chat_id.into_inner(), user.0.id).await?;

    let message = db
        .insert::<ChatMessage>(vec![
            ("content", body.into_inner().content.into()),
            (CHANNEL_ID, Value::Int(channel.id)),
            ("created_by_user_id", Value::Int(user.0.id)),
        ])
        .await?;

    let dto = message_dto(&db, message).await?;
    Ok(response::created("Message sent successfully", dto))
}

/// Edits a message. Only its author may do so.
#[patch("/{chat_id}/{message_id}")]
pub async fn update_message(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<MessageInput>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let (chat_id, message_id) = path.into_inner();
    let channel = member_chat(&db, chat_id, user.0.id).await?;
    let message = chat_message(&db, &channel, message_id).await?;

    if message.created_by_user_id != user.0.id {
        return Err(AppError::Forbidden(
            "You are not allowed to update this message".into(),
        ));
    }

    let message = db
        .modify::<ChatMessage>(
            message.id,
            vec![("content", body.into_inner().content.into())],
        )
        .await?;
    let dto = message_dto(&db, message).await?;
    Ok(response::ok("Message updated successfully", dto))
}

/// Deletes a message. Allowed to its author and to users with the `ADMIN` role.
#[delete("/{chat_id}/{message_id}")]
pub async fn delete_message(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (chat_id, message_id) = path.into_inner();
    let channel = member_chat(&db, chat_id, user.0.id).await?;
    let message = chat_message(&db, &channel, message_id).await?;

    if message.created_by_user_id != user.0.id && !user.0.is_admin() {
        return Err(AppError::Forbidden(
            "You are not allowed to delete this message".into(),
        ));
    }

    db.remove::<ChatMessage>(message.id).await?;
    Ok(response::ok("Message deleted successfully", json!({})))
}
