//! Chat channels: one-on-one conversations and group chats with admin roles.
//!
//! A channel's members live in `chat_channel_members`. Group management is
//! allowed to the channel creator and to members holding the `ADMIN` role.
//! Channel listings are ordered by last activity: the newest message's
//! `created_at`, or the channel's own when it has no messages.

use std::collections::{BTreeSet, HashMap};

use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::config::Config;
use crate::db::{
    decode, Entity, Filter, Model, Order, Query, SoftDeleteStore, Store, Value, CREATED_AT, ID,
    UUID,
};
use crate::error::AppError;
use crate::models::chat::{GroupChatInput, GroupRenameInput, MemberRoleInput};
use crate::models::{
    ChatChannel, ChatChannelDto, ChatChannelMember, ChatMessage, MemberDto, MemberRole,
    MessageDto, User, UserDto,
};
use crate::pagination::{compute_meta, PaginationMeta, Paginated};
use crate::response;
use crate::routes::{author_summary, find_by_uuid, list_query};

const CHANNEL_ID: &str = "chat_channel_id";
const USER_ID: &str = "user_id";
const IS_GROUP_CHAT: &str = "is_group_chat";
const CREATED_BY: &str = "created_by_user_id";
const DEFAULT_LIMIT: i64 = 10;
const USER_SEARCH_COLUMNS: &[&str] = &["name", "email"];
const GROUP_NOT_FOUND: &str = "Group chat does not exist";

/// Minimum number of participants besides the creator.
pub const MIN_GROUP_PARTICIPANTS: usize = 2;

pub(crate) async fn membership(
    db: &SoftDeleteStore,
    channel_id: i64,
    user_id: i64,
) -> Result<Option<ChatChannelMember>, AppError> {
    db.first::<ChatChannelMember>(
        &Filter::new()
            .eq(CHANNEL_ID, channel_id)
            .eq(USER_ID, user_id),
    )
    .await
}

pub(crate) async fn message_dto(
    db: &SoftDeleteStore,
    message: ChatMessage,
) -> Result<MessageDto, AppError> {
    Ok(MessageDto {
        id: message.uuid,
        created_by_user: author_summary(db, message.created_by_user_id).await?,
        content: message.content,
        created_at: message.created_at,
    })
}

async fn latest_message(
    db: &SoftDeleteStore,
    channel_id: i64,
) -> Result<Option<ChatMessage>, AppError> {
    Ok(db
        .list::<ChatMessage>(
            &Query::new(Filter::new().eq(CHANNEL_ID, channel_id))
                .order_by(CREATED_AT, Order::Desc)
                .window(0, 1),
        )
        .await?
        .into_iter()
        .next())
}

async fn channel_dto(
    db: &SoftDeleteStore,
    channel: ChatChannel,
) -> Result<ChatChannelDto, AppError> {
    let member_rows = db
        .list::<ChatChannelMember>(&Query::new(Filter::new().eq(CHANNEL_ID, channel.id)))
        .await?;

    let mut members = Vec::with_capacity(member_rows.len());
    for member in member_rows {
        // Former accounts stay listed so the member count is stable.
        let record = db
            .raw()
            .find_one(Entity::Users, &Filter::new().eq(ID, member.user_id))
            .await?;
        if let Some(record) = record {
            let user: User = decode(record)?;
            members.push(MemberDto {
                id: user.uuid,
                name: user.name,
                email: user.email,
                role: member.role,
                joined_at: member.created_at,
            });
        }
    }

    let last_message = match latest_message(db, channel.id).await? {
        Some(message) => Some(message_dto(db, message).await?),
        None => None,
    };

    Ok(ChatChannelDto {
        id: channel.uuid,
        name: channel.name,
        is_group_chat: channel.is_group_chat,
        created_at: channel.created_at,
        members,
        last_message,
        created_by_user: author_summary(db, channel.created_by_user_id).await?,
    })
}

/// Newest message's `created_at`, or the channel's own when it has none.
async fn last_activity(
    db: &SoftDeleteStore,
    channel: &ChatChannel,
) -> Result<DateTime<Utc>, AppError> {
    Ok(latest_message(db, channel.id)
        .await?
        .map_or(channel.created_at, |message| message.created_at))
}

/// Internal ids of every channel `user_id` belongs to.
async fn channel_ids_of(db: &SoftDeleteStore, user_id: i64) -> Result<Vec<i64>, AppError> {
    Ok(db
        .list::<ChatChannelMember>(&Query::new(Filter::new().eq(USER_ID, user_id)))
        .await?
        .into_iter()
        .map(|member| member.chat_channel_id)
        .collect())
}

async fn add_members(
    db: &SoftDeleteStore,
    channel_id: i64,
    members: &[(i64, MemberRole)],
) -> Result<(), AppError> {
    for (user_id, role) in members {
        db.insert::<ChatChannelMember>(vec![
            (CHANNEL_ID, Value::Int(channel_id)),
            (USER_ID, Value::Int(*user_id)),
            ("role", (*role).into()),
        ])
        .await?;
    }
    Ok(())
}

async fn group_channel(db: &SoftDeleteStore, chat_id: Uuid) -> Result<ChatChannel, AppError> {
    db.first::<ChatChannel>(&Filter::new().eq(UUID, chat_id).eq(IS_GROUP_CHAT, true))
        .await?
        .ok_or_else(|| AppError::NotFound(GROUP_NOT_FOUND.into()))
}

/// A group the caller belongs to; non-members get the same 404 as a missing group.
async fn member_group(
    db: &SoftDeleteStore,
    chat_id: Uuid,
    user_id: i64,
) -> Result<(ChatChannel, ChatChannelMember), AppError> {
    let channel = group_channel(db, chat_id).await?;
    let member = membership(db, channel.id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(GROUP_NOT_FOUND.into()))?;
    Ok((channel, member))
}

/// A group the caller may manage.
async fn admin_group(
    db: &SoftDeleteStore,
    chat_id: Uuid,
    user_id: i64,
) -> Result<ChatChannel, AppError> {
    let (channel, member) = member_group(db, chat_id, user_id).await?;
    if channel.created_by_user_id != user_id && member.role != MemberRole::Admin {
        return Err(AppError::Forbidden(
            "Only group admins can perform this action".into(),
        ));
    }
    Ok(channel)
}

async fn target_member(
    db: &SoftDeleteStore,
    channel: &ChatChannel,
    member_id: Uuid,
) -> Result<(User, Option<ChatChannelMember>), AppError> {
    let user = find_by_uuid::<User>(db, member_id, "User does not exist").await?;
    let member = membership(db, channel.id, user.id).await?;
    Ok((user, member))
}

/// The caller's channels, most recently active first.
#[get("")]
pub async fn get_chats(
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    raw: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let query = list_query(&raw, DEFAULT_LIMIT, &config)?;
    let page = query.page_request();
    let filter = Filter::new().is_in(ID, channel_ids_of(&db, user.0.id).await?);

    let meta: PaginationMeta =
        compute_meta(db.get_ref(), ChatChannel::ENTITY, &filter, page).await?;

    // Rank by last activity first; only the requested page gets full DTOs.
    let mut ranked = Vec::new();
    for channel in db.list::<ChatChannel>(&Query::new(filter)).await? {
        let active_at = last_activity(&db, &channel).await?;
        ranked.push((active_at, channel));
    }
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.id.cmp(&a.1.id)));

    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    let mut list = Vec::with_capacity(limit.min(ranked.len()));
    for (_, channel) in ranked.into_iter().skip(offset).take(limit) {
        list.push(channel_dto(&db, channel).await?);
    }

    Ok(response::ok(
        "User chats fetched successfully",
        Paginated { list, meta },
    ))
}

/// Users the caller can start a chat with.
#[get("/users")]
pub async fn get_available_users(
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    raw: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let query = list_query(&raw, DEFAULT_LIMIT, &config)?;
    let page = query.page_request();
    let filter = Filter::new()
        .ne(ID, user.0.id)
        .search(USER_SEARCH_COLUMNS, query.q.as_deref());

    let meta = compute_meta(db.get_ref(), User::ENTITY, &filter, page).await?;
    let list: Vec<UserDto> = db
        .list::<User>(&Query::new(filter).window(page.offset(), page.limit))
        .await?
        .iter()
        .map(User::public)
        .collect();

    Ok(response::ok(
        "Successfully fetched users",
        Paginated { list, meta },
    ))
}

/// Returns the one-on-one chat with the receiver, creating it on first use.
#[get("/c/{receiver_id}")]
pub async fn one_on_one_chat(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    receiver_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let receiver =
        find_by_uuid::<User>(&db, receiver_id.into_inner(), "Receiver does not exist").await?;
    if receiver.id == user.0.id {
        return Err(AppError::BadRequest("You cannot chat with yourself".into()));
    }

    let mine: BTreeSet<i64> = channel_ids_of(&db, user.0.id).await?.into_iter().collect();
    let shared: Vec<i64> = channel_ids_of(&db, receiver.id)
        .await?
        .into_iter()
        .filter(|id| mine.contains(id))
        .collect();

    let existing = db
        .first::<ChatChannel>(
            &Filter::new()
                .is_in(ID, shared)
                .eq(IS_GROUP_CHAT, false),
        )
        .await?;
    if let Some(channel) = existing {
        let dto = channel_dto(&db, channel).await?;
        return Ok(response::ok("Chat retrieved successfully", dto));
    }

    let channel = db
        .insert::<ChatChannel>(vec![
            ("name", Value::Null),
            (IS_GROUP_CHAT, false.into()),
            (CREATED_BY, Value::Int(user.0.id)),
        ])
        .await?;
    add_members(
        &db,
        channel.id,
        &[
            (user.0.id, MemberRole::Member),
            (receiver.id, MemberRole::Member),
        ],
    )
    .await?;

    let dto = channel_dto(&db, channel).await?;
    Ok(response::created("Chat retrieved successfully", dto))
}

/// Creates a group chat. The creator joins as `ADMIN`, participants as `MEMBER`.
#[post("/group")]
pub async fn create_group(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    body: web::Json<GroupChatInput>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let mut participants = Vec::new();
    let mut seen = BTreeSet::new();
    for participant_id in body.participants {
        if !seen.insert(participant_id) {
            continue;
        }
        let participant =
            find_by_uuid::<User>(&db, participant_id, "Participant does not exist").await?;
        if participant.id != user.0.id {
            participants.push(participant.id);
        }
    }
    if participants.len() < MIN_GROUP_PARTICIPANTS {
        return Err(AppError::BadRequest(format!(
            "A group chat needs at least {} participants besides you",
            MIN_GROUP_PARTICIPANTS
        )));
    }

    let channel = db
        .insert::<ChatChannel>(vec![
            ("name", body.name.trim().into()),
            (IS_GROUP_CHAT, true.into()),
            (CREATED_BY, Value::Int(user.0.id)),
        ])
        .await?;

    let mut members = vec![(user.0.id, MemberRole::Admin)];
    members.extend(participants.into_iter().map(|id| (id, MemberRole::Member)));
    add_members(&db, channel.id, &members).await?;

    let dto = channel_dto(&db, channel).await?;
    Ok(response::created("Group chat created successfully", dto))
}

#[get("/group/{chat_id}")]
pub async fn get_group(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let (channel, _) = member_group(&db, chat_id.into_inner(), user.0.id).await?;
    let dto = channel_dto(&db, channel).await?;
    Ok(response::ok("Group chat fetched successfully", dto))
}

#[put("/group/{chat_id}")]
pub async fn rename_group(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
    body: web::Json<GroupRenameInput>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let channel = admin_group(&db, chat_id.into_inner(), user.0.id).await?;

    let channel = db
        .modify::<ChatChannel>(channel.id, vec![("name", body.name.trim().into())])
        .await?;
    let dto = channel_dto(&db, channel).await?;
    Ok(response::ok("Group chat name updated successfully", dto))
}

#[delete("/group/{chat_id}")]
pub async fn delete_group(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let channel = admin_group(&db, chat_id.into_inner(), user.0.id).await?;
    db.remove::<ChatChannel>(channel.id).await?;
    log::info!("Group chat {} deleted by user {}", channel.uuid, user.0.uuid);

    Ok(response::ok("Group chat deleted successfully", json!({})))
}

#[post("/group/{chat_id}/{member_id}")]
pub async fn add_member(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (chat_id, member_id) = path.into_inner();
    let channel = admin_group(&db, chat_id, user.0.id).await?;

    let (target, existing) = target_member(&db, &channel, member_id).await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "User is already a member of this group".into(),
        ));
    }
    add_members(&db, channel.id, &[(target.id, MemberRole::Member)]).await?;

    let dto = channel_dto(&db, channel).await?;
    Ok(response::ok("Member added successfully", dto))
}

#[patch("/group/{chat_id}/{member_id}")]
pub async fn change_member_role(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<MemberRoleInput>,
) -> Result<HttpResponse, AppError> {
    let (chat_id, member_id) = path.into_inner();
    let role = MemberRole::parse(&body.role)
        .ok_or_else(|| AppError::BadRequest("Role must be ADMIN or MEMBER".into()))?;
    let channel = admin_group(&db, chat_id, user.0.id).await?;

    let (_, member) = target_member(&db, &channel, member_id).await?;
    let member =
        member.ok_or_else(|| AppError::NotFound("User is not a member of this group".into()))?;
    db.modify::<ChatChannelMember>(member.id, vec![("role", role.into())])
        .await?;

    let dto = channel_dto(&db, channel).await?;
    Ok(response::ok("Member role updated successfully", dto))
}

#[delete("/group/{chat_id}/{member_id}")]
pub async fn remove_member(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (chat_id, member_id) = path.into_inner();
    let channel = admin_group(&db, chat_id, user.0.id).await?;

    let (target, member) = target_member(&db, &channel, member_id).await?;
    let member =
        member.ok_or_else(|| AppError::NotFound("User is not a member of this group".into()))?;
    if target.id == channel.created_by_user_id {
        return Err(AppError::Forbidden(
            "The group creator cannot be removed".into(),
        ));
    }
    db.delete(Entity::ChatChannelMembers, member.id).await?;

    let dto = channel_dto(&db, channel).await?;
    Ok(response::ok("Member removed successfully", dto))
}

/// Leaves a group. The last member out also deletes the group.
#[delete("/leave/group/{chat_id}")]
pub async fn leave_group(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let (channel, member) = member_group(&db, chat_id.into_inner(), user.0.id).await?;
    db.delete(Entity::ChatChannelMembers, member.id).await?;

    let remaining = db
        .count(
            Entity::ChatChannelMembers,
            &Filter::new().eq(CHANNEL_ID, channel.id),
        )
        .await?;
    if remaining == 0 {
        db.remove::<ChatChannel>(channel.id).await?;
    }

    Ok(response::ok("Left the group successfully", json!({})))
}
