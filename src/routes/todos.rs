use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::db::{Fields, Filter, Order, Query, SoftDeleteStore, Value, CREATED_AT, UUID};
use crate::error::AppError;
use crate::models::{Todo, TodoDto, TodoInput, TodoQuery, TodoUpdate};
use crate::response;

const CREATED_BY: &str = "created_by_user_id";
const SEARCH_COLUMNS: &[&str] = &["title", "description"];

/// A todo of `owner` by public id; another user's todo is reported as absent.
async fn owned_todo(db: &SoftDeleteStore, todo_id: Uuid, owner: i64) -> Result<Todo, AppError> {
    db.first::<Todo>(&Filter::new().eq(UUID, todo_id).eq(CREATED_BY, owner))
        .await?
        .ok_or_else(|| AppError::NotFound("Todo does not exist".into()))
}

/// Retrieves the authenticated user's todos, newest first.
///
/// ## Query Parameters:
/// - `q` (optional): case-insensitive match against title or description.
/// - `status` (optional): `pending`, `inprogress` or `completed`.
/// - `completed` (optional): `true` or `false`.
#[get("")]
pub async fn get_todos(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    query: web::Query<TodoQuery>,
) -> Result<HttpResponse, AppError> {
    let mut filter = Filter::new()
        .eq(CREATED_BY, user.0.id)
        .search(SEARCH_COLUMNS, query.q.as_deref());
    if let Some(status) = query.status {
        filter = filter.eq("status", status);
    }
    if let Some(completed) = query.completed {
        filter = filter.eq("completed", completed);
    }

    let todos: Vec<TodoDto> = db
        .list::<Todo>(&Query::new(filter).order_by(CREATED_AT, Order::Desc))
        .await?
        .into_iter()
        .map(TodoDto::from)
        .collect();

    Ok(response::ok("Todos fetched successfully", todos))
}

#[post("")]
pub async fn create_todo(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    body: web::Json<TodoInput>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let todo = db
        .insert::<Todo>(vec![
            ("title", body.title.into()),
            ("description", body.description.into()),
            ("status", body.status.unwrap_or_default().into()),
            ("completed", false.into()),
            (CREATED_BY, Value::Int(user.0.id)),
        ])
        .await?;

    Ok(response::created(
        "Todo created successfully",
        TodoDto::from(todo),
    ))
}

#[get("/{todo_id}")]
pub async fn get_todo(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    todo_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let todo = owned_todo(&db, todo_id.into_inner(), user.0.id).await?;
    Ok(response::ok("Todo fetched successfully", TodoDto::from(todo)))
}

/// Applies the fields present in the body; absent fields keep their value.
#[put("/{todo_id}")]
pub async fn update_todo(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    todo_id: web::Path<Uuid>,
    body: web::Json<TodoUpdate>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let todo = owned_todo(&db, todo_id.into_inner(), user.0.id).await?;

    let mut fields: Fields = Vec::new();
    if let Some(title) = body.title {
        fields.push(("title", title.into()));
    }
    if let Some(description) = body.description {
        fields.push(("description", description.into()));
    }
    if let Some(status) = body.status {
        fields.push(("status", status.into()));
    }
    if let Some(completed) = body.completed {
        fields.push(("completed", completed.into()));
    }

    let updated = if fields.is_empty() {
        todo
    } else {
        db.modify::<Todo>(todo.id, fields).await?
    };

    Ok(response::ok(
        "Todo updated successfully",
        TodoDto::from(updated),
    ))
}

#[delete("/{todo_id}")]
pub async fn delete_todo(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
    todo_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let todo = owned_todo(&db, todo_id.into_inner(), user.0.id).await?;
    let deleted = db.remove::<Todo>(todo.id).await?;

    Ok(response::ok(
        "Todo deleted successfully",
        json!({ "deletedTodo": TodoDto::from(deleted) }),
    ))
}
