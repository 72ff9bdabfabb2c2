use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::{Entity, Model, Value};

/// Progress of a todo.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// Currently being worked on.
    InProgress,
    /// Finished.
    Completed,
}

impl TodoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "inprogress",
            TodoStatus::Completed => "completed",
        }
    }
}

impl From<TodoStatus> for Value {
    fn from(status: TodoStatus) -> Self {
        Value::Text(status.as_str().to_string())
    }
}

/// Input structure for creating a todo.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TodoInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Defaults to `pending`.
    pub status: Option<TodoStatus>,
}

/// Partial update of a todo. Absent fields keep their value.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct TodoUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub status: Option<TodoStatus>,

    pub completed: Option<bool>,
}

/// A row of the `todos` table.
#[derive(Debug, Clone, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub completed: bool,
    pub created_by_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Model for Todo {
    const ENTITY: Entity = Entity::Todos;
}

/// A todo as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Todo> for TodoDto {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.uuid,
            title: todo.title,
            description: todo.description,
            status: todo.status,
            completed: todo.completed,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

/// Query parameters for listing todos.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TodoQuery {
    /// Case-insensitive search over title and description.
    pub q: Option<String>,
    pub status: Option<TodoStatus>,
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_validation() {
        let valid = TodoInput {
            title: "Valid Todo".to_string(),
            description: Some("Valid Description".to_string()),
            status: Some(TodoStatus::InProgress),
        };
        assert!(valid.validate().is_ok());

        let empty_title = TodoInput {
            title: "".to_string(),
            description: None,
            status: None,
        };
        assert!(empty_title.validate().is_err());

        let long_description = TodoInput {
            title: "t".to_string(),
            description: Some("b".repeat(1001)),
            status: None,
        };
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_partial_update_validation() {
        assert!(TodoUpdate::default().validate().is_ok());
        let blank = TodoUpdate {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(TodoStatus::InProgress).unwrap(),
            "inprogress"
        );
        assert_eq!(TodoStatus::default(), TodoStatus::Pending);
    }
}
