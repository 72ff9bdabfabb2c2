//! Storage interface shared by every resource controller.
//!
//! Controllers never talk to a database handle directly. They build a [`Filter`] or
//! [`Query`] out of typed [`Condition`]s and hand it to a [`Store`], which is always
//! wrapped in a [`soft_delete::SoftDeleteStore`] before it reaches a handler.
//!
//! Column names are `&'static str` constants and every value travels as a [`Value`]
//! bound as a query parameter, so no request data is ever spliced into SQL text.

pub mod memory;
pub mod postgres;
pub mod soft_delete;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::AppError;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use soft_delete::SoftDeleteStore;

/// A stored row as returned by a [`Store`], keyed by column name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Column assignments for `create` and `update`.
pub type Fields = Vec<(&'static str, Value)>;

pub const ID: &str = "id";
pub const UUID: &str = "uuid";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const DELETED_AT: &str = "deleted_at";

/// Every table the application stores rows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Users,
    Tokens,
    Todos,
    Questions,
    Answers,
    QuestionVotes,
    AnswerVotes,
    ChatChannels,
    ChatChannelMembers,
    ChatMessages,
}

/// Static per-entity storage configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityConfig {
    pub table: &'static str,
    /// Rows carry `deleted_at` and are never physically removed.
    pub soft_delete: bool,
    /// Rows carry a public `uuid` column.
    pub has_uuid: bool,
    /// Rows carry an `updated_at` column refreshed on every update.
    pub has_updated_at: bool,
    /// Columns that together must be unique across the table.
    pub unique_key: &'static [&'static str],
}

impl Entity {
    pub const ALL: [Entity; 10] = [
        Entity::Users,
        Entity::Tokens,
        Entity::Todos,
        Entity::Questions,
        Entity::Answers,
        Entity::QuestionVotes,
        Entity::AnswerVotes,
        Entity::ChatChannels,
        Entity::ChatChannelMembers,
        Entity::ChatMessages,
    ];

    pub const fn config(self) -> EntityConfig {
        match self {
            Entity::Users => EntityConfig {
                table: "users",
                soft_delete: true,
                has_uuid: true,
                has_updated_at: true,
                unique_key: &["email"],
            },
            Entity::Tokens => EntityConfig {
                table: "tokens",
                soft_delete: false,
                has_uuid: false,
                has_updated_at: false,
                unique_key: &[],
            },
            Entity::Todos => EntityConfig {
                table: "todos",
                soft_delete: true,
                has_uuid: true,
                has_updated_at: true,
                unique_key: &[],
            },
            Entity::Questions => EntityConfig {
                table: "questions",
                soft_delete: true,
                has_uuid: true,
                has_updated_at: true,
                unique_key: &[],
            },
            Entity::Answers => EntityConfig {
                table: "answers",
                soft_delete: true,
                has_uuid: true,
                has_updated_at: true,
                unique_key: &[],
            },
            Entity::QuestionVotes => EntityConfig {
                table: "question_votes",
                soft_delete: false,
                has_uuid: false,
                has_updated_at: false,
                unique_key: &["question_id", "user_id"],
            },
            Entity::AnswerVotes => EntityConfig {
                table: "answer_votes",
                soft_delete: false,
                has_uuid: false,
                has_updated_at: false,
                unique_key: &["answer_id", "user_id"],
            },
            Entity::ChatChannels => EntityConfig {
                table: "chat_channels",
                soft_delete: true,
                has_uuid: true,
                has_updated_at: true,
                unique_key: &[],
            },
            Entity::ChatChannelMembers => EntityConfig {
                table: "chat_channel_members",
                soft_delete: false,
                has_uuid: false,
                has_updated_at: false,
                unique_key: &["chat_channel_id", "user_id"],
            },
            Entity::ChatMessages => EntityConfig {
                table: "chat_messages",
                soft_delete: true,
                has_uuid: true,
                has_updated_at: true,
                unique_key: &[],
            },
        }
    }

    pub const fn table(self) -> &'static str {
        self.config().table
    }

    pub const fn soft_delete(self) -> bool {
        self.config().soft_delete
    }
}

/// A bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// The representation the value has inside a [`Record`].
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Uuid(u) => serde_json::Value::String(u.to_string()),
            Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One predicate of a [`Filter`]. Conditions in a filter are ANDed together.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`, or `column IS NULL` when the value is [`Value::Null`].
    Eq(&'static str, Value),
    /// `column IS DISTINCT FROM value`.
    Ne(&'static str, Value),
    /// `column > value`.
    Gt(&'static str, Value),
    /// `column IN (values)`; an empty list matches nothing.
    In(&'static str, Vec<Value>),
    /// `column IS NULL`.
    IsNull(&'static str),
    /// Case-insensitive substring match on any of the columns.
    Search(&'static [&'static str], String),
}

impl Condition {
    pub fn column(&self) -> Option<&'static str> {
        match self {
            Condition::Eq(col, _)
            | Condition::Ne(col, _)
            | Condition::Gt(col, _)
            | Condition::In(col, _)
            | Condition::IsNull(col) => Some(col),
            Condition::Search(..) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.and(Condition::Eq(column, value.into()))
    }

    pub fn ne(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.and(Condition::Ne(column, value.into()))
    }

    pub fn gt(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.and(Condition::Gt(column, value.into()))
    }

    pub fn is_in<V: Into<Value>>(
        self,
        column: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.and(Condition::In(
            column,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn is_null(self, column: &'static str) -> Self {
        self.and(Condition::IsNull(column))
    }

    /// Adds a search over `columns` unless the term is blank.
    pub fn search(self, columns: &'static [&'static str], term: Option<&str>) -> Self {
        match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => self.and(Condition::Search(columns, term.to_string())),
            None => self,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// A filtered, ordered and optionally windowed read.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order_by: (&'static str, Order),
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Query {
    /// All matching rows in insertion order.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            order_by: (ID, Order::Asc),
            limit: None,
            offset: 0,
        }
    }

    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.order_by = (column, order);
        self
    }

    pub fn window(mut self, offset: i64, limit: i64) -> Self {
        self.offset = offset.max(0);
        self.limit = Some(limit.max(0));
        self
    }
}

/// The storage collaborator.
///
/// `id` arguments are always the internal sequential key, never the public uuid.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find(&self, entity: Entity, query: &Query) -> Result<Vec<Record>, AppError>;

    async fn find_one(&self, entity: Entity, filter: &Filter) -> Result<Option<Record>, AppError>;

    async fn count(&self, entity: Entity, filter: &Filter) -> Result<i64, AppError>;

    async fn create(&self, entity: Entity, fields: Fields) -> Result<Record, AppError>;

    /// Fails with `NotFound` when no row has this id.
    async fn update(&self, entity: Entity, id: i64, fields: Fields) -> Result<Record, AppError>;

    /// Fails with `NotFound` when no row has this id.
    async fn delete(&self, entity: Entity, id: i64) -> Result<Record, AppError>;
}

/// A typed row of a single [`Entity`].
pub trait Model: DeserializeOwned + Send {
    const ENTITY: Entity;
}

pub fn decode<T: DeserializeOwned>(record: Record) -> Result<T, AppError> {
    Ok(serde_json::from_value(serde_json::Value::Object(record))?)
}
