//! In-process [`Store`] used by the test suite and by local runs without `DATABASE_URL`.
//!
//! Behaves like the PostgreSQL schema in `migrations/`: sequential ids, generated
//! uuids and timestamps, and unique keys from [`EntityConfig::unique_key`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use uuid::Uuid;

use super::{
    Condition, Entity, Fields, Filter, Order, Query, Record, Store, Value, CREATED_AT, DELETED_AT,
    ID, UPDATED_AT, UUID,
};
use crate::error::AppError;

#[derive(Default)]
struct Tables {
    next_id: i64,
    rows: HashMap<Entity, Vec<Record>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, AppError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| AppError::InternalServerError("Memory store lock poisoned".into()))?;
        Ok(f(&tables))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| AppError::InternalServerError("Memory store lock poisoned".into()))?;
        f(&mut tables)
    }
}

fn row_id(record: &Record) -> i64 {
    record.get(ID).and_then(Json::as_i64).unwrap_or_default()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Orders two stored values the way PostgreSQL would order the underlying columns.
fn compare_json(a: &Json, b: &Json) -> Ordering {
    match (a, b) {
        (Json::Null, Json::Null) => Ordering::Equal,
        // NULLS LAST for ascending order.
        (Json::Null, _) => Ordering::Greater,
        (_, Json::Null) => Ordering::Less,
        (Json::Number(x), Json::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Json::Bool(x), Json::Bool(y)) => x.cmp(y),
        (Json::String(x), Json::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn json_eq(stored: &Json, value: &Value) -> bool {
    match value {
        Value::Null => stored.is_null(),
        Value::Timestamp(t) => stored
            .as_str()
            .and_then(parse_timestamp)
            .map_or(false, |s| s == *t),
        _ => compare_json(stored, &value.to_json()) == Ordering::Equal && !stored.is_null(),
    }
}

fn matches(record: &Record, filter: &Filter) -> bool {
    filter.conditions().iter().all(|condition| {
        let field = |col: &str| record.get(col).cloned().unwrap_or(Json::Null);
        match condition {
            Condition::Eq(col, value) => json_eq(&field(col), value),
            Condition::Ne(col, value) => !json_eq(&field(col), value),
            Condition::Gt(col, value) => {
                let stored = field(col);
                !stored.is_null()
                    && compare_json(&stored, &value.to_json()) == Ordering::Greater
            }
            Condition::In(col, values) => {
                let stored = field(col);
                values.iter().any(|v| json_eq(&stored, v))
            }
            Condition::IsNull(col) => field(col).is_null(),
            Condition::Search(cols, term) => {
                let needle = term.to_lowercase();
                cols.iter().any(|col| {
                    field(col)
                        .as_str()
                        .map_or(false, |s| s.to_lowercase().contains(&needle))
                })
            }
        }
    })
}

fn violates_unique(entity: Entity, rows: &[Record], candidate: &Record) -> bool {
    let key = entity.config().unique_key;
    if key.is_empty() {
        return false;
    }
    let candidate_id = row_id(candidate);
    rows.iter().any(|row| {
        row_id(row) != candidate_id
            && key
                .iter()
                .all(|col| row.get(*col).is_some() && row.get(*col) == candidate.get(*col))
    })
}

#[async_trait]
impl Store for MemoryStore {
    async fn find(&self, entity: Entity, query: &Query) -> Result<Vec<Record>, AppError> {
        self.read(|tables| {
            let mut rows: Vec<Record> = tables
                .rows
                .get(&entity)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| matches(r, &query.filter))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            let (column, order) = query.order_by;
            rows.sort_by(|a, b| {
                let by_column = compare_json(
                    a.get(column).unwrap_or(&Json::Null),
                    b.get(column).unwrap_or(&Json::Null),
                )
                .then_with(|| row_id(a).cmp(&row_id(b)));
                match order {
                    Order::Asc => by_column,
                    Order::Desc => by_column.reverse(),
                }
            });

            let offset = usize::try_from(query.offset).unwrap_or_default();
            let limit = query
                .limit
                .and_then(|l| usize::try_from(l).ok())
                .unwrap_or(usize::MAX);
            rows.into_iter().skip(offset).take(limit).collect()
        })
    }

    async fn find_one(&self, entity: Entity, filter: &Filter) -> Result<Option<Record>, AppError> {
        let query = Query::new(filter.clone()).window(0, 1);
        Ok(self.find(entity, &query).await?.into_iter().next())
    }

    async fn count(&self, entity: Entity, filter: &Filter) -> Result<i64, AppError> {
        self.read(|tables| {
            tables
                .rows
                .get(&entity)
                .map(|rows| rows.iter().filter(|r| matches(r, filter)).count() as i64)
                .unwrap_or_default()
        })
    }

    async fn create(&self, entity: Entity, fields: Fields) -> Result<Record, AppError> {
        self.write(|tables| {
            let config = entity.config();
            let now = Value::Timestamp(Utc::now()).to_json();

            let mut record = Record::new();
            record.insert(ID.to_string(), Json::from(tables.next_id + 1));
            if config.has_uuid {
                record.insert(UUID.to_string(), Value::Uuid(Uuid::new_v4()).to_json());
            }
            record.insert(CREATED_AT.to_string(), now.clone());
            if config.has_updated_at {
                record.insert(UPDATED_AT.to_string(), now);
            }
            if config.soft_delete {
                record.insert(DELETED_AT.to_string(), Json::Null);
            }
            for (column, value) in fields {
                record.insert(column.to_string(), value.to_json());
            }

            let rows = tables.rows.entry(entity).or_default();
            if violates_unique(entity, rows, &record) {
                return Err(AppError::Conflict("Record already exists".into()));
            }
            rows.push(record.clone());
            tables.next_id += 1;
            Ok(record)
        })
    }

    async fn update(&self, entity: Entity, id: i64, fields: Fields) -> Result<Record, AppError> {
        self.write(|tables| {
            let rows = tables.rows.entry(entity).or_default();
            let index = rows
                .iter()
                .position(|r| row_id(r) == id)
                .ok_or_else(|| AppError::NotFound("Record not found".into()))?;

            let mut updated = rows[index].clone();
            for (column, value) in fields {
                updated.insert(column.to_string(), value.to_json());
            }
            if entity.config().has_updated_at {
                updated.insert(
                    UPDATED_AT.to_string(),
                    Value::Timestamp(Utc::now()).to_json(),
                );
            }
            if violates_unique(entity, rows, &updated) {
                return Err(AppError::Conflict("Record already exists".into()));
            }
            rows[index] = updated.clone();
            Ok(updated)
        })
    }

    async fn delete(&self, entity: Entity, id: i64) -> Result<Record, AppError> {
        self.write(|tables| {
            let rows = tables.rows.entry(entity).or_default();
            let index = rows
                .iter()
                .position(|r| row_id(r) == id)
                .ok_or_else(|| AppError::NotFound("Record not found".into()))?;
            Ok(rows.remove(index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn title(record: &Record) -> &str {
        record["title"].as_str().unwrap()
    }

    #[actix_rt::test]
    async fn test_create_assigns_generated_columns() {
        let store = MemoryStore::new();
        let row = store
            .create(Entity::Todos, vec![("title", "write tests".into())])
            .await
            .unwrap();

        assert_eq!(row["id"], 1);
        assert!(row["uuid"].is_string());
        assert!(row["created_at"].is_string());
        assert!(row["deleted_at"].is_null());
    }

    #[actix_rt::test]
    async fn test_filter_order_and_window() {
        let store = MemoryStore::new();
        for (t, owner) in [("alpha", 1), ("Beta", 2), ("gamma", 1), ("delta", 1)] {
            store
                .create(
                    Entity::Todos,
                    vec![("title", t.into()), ("created_by_user_id", Value::Int(owner))],
                )
                .await
                .unwrap();
        }

        let query = Query::new(Filter::new().eq("created_by_user_id", 1_i64))
            .order_by("title", Order::Desc)
            .window(1, 2);
        let rows = store.find(Entity::Todos, &query).await.unwrap();
        assert_eq!(rows.iter().map(title).collect::<Vec<_>>(), vec!["delta", "alpha"]);

        let search = Filter::new().search(&["title"], Some("BET"));
        assert_eq!(store.count(Entity::Todos, &search).await.unwrap(), 1);

        let none = Filter::new().is_in("id", Vec::<i64>::new());
        assert_eq!(store.count(Entity::Todos, &none).await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_unique_key_is_enforced() {
        let store = MemoryStore::new();
        let vote = || {
            vec![
                ("question_id", Value::Int(7)),
                ("user_id", Value::Int(3)),
                ("vote_type", "UPVOTE".into()),
            ]
        };
        store.create(Entity::QuestionVotes, vote()).await.unwrap();
        let second = store.create(Entity::QuestionVotes, vote()).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[actix_rt::test]
    async fn test_update_and_delete_missing_row() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update(Entity::Todos, 99, vec![]).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(Entity::Todos, 99).await,
            Err(AppError::NotFound(_))
        ));
    }
}
