//! PostgreSQL [`Store`] built on `sqlx::QueryBuilder`.
//!
//! Rows come back as `to_jsonb(t)` so one code path serves every table. Every value is
//! pushed with `push_bind`; only `&'static str` column and table names reach the SQL text.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{Condition, Entity, Fields, Filter, Query, Record, Store, Value, ID, UPDATED_AT};
use crate::error::AppError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("Database migrations applied");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &Value) {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Bool(b) => {
            qb.push_bind(*b);
        }
        Value::Int(n) => {
            qb.push_bind(*n);
        }
        Value::Text(s) => {
            qb.push_bind(s.clone());
        }
        Value::Uuid(u) => {
            qb.push_bind(*u);
        }
        Value::Timestamp(t) => {
            qb.push_bind(*t);
        }
    }
}

/// `%`, `_` and `\` in a search term match literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_condition(qb: &mut QueryBuilder<'static, Postgres>, condition: &Condition) {
    match condition {
        Condition::Eq(col, Value::Null) | Condition::IsNull(col) => {
            qb.push("t.").push(*col).push(" IS NULL");
        }
        Condition::Eq(col, value) => {
            qb.push("t.").push(*col).push(" = ");
            push_value(qb, value);
        }
        Condition::Ne(col, value) => {
            qb.push("t.").push(*col).push(" IS DISTINCT FROM ");
            push_value(qb, value);
        }
        Condition::Gt(col, value) => {
            qb.push("t.").push(*col).push(" > ");
            push_value(qb, value);
        }
        Condition::In(_, values) if values.is_empty() => {
            qb.push("FALSE");
        }
        Condition::In(col, values) => {
            qb.push("t.").push(*col).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, value);
            }
            qb.push(")");
        }
        Condition::Search(cols, term) => {
            let pattern = like_pattern(term);
            qb.push("(");
            for (i, col) in cols.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("t.")
                    .push(*col)
                    .push(" ILIKE ")
                    .push_bind(pattern.clone());
            }
            qb.push(")");
        }
    }
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    qb.push(" WHERE TRUE");
    for condition in filter.conditions() {
        qb.push(" AND ");
        push_condition(qb, condition);
    }
}

pub(crate) fn select_sql(entity: Entity, query: &Query) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT to_jsonb(t) FROM ");
    qb.push(entity.table()).push(" AS t");
    push_where(&mut qb, &query.filter);

    let (column, order) = query.order_by;
    qb.push(" ORDER BY t.")
        .push(column)
        .push(" ")
        .push(order.as_sql())
        .push(", t.id ")
        .push(order.as_sql());

    if let Some(limit) = query.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }
    if query.offset > 0 {
        qb.push(" OFFSET ").push_bind(query.offset);
    }
    qb
}

pub(crate) fn count_sql(entity: Entity, filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(entity.table()).push(" AS t");
    push_where(&mut qb, filter);
    qb
}

pub(crate) fn insert_sql(entity: Entity, fields: &Fields) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(entity.table()).push(" AS t (");
    for (i, (column, _)) in fields.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(*column);
    }
    qb.push(") VALUES (");
    for (i, (_, value)) in fields.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, value);
    }
    qb.push(") RETURNING to_jsonb(t)");
    qb
}

pub(crate) fn update_sql(
    entity: Entity,
    id: i64,
    fields: &Fields,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(entity.table()).push(" AS t SET ");

    let mut assignments: Vec<(&'static str, Option<&Value>)> =
        fields.iter().map(|(c, v)| (*c, Some(v))).collect();
    if entity.config().has_updated_at && !fields.iter().any(|(c, _)| *c == UPDATED_AT) {
        assignments.push((UPDATED_AT, None));
    }

    for (i, (column, value)) in assignments.into_iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(column).push(" = ");
        match value {
            Some(value) => push_value(&mut qb, value),
            None => {
                qb.push("NOW()");
            }
        }
    }

    qb.push(" WHERE t.")
        .push(ID)
        .push(" = ")
        .push_bind(id)
        .push(" RETURNING to_jsonb(t)");
    qb
}

pub(crate) fn delete_sql(entity: Entity, id: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("DELETE FROM ");
    qb.push(entity.table())
        .push(" AS t WHERE t.")
        .push(ID)
        .push(" = ")
        .push_bind(id)
        .push(" RETURNING to_jsonb(t)");
    qb
}

fn into_record(json: Json<serde_json::Value>) -> Result<Record, AppError> {
    match json.0 {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(AppError::InternalServerError(format!(
            "Expected a row object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find(&self, entity: Entity, query: &Query) -> Result<Vec<Record>, AppError> {
        let mut qb = select_sql(entity, query);
        let rows: Vec<Json<serde_json::Value>> =
            qb.build_query_scalar().fetch_all(&self.pool).await?;
        rows.into_iter().map(into_record).collect()
    }

    async fn find_one(&self, entity: Entity, filter: &Filter) -> Result<Option<Record>, AppError> {
        let query = Query::new(filter.clone()).window(0, 1);
        let mut qb = select_sql(entity, &query);
        let row: Option<Json<serde_json::Value>> =
            qb.build_query_scalar().fetch_optional(&self.pool).await?;
        row.map(into_record).transpose()
    }

    async fn count(&self, entity: Entity, filter: &Filter) -> Result<i64, AppError> {
        let mut qb = count_sql(entity, filter);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn create(&self, entity: Entity, fields: Fields) -> Result<Record, AppError> {
        if fields.is_empty() {
            return Err(AppError::InternalServerError(format!(
                "Refusing to insert an empty row into {}",
                entity.table()
            )));
        }
        let mut qb = insert_sql(entity, &fields);
        let row: Json<serde_json::Value> = qb.build_query_scalar().fetch_one(&self.pool).await?;
        into_record(row)
    }

    async fn update(&self, entity: Entity, id: i64, fields: Fields) -> Result<Record, AppError> {
        if fields.is_empty() && !entity.config().has_updated_at {
            return self
                .find_one(entity, &Filter::new().eq(ID, id))
                .await?
                .ok_or_else(|| AppError::NotFound("Record not found".into()));
        }
        let mut qb = update_sql(entity, id, &fields);
        let row: Option<Json<serde_json::Value>> =
            qb.build_query_scalar().fetch_optional(&self.pool).await?;
        row.map(into_record)
            .transpose()?
            .ok_or_else(|| AppError::NotFound("Record not found".into()))
    }

    async fn delete(&self, entity: Entity, id: i64) -> Result<Record, AppError> {
        let mut qb = delete_sql(entity, id);
        let row: Option<Json<serde_json::Value>> =
            qb.build_query_scalar().fetch_optional(&self.pool).await?;
        row.map(into_record)
            .transpose()?
            .ok_or_else(|| AppError::NotFound("Record not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Order, DELETED_AT};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_sql_binds_every_value() {
        let filter = Filter::new()
            .eq("created_by_user_id", 4_i64)
            .search(&["title", "description"], Some("50%_off"))
            .is_null(DELETED_AT);
        let query = Query::new(filter)
            .order_by("created_at", Order::Desc)
            .window(10, 10);
        let qb = select_sql(Entity::Questions, &query);

        assert_eq!(
            qb.sql(),
            "SELECT to_jsonb(t) FROM questions AS t WHERE TRUE \
             AND t.created_by_user_id = $1 \
             AND (t.title ILIKE $2 OR t.description ILIKE $3) \
             AND t.deleted_at IS NULL \
             ORDER BY t.created_at DESC, t.id DESC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn test_in_condition() {
        let empty = count_sql(Entity::ChatChannels, &Filter::new().is_in("id", Vec::<i64>::new()));
        assert_eq!(
            empty.sql(),
            "SELECT COUNT(*) FROM chat_channels AS t WHERE TRUE AND FALSE"
        );

        let some = count_sql(Entity::ChatChannels, &Filter::new().is_in("id", vec![1_i64, 2, 3]));
        assert_eq!(
            some.sql(),
            "SELECT COUNT(*) FROM chat_channels AS t WHERE TRUE AND t.id IN ($1, $2, $3)"
        );
    }

    #[test]
    fn test_update_touches_updated_at() {
        let fields: Fields = vec![("title", "renamed".into())];
        let qb = update_sql(Entity::Todos, 5, &fields);
        assert_eq!(
            qb.sql(),
            "UPDATE todos AS t SET title = $1, updated_at = NOW() WHERE t.id = $2 RETURNING to_jsonb(t)"
        );

        let fields: Fields = vec![("vote_type", "DOWNVOTE".into())];
        let qb = update_sql(Entity::QuestionVotes, 5, &fields);
        assert_eq!(
            qb.sql(),
            "UPDATE question_votes AS t SET vote_type = $1 WHERE t.id = $2 RETURNING to_jsonb(t)"
        );
    }

    #[test]
    fn test_insert_and_delete_sql() {
        let fields: Fields = vec![("content", "hi".into()), ("chat_channel_id", Value::Int(3))];
        assert_eq!(
            insert_sql(Entity::ChatMessages, &fields).sql(),
            "INSERT INTO chat_messages AS t (content, chat_channel_id) VALUES ($1, $2) RETURNING to_jsonb(t)"
        );
        assert_eq!(
            delete_sql(Entity::AnswerVotes, 9).sql(),
            "DELETE FROM answer_votes AS t WHERE t.id = $1 RETURNING to_jsonb(t)"
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
