//! Soft-delete decorator over any [`Store`].
//!
//! For every [`Entity`] whose [`EntityConfig::soft_delete`](super::EntityConfig) flag is set:
//!
//! - `delete` is rewritten to an `update` that stamps `deleted_at`; the row stays.
//! - `find`, `find_one` and `count` get `deleted_at IS NULL` ANDed onto the caller's filter.
//!
//! Other entities pass through untouched. Handlers take `web::Data<SoftDeleteStore>`,
//! so the only way to reach undecorated storage is the explicit [`SoftDeleteStore::raw`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::{decode, Entity, Fields, Filter, Model, Query, Record, Store, Value, DELETED_AT, ID};
use crate::error::AppError;

#[derive(Clone)]
pub struct SoftDeleteStore {
    inner: Arc<dyn Store>,
}

impl SoftDeleteStore {
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self { inner }
    }

    /// The undecorated store. Reads through it see soft-deleted rows.
    pub fn raw(&self) -> &dyn Store {
        self.inner.as_ref()
    }

    /// Typed `find`.
    pub async fn list<M: Model>(&self, query: &Query) -> Result<Vec<M>, AppError> {
        self.find(M::ENTITY, query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Typed `find_one`.
    pub async fn first<M: Model>(&self, filter: &Filter) -> Result<Option<M>, AppError> {
        self.find_one(M::ENTITY, filter)
            .await?
            .map(decode)
            .transpose()
    }

    /// Typed `count`.
    pub async fn total<M: Model>(&self, filter: &Filter) -> Result<i64, AppError> {
        self.count(M::ENTITY, filter).await
    }

    /// Typed `create`.
    pub async fn insert<M: Model>(&self, fields: Fields) -> Result<M, AppError> {
        decode(self.create(M::ENTITY, fields).await?)
    }

    /// Typed `update`.
    pub async fn modify<M: Model>(&self, id: i64, fields: Fields) -> Result<M, AppError> {
        decode(self.update(M::ENTITY, id, fields).await?)
    }

    /// Typed `delete`.
    pub async fn remove<M: Model>(&self, id: i64) -> Result<M, AppError> {
        decode(self.delete(M::ENTITY, id).await?)
    }
}

/// The filter a soft-delete-aware read actually runs with.
pub fn scope_filter(entity: Entity, filter: &Filter) -> Filter {
    if entity.soft_delete() {
        filter.clone().is_null(DELETED_AT)
    } else {
        filter.clone()
    }
}

#[async_trait]
impl Store for SoftDeleteStore {
    async fn find(&self, entity: Entity, query: &Query) -> Result<Vec<Record>, AppError> {
        let scoped = Query {
            filter: scope_filter(entity, &query.filter),
            ..query.clone()
        };
        self.inner.find(entity, &scoped).await
    }

    async fn find_one(&self, entity: Entity, filter: &Filter) -> Result<Option<Record>, AppError> {
        self.inner
            .find_one(entity, &scope_filter(entity, filter))
            .await
    }

    async fn count(&self, entity: Entity, filter: &Filter) -> Result<i64, AppError> {
        self.inner.count(entity, &scope_filter(entity, filter)).await
    }

    async fn create(&self, entity: Entity, fields: Fields) -> Result<Record, AppError> {
        self.inner.create(entity, fields).await
    }

    async fn update(&self, entity: Entity, id: i64, fields: Fields) -> Result<Record, AppError> {
        self.inner.update(entity, id, fields).await
    }

    async fn delete(&self, entity: Entity, id: i64) -> Result<Record, AppError> {
        if !entity.soft_delete() {
            return self.inner.delete(entity, id).await;
        }

        // Already-deleted rows are as absent as missing ones.
        let live = self
            .inner
            .count(entity, &scope_filter(entity, &Filter::new().eq(ID, id)))
            .await?;
        if live == 0 {
            return Err(AppError::NotFound("Record not found".into()));
        }

        self.inner
            .update(
                entity,
                id,
                vec![(DELETED_AT, Value::Timestamp(Utc::now()))],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Condition, MemoryStore};
    use pretty_assertions::assert_eq;

    fn store() -> SoftDeleteStore {
        SoftDeleteStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_scope_filter_appends_without_overwriting() {
        let caller = Filter::new().eq("title", "keep me");
        let scoped = scope_filter(Entity::Questions, &caller);
        assert_eq!(
            scoped.conditions(),
            &[
                Condition::Eq("title", Value::Text("keep me".into())),
                Condition::IsNull(DELETED_AT),
            ]
        );

        assert_eq!(scope_filter(Entity::QuestionVotes, &caller), caller);
    }

    #[actix_rt::test]
    async fn test_delete_marks_row_and_hides_it() {
        let db = store();
        let row = db
            .create(Entity::Questions, vec![("title", "Why?".into())])
            .await
            .unwrap();
        let id = row["id"].as_i64().unwrap();
        let by_title = Filter::new().eq("title", "Why?");

        let deleted = db.delete(Entity::Questions, id).await.unwrap();
        assert!(deleted[DELETED_AT].is_string());

        assert_eq!(db.count(Entity::Questions, &by_title).await.unwrap(), 0);
        assert!(db.find_one(Entity::Questions, &by_title).await.unwrap().is_none());
        assert!(db
            .find(Entity::Questions, &Query::new(by_title.clone()))
            .await
            .unwrap()
            .is_empty());

        let recovered = db
            .raw()
            .find_one(Entity::Questions, &by_title)
            .await
            .unwrap()
            .expect("row still stored");
        assert!(recovered[DELETED_AT].is_string());
    }

    #[actix_rt::test]
    async fn test_second_delete_is_not_found() {
        let db = store();
        let row = db
            .create(Entity::Todos, vec![("title", "once".into())])
            .await
            .unwrap();
        let id = row["id"].as_i64().unwrap();

        db.delete(Entity::Todos, id).await.unwrap();
        assert!(matches!(
            db.delete(Entity::Todos, id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_rt::test]
    async fn test_plain_entities_are_hard_deleted() {
        let db = store();
        let row = db
            .create(
                Entity::AnswerVotes,
                vec![
                    ("answer_id", Value::Int(1)),
                    ("user_id", Value::Int(2)),
                    ("vote_type", "UPVOTE".into()),
                ],
            )
            .await
            .unwrap();
        let id = row["id"].as_i64().unwrap();

        db.delete(Entity::AnswerVotes, id).await.unwrap();
        assert_eq!(
            db.raw()
                .count(Entity::AnswerVotes, &Filter::new())
                .await
                .unwrap(),
            0
        );
    }
}
