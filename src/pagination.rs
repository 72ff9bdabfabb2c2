//! Page/limit normalization and result-set metadata.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::db::{Entity, Filter, Store};
use crate::error::AppError;

/// Normalized list query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    pub page: i64,
    pub limit: i64,
    pub q: Option<String>,
    /// Every other non-empty parameter, passed through unchanged.
    pub filters: BTreeMap<String, String>,
}

impl ApiQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }
}

/// Parses `page`/`limit` style values: fractions round up, anything below 1 becomes 1.
fn coerce(key: &str, raw: &str) -> Result<i64, AppError> {
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("'{}' must be a number", key)))?;
    if !parsed.is_finite() {
        return Err(AppError::BadRequest(format!("'{}' must be a number", key)));
    }
    let rounded = parsed.ceil();
    if rounded >= i64::MAX as f64 {
        return Err(AppError::BadRequest(format!("'{}' is out of range", key)));
    }
    Ok((rounded as i64).max(1))
}

/// Normalizes a raw query string map.
///
/// `default_limit` applies when `limit` is absent; the result is capped at `max_limit`.
pub fn normalize(
    raw: &HashMap<String, String>,
    default_limit: i64,
    max_limit: i64,
) -> Result<ApiQuery, AppError> {
    let mut query = ApiQuery {
        page: 1,
        limit: default_limit.max(1),
        q: None,
        filters: BTreeMap::new(),
    };

    for (key, value) in raw {
        if value.trim().is_empty() {
            continue;
        }
        match key.as_str() {
            "page" => query.page = coerce(key, value)?,
            "limit" => query.limit = coerce(key, value)?,
            "q" => query.q = Some(value.clone()),
            _ => {
                query.filters.insert(key.clone(), value.clone());
            }
        }
    }

    query.limit = query.limit.min(max_limit.max(1));
    // page * limit must stay representable for the offset and meta math.
    if query.page.checked_mul(query.limit).is_none() {
        return Err(AppError::BadRequest("'page' is out of range".into()));
    }
    Ok(query)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub has_prev_page: bool,
    pub prev_page: Option<i64>,
    pub has_next_page: bool,
    pub next_page: Option<i64>,
}

impl PaginationMeta {
    pub fn from_total(total: i64, page: PageRequest) -> Self {
        let has_prev_page = page.page > 1;
        let has_next_page = total > page.page.saturating_mul(page.limit);
        Self {
            page: page.page,
            limit: page.limit,
            total,
            has_prev_page,
            prev_page: has_prev_page.then_some(page.page - 1),
            has_next_page,
            next_page: has_next_page.then_some(page.page + 1),
        }
    }
}

/// Counts `entity` rows matching `filter` once and derives the page metadata.
///
/// Pass a `SoftDeleteStore` so the total excludes deleted rows.
pub async fn compute_meta<S: Store + ?Sized>(
    store: &S,
    entity: Entity,
    filter: &Filter,
    page: PageRequest,
) -> Result<PaginationMeta, AppError> {
    let total = store.count(entity, filter).await?;
    Ok(PaginationMeta::from_total(total, page))
}

/// The `{list, meta}` body of every paginated endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub list: Vec<T>,
    pub meta: PaginationMeta,
}
