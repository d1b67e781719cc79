use crate::clock::Clock;
use crate::domain::{AggregateResult, CacheEntry, Query};
use crate::entities::{prelude::*, search_cache};
use crate::services::cache::{CacheError, CacheStore};
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;

/// Formats a timestamp so that text comparison in SQL matches time order.
fn to_db_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_db_timestamp(key: &str, raw: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            message: format!("bad timestamp '{raw}': {e}"),
        })
}

/// Durable cache store in the `search_cache` table.
pub struct SeaOrmCacheStore {
    conn: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl SeaOrmCacheStore {
    #[must_use]
    pub fn new(conn: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { conn, clock }
    }

    fn entry_from_model(model: search_cache::Model) -> Result<CacheEntry, CacheError> {
        let value: AggregateResult =
            serde_json::from_str(&model.results_json).map_err(|e| CacheError::Corrupt {
                key: model.query.clone(),
                message: e.to_string(),
            })?;

        let key = Query::parse(&model.query).ok_or_else(|| CacheError::Corrupt {
            key: model.query.clone(),
            message: "empty key".to_string(),
        })?;

        Ok(CacheEntry {
            created_at: from_db_timestamp(&model.query, &model.created_at)?,
            expires_at: from_db_timestamp(&model.query, &model.expires_at)?,
            key,
            value,
        })
    }
}

#[async_trait::async_trait]
impl CacheStore for SeaOrmCacheStore {
    async fn get(&self, key: &Query) -> Result<Option<CacheEntry>, CacheError> {
        let now = self.clock.now();

        let row = SearchCache::find()
            .filter(search_cache::Column::Query.eq(key.as_str()))
            .filter(search_cache::Column::ExpiresAt.gt(to_db_timestamp(now)))
            .one(&self.conn)
            .await?;

        let Some(model) = row else {
            return Ok(None);
        };

        let entry = Self::entry_from_model(model)?;
        // The SQL filter already excludes expired rows; re-check on the parsed value.
        Ok(entry.is_live(now).then_some(entry))
    }

    async fn put(
        &self,
        key: &Query,
        value: &AggregateResult,
        ttl: chrono::Duration,
    ) -> Result<CacheEntry, CacheError> {
        let entry = CacheEntry::new(key.clone(), value.clone(), self.clock.now(), ttl)
            .ok_or_else(|| CacheError::TtlOutOfRange {
                key: key.to_string(),
            })?;

        let results_json = serde_json::to_string(value).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        let active_model = search_cache::ActiveModel {
            query: Set(key.to_string()),
            results_json: Set(results_json),
            created_at: Set(to_db_timestamp(entry.created_at)),
            expires_at: Set(to_db_timestamp(entry.expires_at)),
            ..Default::default()
        };

        SearchCache::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(search_cache::Column::Query)
                    .update_columns([
                        search_cache::Column::ResultsJson,
                        search_cache::Column::CreatedAt,
                        search_cache::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(entry)
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = to_db_timestamp(self.clock.now());

        let result = SearchCache::delete_many()
            .filter(search_cache::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(sea_orm::Statement::from_string(
                backend,
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
