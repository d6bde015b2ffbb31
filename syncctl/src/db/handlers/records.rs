//! Database repository for synced records.

use crate::{
    db::{
        errors::{DbError, Result},
        models::records::{RecordDBResponse, RecordFilter, RecordUpsert, UpsertSummary},
    },
    payload::{self, Payload},
    types::{RecordId, TableName},
};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct SyncRecord {
    pub id: RecordId,
    pub table_name: String,
    pub record_key: String,
    pub data: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SyncRecord> for RecordDBResponse {
    type Error = DbError;

    fn try_from(record: SyncRecord) -> Result<Self> {
        Ok(Self {
            id: record.id,
            table_name: record.table_name,
            record_key: record.record_key,
            data: payload::from_json(record.data)?,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

pub struct SyncRecords<'c> {
    db: &'c mut PgConnection,
}

impl<'c> SyncRecords<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert or overwrite every record in one statement.
    ///
    /// Keys must be unique within `records`. A stored record is only rewritten (and its
    /// `updated_at` bumped) when the payload differs.
    #[instrument(skip(self, records), fields(table = %table, count = records.len()), err)]
    pub async fn upsert_bulk(&mut self, table: &TableName, records: &[RecordUpsert]) -> Result<UpsertSummary> {
        if records.is_empty() {
            return Ok(UpsertSummary::default());
        }

        let keys: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
        let data: Vec<JsonValue> = records.iter().map(|r| payload::to_json(&r.data)).collect();

        // Rows skipped by the WHERE on the update arm are not returned
        let written: Vec<bool> = sqlx::query_scalar(
            r#"
            INSERT INTO sync_records (table_name, record_key, data)
            SELECT $1, k.record_key, k.data
            FROM UNNEST($2::text[], $3::jsonb[]) AS k(record_key, data)
            ON CONFLICT (table_name, record_key) DO UPDATE
                SET data = EXCLUDED.data, updated_at = NOW()
                WHERE sync_records.data IS DISTINCT FROM EXCLUDED.data
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(table.as_str())
        .bind(&keys)
        .bind(&data)
        .fetch_all(&mut *self.db)
        .await?;

        let inserted = written.iter().filter(|inserted| **inserted).count() as u64;
        let updated = written.len() as u64 - inserted;
        Ok(UpsertSummary {
            inserted,
            updated,
            unchanged: records.len() as u64 - inserted - updated,
        })
    }

    #[instrument(skip(self, filter), fields(table = %filter.table, limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &RecordFilter) -> Result<Vec<RecordDBResponse>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, table_name, record_key, data, created_at, updated_at FROM sync_records WHERE table_name = ",
        );
        query.push_bind(filter.table.as_str());
        push_equals(&mut query, filter);

        let direction = filter.direction.as_sql();
        query.push(" ORDER BY data -> ");
        query.push_bind(filter.sort_field.as_str());
        query.push(format!(" {direction}, record_key {direction}"));

        query.push(" LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let records = query.build_query_as::<SyncRecord>().fetch_all(&mut *self.db).await?;
        records.into_iter().map(RecordDBResponse::try_from).collect()
    }

    /// Number of records matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), fields(table = %filter.table), err)]
    pub async fn count(&mut self, filter: &RecordFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM sync_records WHERE table_name = ");
        query.push_bind(filter.table.as_str());
        push_equals(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(table = %table), err)]
    pub async fn get_by_key(&mut self, table: &TableName, key: &str) -> Result<Option<RecordDBResponse>> {
        let record = sqlx::query_as::<_, SyncRecord>(
            "SELECT id, table_name, record_key, data, created_at, updated_at FROM sync_records WHERE table_name = $1 AND record_key = $2",
        )
        .bind(table.as_str())
        .bind(key)
        .fetch_optional(&mut *self.db)
        .await?;

        record.map(RecordDBResponse::try_from).transpose()
    }

    /// Payloads of every record of `table`, ordered by key.
    #[instrument(skip(self), fields(table = %table), err)]
    pub async fn list_payloads(&mut self, table: &TableName) -> Result<Vec<Payload>> {
        let data: Vec<JsonValue> =
            sqlx::query_scalar("SELECT data FROM sync_records WHERE table_name = $1 ORDER BY record_key ASC")
                .bind(table.as_str())
                .fetch_all(&mut *self.db)
                .await?;

        data.into_iter()
            .map(|value| payload::from_json(value).map_err(DbError::from))
            .collect()
    }

    #[instrument(skip(self), fields(table = %table), err)]
    pub async fn delete_by_key(&mut self, table: &TableName, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sync_records WHERE table_name = $1 AND record_key = $2")
            .bind(table.as_str())
            .bind(key)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every record of `table`, returning how many went.
    #[instrument(skip(self), fields(table = %table), err)]
    pub async fn delete_all(&mut self, table: &TableName) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sync_records WHERE table_name = $1")
            .bind(table.as_str())
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

fn push_equals(query: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    if let Some((field, value)) = &filter.equals {
        query.push(" AND data ->> ");
        query.push_bind(field.clone());
        query.push(" = ");
        query.push_bind(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::records::SortDirection;
    use crate::payload::DocValue;
    use sqlx::PgPool;

    fn item(id: i64, name: &str) -> RecordUpsert {
        let mut data = Payload::new();
        data.insert("id".to_string(), DocValue::Integer(id));
        data.insert("name".to_string(), DocValue::from(name));
        RecordUpsert {
            key: id.to_string(),
            data,
        }
    }

    fn items() -> TableName {
        TableName::parse("items").unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upsert_bulk_counts_changes(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = SyncRecords::new(&mut conn);

        let first = repo
            .upsert_bulk(&items(), &[item(1, "a"), item(2, "b"), item(3, "c")])
            .await
            .unwrap();
        assert_eq!(
            first,
            UpsertSummary {
                inserted: 3,
                updated: 0,
                unchanged: 0
            }
        );

        let second = repo
            .upsert_bulk(&items(), &[item(1, "a"), item(2, "changed"), item(3, "c")])
            .await
            .unwrap();
        assert_eq!(
            second,
            UpsertSummary {
                inserted: 0,
                updated: 1,
                unchanged: 2
            }
        );

        let stored = repo.get_by_key(&items(), "2").await.unwrap().unwrap();
        assert_eq!(stored.data["name"], DocValue::from("changed"));
        assert!(stored.updated_at >= stored.created_at);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upsert_empty_batch_is_noop(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = SyncRecords::new(&mut conn);

        assert_eq!(repo.upsert_bulk(&items(), &[]).await.unwrap(), UpsertSummary::default());
        assert_eq!(repo.count(&RecordFilter::new(items(), "id")).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_payload_variants_survive_storage(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = SyncRecords::new(&mut conn);

        let mut nested = std::collections::BTreeMap::new();
        nested.insert("city".to_string(), DocValue::from("Ghent"));

        let mut data = Payload::new();
        data.insert("id".to_string(), DocValue::Integer(7));
        data.insert("price".to_string(), DocValue::Float(2.5));
        data.insert("active".to_string(), DocValue::Bool(true));
        data.insert("note".to_string(), DocValue::Null);
        data.insert("address".to_string(), DocValue::Map(nested));

        repo.upsert_bulk(
            &items(),
            &[RecordUpsert {
                key: "7".to_string(),
                data: data.clone(),
            }],
        )
        .await
        .unwrap();

        let stored = repo.get_by_key(&items(), "7").await.unwrap().unwrap();
        assert_eq!(stored.data, data);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_sorts_and_paginates(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = SyncRecords::new(&mut conn);

        let batch: Vec<_> = (1..=12).map(|i| item(i, if i % 2 == 0 { "even" } else { "odd" })).collect();
        repo.upsert_bulk(&items(), &batch).await.unwrap();

        // Numeric ordering on the payload, not lexical ordering on the key
        let page = repo
            .list(&RecordFilter::new(items(), "id").paginate(5, 5))
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|r| r.record_key.as_str()).collect();
        assert_eq!(ids, vec!["6", "7", "8", "9", "10"]);

        let filter = RecordFilter::new(items(), "id")
            .with_equals("name", "even")
            .with_direction(SortDirection::Desc);
        let evens = repo.list(&filter).await.unwrap();
        let ids: Vec<_> = evens.iter().map(|r| r.record_key.as_str()).collect();
        assert_eq!(ids, vec!["12", "10", "8", "6", "4", "2"]);
        assert_eq!(repo.count(&filter).await.unwrap(), 6);

        let by_number = RecordFilter::new(items(), "id").with_equals("id", "3");
        assert_eq!(repo.count(&by_number).await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_scoped_to_table(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = SyncRecords::new(&mut conn);
        let orders = TableName::parse("orders").unwrap();

        repo.upsert_bulk(&items(), &[item(1, "a"), item(2, "b")]).await.unwrap();
        repo.upsert_bulk(&orders, &[item(1, "x")]).await.unwrap();

        assert!(repo.delete_by_key(&items(), "1").await.unwrap());
        assert!(!repo.delete_by_key(&items(), "1").await.unwrap());

        assert_eq!(repo.delete_all(&items()).await.unwrap(), 1);
        assert_eq!(repo.count(&RecordFilter::new(items(), "id")).await.unwrap(), 0);
        assert_eq!(repo.list_payloads(&orders).await.unwrap().len(), 1);
    }
}
