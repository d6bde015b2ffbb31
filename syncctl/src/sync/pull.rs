use crate::{
    db::{handlers::SyncRecords, models::records::RecordUpsert},
    errors::Result,
    payload::Payload,
    sources::SourceDatabase,
    types::TableName,
};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

/// What one pull did to the document store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct SyncOutcome {
    /// Records written or confirmed, one per distinct key
    pub count: u64,
    /// Rows dropped because they had no usable key
    pub skipped: u64,
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
}

/// Key each row by `key_column`.
///
/// Rows whose key is missing, null, or a nested mapping are dropped and counted. When two rows
/// share a key the later one wins, matching what sequential upserts would leave behind.
pub fn key_rows(rows: Vec<Payload>, key_column: &str) -> (Vec<RecordUpsert>, u64) {
    let mut skipped = 0;
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    let mut records: Vec<RecordUpsert> = Vec::with_capacity(rows.len());

    for data in rows {
        let Some(key) = data.get(key_column).and_then(|value| value.as_key()) else {
            skipped += 1;
            continue;
        };

        match positions.get(&key) {
            Some(&index) => records[index].data = data,
            None => {
                positions.insert(key.clone(), records.len());
                records.push(RecordUpsert { key, data });
            }
        }
    }

    (records, skipped)
}

/// Pull every row of `table` from `source` into the document store.
#[instrument(skip(source, db), fields(mode = %source.mode()))]
pub async fn pull_table(source: &dyn SourceDatabase, db: &PgPool, table: &TableName, key_column: &str) -> Result<SyncOutcome> {
    match pull(source, db, table, key_column).await {
        Ok(outcome) => {
            if outcome.count == 0 && outcome.skipped == 0 {
                warn!(%table, "No data found in source table {table}");
            } else {
                info!(
                    %table,
                    count = outcome.count,
                    skipped = outcome.skipped,
                    inserted = outcome.inserted,
                    updated = outcome.updated,
                    "Synced table {table}"
                );
            }
            Ok(outcome)
        }
        Err(e) => {
            error!(%table, "Sync failed for table {table}: {e}");
            metrics::counter!("syncctl_sync_failures_total", "operation" => "pull").increment(1);
            Err(e)
        }
    }
}

async fn pull(source: &dyn SourceDatabase, db: &PgPool, table: &TableName, key_column: &str) -> Result<SyncOutcome> {
    let rows = source.select_all(table).await?;
    let (records, skipped) = key_rows(rows, key_column);

    if skipped > 0 {
        warn!(%table, skipped, "Skipped rows without a usable '{key_column}' value");
    }
    if records.is_empty() {
        return Ok(SyncOutcome {
            skipped,
            ..Default::default()
        });
    }

    let mut conn = db.acquire().await?;
    let summary = SyncRecords::new(&mut conn).upsert_bulk(table, &records).await?;

    metrics::counter!("syncctl_sync_rows_total", "operation" => "pull").increment(summary.total());

    Ok(SyncOutcome {
        count: summary.total(),
        skipped,
        inserted: summary.inserted,
        updated: summary.updated,
        unchanged: summary.unchanged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::records::RecordFilter;
    use crate::errors::Error;
    use crate::payload::DocValue;
    use crate::test_utils::{MemorySource, row};
    use crate::types::SourceMode;

    #[test]
    fn test_key_rows_skips_unkeyed_and_dedupes() {
        let mut nested = Payload::new();
        nested.insert("id".to_string(), DocValue::Map(Default::default()));

        let rows = vec![
            row(&[("id", DocValue::Integer(1)), ("name", "first".into())]),
            row(&[("name", "no key".into())]),
            row(&[("id", DocValue::Null)]),
            nested,
            row(&[("id", DocValue::Integer(2))]),
            row(&[("id", DocValue::Integer(1)), ("name", "second".into())]),
        ];

        let (records, skipped) = key_rows(rows, "id");
        assert_eq!(skipped, 3);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "1");
        assert_eq!(records[0].data["name"], DocValue::from("second"));
        assert_eq!(records[1].key, "2");
    }

    #[test]
    fn test_key_rows_uses_configured_column() {
        let rows = vec![row(&[("id", DocValue::Integer(1)), ("code", "A-1".into())])];
        let (records, _) = key_rows(rows, "code");
        assert_eq!(records[0].key, "A-1");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_pull_is_idempotent(pool: PgPool) {
        let source = MemorySource::new(SourceMode::Offline).with_table(
            "items",
            vec![
                row(&[("id", DocValue::Integer(1)), ("name", "a".into())]),
                row(&[("id", DocValue::Integer(2)), ("name", "b".into())]),
                row(&[("id", DocValue::Integer(3)), ("name", "c".into())]),
            ],
        );
        let table = TableName::parse("items").unwrap();

        let first = pull_table(&source, &pool, &table, "id").await.unwrap();
        assert_eq!(first.count, 3);
        assert_eq!(first.inserted, 3);

        let second = pull_table(&source, &pool, &table, "id").await.unwrap();
        assert_eq!(second.count, 3);
        assert_eq!(second.unchanged, 3);

        let mut conn = pool.acquire().await.unwrap();
        let count = SyncRecords::new(&mut conn)
            .count(&RecordFilter::new(table, "id"))
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_pull_updates_only_changed_rows(pool: PgPool) {
        let source = MemorySource::new(SourceMode::Online).with_table(
            "items",
            vec![
                row(&[("id", DocValue::Integer(1)), ("qty", DocValue::Integer(1))]),
                row(&[("id", DocValue::Integer(2)), ("qty", DocValue::Integer(2))]),
                row(&[("id", DocValue::Integer(3)), ("qty", DocValue::Integer(3))]),
            ],
        );
        let table = TableName::parse("items").unwrap();
        pull_table(&source, &pool, &table, "id").await.unwrap();

        source.set_table(
            "items",
            vec![
                row(&[("id", DocValue::Integer(1)), ("qty", DocValue::Integer(1))]),
                row(&[("id", DocValue::Integer(2)), ("qty", DocValue::Integer(20))]),
                row(&[("id", DocValue::Integer(3)), ("qty", DocValue::Integer(3))]),
            ],
        );
        let outcome = pull_table(&source, &pool, &table, "id").await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome {
                count: 3,
                skipped: 0,
                inserted: 0,
                updated: 1,
                unchanged: 2
            }
        );

        let mut conn = pool.acquire().await.unwrap();
        let stored = SyncRecords::new(&mut conn).get_by_key(&table, "2").await.unwrap().unwrap();
        assert_eq!(stored.data["qty"], DocValue::Integer(20));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_pull_empty_table_is_success(pool: PgPool) {
        let source = MemorySource::new(SourceMode::Offline).with_table("items", vec![]);
        let table = TableName::parse("items").unwrap();

        let outcome = pull_table(&source, &pool, &table, "id").await.unwrap();
        assert_eq!(outcome, SyncOutcome::default());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_pull_missing_table_propagates_source_error(pool: PgPool) {
        let source = MemorySource::new(SourceMode::Offline);
        let table = TableName::parse("missing").unwrap();

        let err = pull_table(&source, &pool, &table, "id").await.unwrap_err();
        assert!(matches!(err, Error::Source(_)));
        assert_eq!(source.connections(), 1);
    }
}
