use crate::{
    db::handlers::SyncRecords,
    errors::{Error, Result},
    sources::{SourceDatabase, SourceRow},
    types::TableName,
};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, instrument};

/// What one push wrote to a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct PushOutcome {
    /// Rows inserted into the source table
    pub count: u64,
}

/// Insert every stored record of `table` into `source`, in key order.
///
/// Column names are checked before the first insert. Inserts that succeed before a failing
/// row stay in the source.
#[instrument(skip(source, db), fields(mode = %source.mode()))]
pub async fn push_table(source: &dyn SourceDatabase, db: &PgPool, table: &TableName) -> Result<PushOutcome> {
    let payloads = {
        let mut conn = db.acquire().await?;
        SyncRecords::new(&mut conn).list_payloads(table).await?
    };

    if payloads.is_empty() {
        return Err(Error::NotFound {
            message: format!("No records found for table {table}"),
        });
    }

    let rows = payloads.into_iter().map(SourceRow::try_from).collect::<Result<Vec<_>>>()?;

    match source.insert_rows(table, &rows).await {
        Ok(count) => {
            info!(%table, count, "Pushed table {table} to {} source", source.mode());
            metrics::counter!("syncctl_sync_rows_total", "operation" => "push").increment(count);
            Ok(PushOutcome { count })
        }
        Err(e) => {
            error!(%table, "Push failed for table {table}: {e}");
            metrics::counter!("syncctl_sync_failures_total", "operation" => "push").increment(1);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::records::RecordUpsert;
    use crate::payload::{DocValue, Payload};
    use crate::test_utils::{MemorySource, row};
    use crate::types::SourceMode;

    async fn store(pool: &PgPool, table: &TableName, records: Vec<(&str, Payload)>) {
        let records: Vec<_> = records
            .into_iter()
            .map(|(key, data)| RecordUpsert { key: key.to_string(), data })
            .collect();
        let mut conn = pool.acquire().await.unwrap();
        SyncRecords::new(&mut conn).upsert_bulk(table, &records).await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_push_inserts_every_record_in_key_order(pool: PgPool) {
        let table = TableName::parse("items").unwrap();
        store(
            &pool,
            &table,
            vec![
                ("2", row(&[("id", DocValue::Integer(2)), ("name", "b".into())])),
                ("1", row(&[("id", DocValue::Integer(1)), ("name", "a".into())])),
            ],
        )
        .await;

        let source = MemorySource::new(SourceMode::Online).with_table("items", vec![]);
        let outcome = push_table(&source, &pool, &table).await.unwrap();
        assert_eq!(outcome.count, 2);

        let inserted = source.rows("items");
        assert_eq!(inserted.len(), 2);
        assert_eq!(inserted[0]["id"], DocValue::Integer(1));
        assert_eq!(inserted[1]["id"], DocValue::Integer(2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_push_without_records_is_not_found(pool: PgPool) {
        let table = TableName::parse("items").unwrap();
        let source = MemorySource::new(SourceMode::Offline).with_table("items", vec![]);

        let err = push_table(&source, &pool, &table).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(source.connections(), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_push_rejects_unsafe_columns_before_inserting(pool: PgPool) {
        let table = TableName::parse("items").unwrap();
        store(
            &pool,
            &table,
            vec![
                ("1", row(&[("id", DocValue::Integer(1))])),
                ("2", row(&[("id", DocValue::Integer(2)), ("bad column", "x".into())])),
            ],
        )
        .await;

        let source = MemorySource::new(SourceMode::Offline).with_table("items", vec![]);
        let err = push_table(&source, &pool, &table).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
        assert!(source.rows("items").is_empty());
    }
}
